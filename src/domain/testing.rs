//! Test doubles for the balance store and the event publisher.

use crate::domain::{BalanceStore, BalanceTx, EventPublisher, WithdrawalEvent, Withdrawals};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use thiserror::Error;
use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    task::JoinHandle,
};

/// Drop the given withdrawals, thereby closing the notifier, and wait for the dispatcher to
/// publish all queued events.
pub async fn dispatched<S>(withdrawals: Withdrawals<S>, dispatcher: JoinHandle<()>)
where
    S: BalanceStore,
{
    drop(withdrawals);
    dispatcher.await.expect("dispatcher completes");
}

/// Balances in memory; a transaction holds the lock on all accounts and writes a copy back on
/// commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalanceStore {
    accounts: Arc<AsyncMutex<HashMap<i64, Decimal>>>,
    begun: Arc<AtomicUsize>,
    unreachable: bool,
    vanishing: bool,
    failing_write: bool,
    failing_commit: bool,
}

impl InMemoryBalanceStore {
    pub fn with_accounts(accounts: impl IntoIterator<Item = (i64, Decimal)>) -> Self {
        Self {
            accounts: Arc::new(AsyncMutex::new(accounts.into_iter().collect())),
            ..Default::default()
        }
    }

    /// Every transaction fails to start.
    pub fn unreachable(self) -> Self {
        Self {
            unreachable: true,
            ..self
        }
    }

    /// Accounts disappear between reading and decrementing the balance.
    pub fn vanishing(self) -> Self {
        Self {
            vanishing: true,
            ..self
        }
    }

    /// Every balance decrement fails.
    pub fn failing_write(self) -> Self {
        Self {
            failing_write: true,
            ..self
        }
    }

    /// Every commit fails, discarding the staged balances.
    pub fn failing_commit(self) -> Self {
        Self {
            failing_commit: true,
            ..self
        }
    }

    pub async fn balance(&self, account_id: i64) -> Option<Decimal> {
        self.accounts.lock().await.get(&account_id).copied()
    }

    /// Number of transactions begun.
    pub fn begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }
}

impl BalanceStore for InMemoryBalanceStore {
    type Error = InMemoryError;

    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, Self::Error> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(InMemoryError::Unreachable);
        }

        let accounts = self.accounts.clone().lock_owned().await;
        let staged = accounts.clone();
        Ok(InMemoryTx {
            accounts,
            staged,
            vanishing: self.vanishing,
            failing_write: self.failing_write,
            failing_commit: self.failing_commit,
        })
    }
}

#[derive(Debug)]
pub struct InMemoryTx {
    accounts: OwnedMutexGuard<HashMap<i64, Decimal>>,
    staged: HashMap<i64, Decimal>,
    vanishing: bool,
    failing_write: bool,
    failing_commit: bool,
}

impl BalanceTx for InMemoryTx {
    type Error = InMemoryError;

    async fn read_balance(&mut self, account_id: i64) -> Result<Decimal, Self::Error> {
        self.staged
            .get(&account_id)
            .copied()
            .ok_or(InMemoryError::NotFound(account_id))
    }

    async fn decrement_balance(
        &mut self,
        account_id: i64,
        amount: Decimal,
    ) -> Result<u64, Self::Error> {
        if self.failing_write {
            return Err(InMemoryError::Write(account_id));
        }

        if self.vanishing {
            self.staged.remove(&account_id);
        }

        match self.staged.get_mut(&account_id) {
            Some(balance) => {
                *balance -= amount;
                Ok(1)
            }

            None => Ok(0),
        }
    }

    async fn commit(self) -> Result<(), Self::Error> {
        if self.failing_commit {
            return Err(InMemoryError::Commit);
        }

        let Self {
            mut accounts,
            staged,
            ..
        } = self;
        *accounts = staged;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum InMemoryError {
    #[error("account {0} not found")]
    NotFound(i64),

    #[error("store unreachable")]
    Unreachable,

    #[error("cannot decrement balance of account {0}")]
    Write(i64),

    #[error("cannot commit transaction")]
    Commit,
}

/// Records all published events.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<WithdrawalEvent>>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<WithdrawalEvent> {
        self.events.lock().expect("lock events").clone()
    }
}

impl EventPublisher for RecordingPublisher {
    type Error = PublishError;

    async fn publish(&self, event: &WithdrawalEvent) -> Result<(), Self::Error> {
        self.events.lock().expect("lock events").push(event.clone());
        Ok(())
    }
}

/// Fails to publish every event, counting the attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingPublisher {
    attempts: Arc<AtomicUsize>,
}

impl FailingPublisher {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventPublisher for FailingPublisher {
    type Error = PublishError;

    async fn publish(&self, _event: &WithdrawalEvent) -> Result<(), Self::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PublishError)
    }
}

#[derive(Debug, Error)]
#[error("transport down")]
pub struct PublishError;
