use crate::domain::{BalanceStore, BalanceTx, Notifier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use tracing::{debug, instrument, warn};

/// Balances are stored with two decimal places, so finer amounts would be rounded away.
const MAX_AMOUNT_SCALE: u32 = 2;

/// Status attached to every withdrawal attempt and published with its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    InvalidAmount,
    Successful,
    Failed,
    InsufficientFunds,
    Error,
}

/// Outcome of a withdrawal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    Success,
    InsufficientFunds,
    InvalidAmount,
    WriteFailed,
    SystemError(String),
}

impl WithdrawalOutcome {
    pub fn status(&self) -> WithdrawalStatus {
        match self {
            WithdrawalOutcome::Success => WithdrawalStatus::Successful,
            WithdrawalOutcome::InsufficientFunds => WithdrawalStatus::InsufficientFunds,
            WithdrawalOutcome::InvalidAmount => WithdrawalStatus::InvalidAmount,
            WithdrawalOutcome::WriteFailed => WithdrawalStatus::Failed,
            WithdrawalOutcome::SystemError(_) => WithdrawalStatus::Error,
        }
    }
}

/// The user facing message, which is the response body of the withdraw endpoint.
impl Display for WithdrawalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalOutcome::Success => write!(f, "Withdrawal successful"),
            WithdrawalOutcome::InsufficientFunds => write!(f, "Insufficient funds for withdrawal"),
            WithdrawalOutcome::InvalidAmount => write!(f, "Invalid withdrawal amount"),
            WithdrawalOutcome::WriteFailed => write!(f, "Withdrawal failed"),
            WithdrawalOutcome::SystemError(detail) => {
                write!(f, "Error processing withdrawal: {detail}")
            }
        }
    }
}

/// Event describing the outcome of a withdrawal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub amount: Option<Decimal>,
    pub account_id: i64,
    pub status: WithdrawalStatus,
}

/// Withdrawals against a [BalanceStore], notifying every outcome.
#[derive(Debug, Clone)]
pub struct Withdrawals<S> {
    balance_store: S,
    notifier: Notifier,
}

impl<S> Withdrawals<S>
where
    S: BalanceStore,
{
    pub fn new(balance_store: S, notifier: Notifier) -> Self {
        Self {
            balance_store,
            notifier,
        }
    }

    /// Withdraw the given amount from the given account. Never fails: store errors are turned
    /// into [WithdrawalOutcome::SystemError]. Exactly one event is handed to the notifier.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, account_id: i64, amount: Option<Decimal>) -> WithdrawalOutcome {
        let outcome = match self.try_withdraw(account_id, amount).await {
            Ok(outcome) => outcome,

            Err(error) => {
                warn!(%error, "cannot process withdrawal");
                WithdrawalOutcome::SystemError(error.to_string())
            }
        };
        debug!(?outcome, "withdrawal processed");

        self.notifier.notify(WithdrawalEvent {
            amount,
            account_id,
            status: outcome.status(),
        });

        outcome
    }

    async fn try_withdraw(
        &self,
        account_id: i64,
        amount: Option<Decimal>,
    ) -> Result<WithdrawalOutcome, S::Error> {
        let Some(amount) = amount.filter(|amount| {
            *amount > Decimal::ZERO && amount.normalize().scale() <= MAX_AMOUNT_SCALE
        }) else {
            return Ok(WithdrawalOutcome::InvalidAmount);
        };

        let mut tx = self.balance_store.begin().await?;

        let balance = tx.read_balance(account_id).await?;
        if balance < amount {
            return Ok(WithdrawalOutcome::InsufficientFunds);
        }

        let rows_affected = tx.decrement_balance(account_id, amount).await?;
        if rows_affected == 0 {
            return Ok(WithdrawalOutcome::WriteFailed);
        }

        tx.commit().await?;
        Ok(WithdrawalOutcome::Success)
    }
}
