use rust_decimal::Decimal;
use std::error::Error as StdError;

/// Transactional access to account balances.
#[trait_variant::make(Send)]
pub trait BalanceStore
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    type Tx: BalanceTx<Error = Self::Error>;

    /// Open a transaction; dropping it without [BalanceTx::commit] rolls it back.
    async fn begin(&self) -> Result<Self::Tx, Self::Error>;
}

#[trait_variant::make(Send)]
pub trait BalanceTx
where
    Self: Send,
{
    type Error: StdError + Send + Sync + 'static;

    /// Read the balance of the given account, locking it until the transaction ends. Fails if
    /// there is no such account.
    async fn read_balance(&mut self, account_id: i64) -> Result<Decimal, Self::Error>;

    /// Subtract the given amount from the balance of the given account without checking for
    /// sufficient funds. Returns the number of affected rows.
    async fn decrement_balance(
        &mut self,
        account_id: i64,
        amount: Decimal,
    ) -> Result<u64, Self::Error>;

    async fn commit(self) -> Result<(), Self::Error>;
}
