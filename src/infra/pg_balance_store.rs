use crate::domain::{BalanceStore, BalanceTx};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct PgBalanceStore {
    pool: PgPool,
}

impl PgBalanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BalanceStore for PgBalanceStore {
    type Error = sqlx::Error;

    type Tx = PgBalanceTx;

    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Self::Tx, Self::Error> {
        let tx = self.pool.begin().await?;
        Ok(PgBalanceTx { tx })
    }
}

/// Rolled back when dropped without being committed.
pub struct PgBalanceTx {
    tx: Transaction<'static, Postgres>,
}

impl BalanceTx for PgBalanceTx {
    type Error = sqlx::Error;

    #[instrument(skip(self))]
    async fn read_balance(&mut self, account_id: i64) -> Result<Decimal, Self::Error> {
        let balance = QueryBuilder::new("SELECT balance FROM accounts WHERE id = ")
            .push_bind(account_id)
            .push(" FOR UPDATE")
            .build_query_scalar::<Decimal>()
            .fetch_one(&mut *self.tx)
            .await?;

        debug!(%balance, "read balance");
        Ok(balance)
    }

    #[instrument(skip(self))]
    async fn decrement_balance(
        &mut self,
        account_id: i64,
        amount: Decimal,
    ) -> Result<u64, Self::Error> {
        let rows_affected = QueryBuilder::new("UPDATE accounts SET balance = balance - ")
            .push_bind(amount)
            .push(" WHERE id = ")
            .push_bind(account_id)
            .build()
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        debug!(rows_affected, "decremented balance");
        Ok(rows_affected)
    }

    async fn commit(self) -> Result<(), Self::Error> {
        self.tx.commit().await
    }
}
