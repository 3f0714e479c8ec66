use crate::{api::AppState, domain::BalanceStore};
use axum::{
    extract::{Query, State},
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, OpenApi};

#[derive(OpenApi)]
#[openapi(paths(withdraw))]
pub struct ApiDoc;

pub fn app<S>() -> Router<AppState<S>>
where
    S: BalanceStore,
{
    Router::new().route("/withdraw", post(withdraw::<S>))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct WithdrawParams {
    /// ID of the account to debit.
    account_id: i64,

    /// Amount to withdraw; missing or non-positive amounts are rejected.
    amount: Option<Decimal>,
}

/// Withdraw an amount from an account. Business failures are reported in the plain text body of
/// a 200 response.
#[utoipa::path(
    post,
    path = "/bank/withdraw",
    params(WithdrawParams),
    responses(
        (status = 200, description = "Outcome of the withdrawal", body = String),
        (status = 400, description = "Malformed query parameters"),
    )
)]
#[instrument(skip(app_state))]
async fn withdraw<S>(
    State(app_state): State<AppState<S>>,
    Query(params): Query<WithdrawParams>,
) -> String
where
    S: BalanceStore,
{
    let WithdrawParams { account_id, amount } = params;
    app_state
        .withdrawals
        .withdraw(account_id, amount)
        .await
        .to_string()
}
