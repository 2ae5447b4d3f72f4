use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ValidationErrors},
    handlers::{audit, check_in, check_required, page_params},
    models::{
        CreateTransactionRequest, MonthlyTransaction, Paginated, Transaction, TransactionStats,
        UpdateTransactionRequest,
    },
    permissions::{Action, modules},
};

pub const TRANSACTION_TYPES: [&str; 2] = ["income", "expense"];

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/transactions",
    params(TransactionFilter),
    responses((status = 200, description = "Transactions page", body = Paginated<Transaction>))
)]
pub async fn list_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Paginated<Transaction>>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::View)?;
    let (page, per_page) = page_params(filter.page, filter.per_page);
    let transactions = state
        .repo
        .list_transactions(filter.transaction_type, page, per_page)
        .await?;
    Ok(Json(transactions))
}

#[utoipa::path(
    get,
    path = "/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 200, description = "Transaction", body = Transaction), (status = 404, description = "Not Found"))
)]
pub async fn get_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::View)?;
    let transaction = state
        .repo
        .get_transaction(id)
        .await?
        .ok_or(ApiError::NotFound("transaction"))?;
    Ok(Json(transaction))
}

fn validate_amount(errors: &mut ValidationErrors, amount: f64) {
    if !(amount > 0.0) {
        errors.add("amount", "The amount must be greater than 0.");
    }
}

/// create_transaction
///
/// [Authenticated Route] Records one ledger entry and stamps the acting
/// user as its creator.
#[utoipa::path(
    post,
    path = "/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = Transaction),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::TRANSACTIONS, Action::Create)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "description", &payload.description);
    check_in(&mut errors, "type", &payload.transaction_type, &TRANSACTION_TYPES);
    validate_amount(&mut errors, payload.amount);
    errors.into_result()?;

    let transaction = state
        .repo
        .create_transaction(payload, Some(auth.id()))
        .await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "create_transaction",
        &format!(
            "Recorded {} of {}: {}",
            transaction.transaction_type, transaction.amount, transaction.description
        ),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "transaction": transaction,
            "message": "Transaction created successfully",
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = UpdateTransactionRequest,
    responses((status = 200, description = "Transaction updated", body = Transaction))
)]
pub async fn update_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    if let Some(transaction_type) = &payload.transaction_type {
        check_in(&mut errors, "type", transaction_type, &TRANSACTION_TYPES);
    }
    if let Some(amount) = payload.amount {
        validate_amount(&mut errors, amount);
    }
    errors.into_result()?;

    let transaction = state
        .repo
        .update_transaction(id, payload)
        .await?
        .ok_or(ApiError::NotFound("transaction"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_transaction",
        &format!("Updated transaction: {}", transaction.description),
    )
    .await;

    Ok(Json(json!({
        "transaction": transaction,
        "message": "Transaction updated successfully",
    })))
}

#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::Delete)?;

    if !state.repo.delete_transaction(id).await? {
        return Err(ApiError::NotFound("transaction"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_transaction",
        &format!("Deleted transaction {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

/// transaction_statistics
///
/// [Authenticated Route] Running totals: income, expense and balance.
#[utoipa::path(
    get,
    path = "/transactions-statistics",
    responses((status = 200, description = "Ledger totals", body = TransactionStats))
)]
pub async fn transaction_statistics(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TransactionStats>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::View)?;
    Ok(Json(state.repo.transaction_stats().await?))
}

/// monthly_transactions
///
/// [Authenticated Route] Six months of income/expense totals grouped by
/// calendar month, oldest first, for the finance chart.
#[utoipa::path(
    get,
    path = "/transactions-monthly",
    responses((status = 200, description = "Monthly totals", body = Vec<MonthlyTransaction>))
)]
pub async fn monthly_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthlyTransaction>>, ApiError> {
    auth.require(modules::TRANSACTIONS, Action::View)?;
    Ok(Json(state.repo.monthly_transactions().await?))
}
