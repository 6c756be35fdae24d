//! Operator CRUD handlers. Every route here requires an allow-listed operator.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::api::routes::AppState;
use crate::auth::Operator;
use crate::calculator::{build_record, validate, ValidationIssue};
use crate::error::{AppError, Result};
use crate::types::{StockInput, StockRecord};

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub message: &'static str,
    pub stock: StockRecord,
    /// Accepted-but-suspicious input, e.g. promoter share above total.
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn create_stock(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Json(input): Json<StockInput>,
) -> Result<(StatusCode, Json<StockResponse>)> {
    let warnings = check(&state, &input)?;
    let record = build_record(String::new(), input, &state.rules);

    let stock = state
        .repo
        .create(record)
        .await
        .map_err(store_failure(&state, "create", "Error adding stock details"))?;

    info!(id = %stock.id, name = %stock.name, operator = %operator.email, "stock created");
    Ok((
        StatusCode::CREATED,
        Json(StockResponse {
            message: "Stock details added successfully!",
            stock,
            warnings,
        }),
    ))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Operator(_operator): Operator,
    Path(id): Path<String>,
) -> Result<Json<StockResponse>> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Please provide a stock ID".to_string()));
    }
    let stock = state
        .repo
        .get(&id)
        .await
        .map_err(store_failure(&state, "get", "Error fetching data"))?
        .ok_or_else(|| AppError::NotFound("No stock found with that ID".to_string()))?;

    Ok(Json(StockResponse {
        message: "Data fetched successfully!",
        stock,
        warnings: Vec::new(),
    }))
}

/// Full replace. Derived fields are recomputed from the submitted input.
pub async fn update_stock(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(id): Path<String>,
    Json(input): Json<StockInput>,
) -> Result<Json<StockResponse>> {
    let warnings = check(&state, &input)?;
    let record = build_record(id.clone(), input, &state.rules);

    state
        .repo
        .update(&id, &record)
        .await
        .map_err(store_failure(&state, "update", "Error updating stock"))?;

    info!(id = %id, operator = %operator.email, "stock updated");
    Ok(Json(StockResponse {
        message: "Stock updated successfully!",
        stock: record,
        warnings,
    }))
}

pub async fn delete_stock(
    State(state): State<AppState>,
    Operator(operator): Operator,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state
        .repo
        .delete(&id)
        .await
        .map_err(store_failure(&state, "delete", "Error deleting stock"))?;

    info!(id = %id, operator = %operator.email, "stock deleted");
    Ok(Json(MessageResponse {
        message: "Stock deleted successfully!",
    }))
}

/// Run the shared validation; returns the warnings that were let through.
fn check(state: &AppState, input: &StockInput) -> Result<Vec<ValidationIssue>> {
    let report = validate(input, &state.rules);
    if !report.accepts(state.strict_validation) {
        return Err(AppError::Validation(report));
    }
    Ok(report.warnings().cloned().collect())
}

/// Log and count a store failure, replacing it with the user-facing
/// notification. Not-found passes through unchanged.
fn store_failure<'a>(
    state: &'a AppState,
    op: &'static str,
    notice: &'static str,
) -> impl FnOnce(AppError) -> AppError + 'a {
    move |e| match e {
        AppError::NotFound(_) => AppError::NotFound("No stock found with that ID".to_string()),
        other => {
            error!(op, "store operation failed: {other}");
            state.health.inc_store_errors();
            AppError::Failed(notice)
        }
    }
}
