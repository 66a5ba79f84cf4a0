// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::{
    error::ApiError,
    models::{AmountInput, ProcessIntentRequest, ProcessIntentResponse},
    relay::RelayIntent,
    state::AppState,
};

/// Validate an intent and start a relay run in the background.
///
/// Returns as soon as the execution is recorded; poll the status endpoint
/// for the outcome.
#[utoipa::path(
    post,
    path = "/api/process-intent",
    request_body = ProcessIntentRequest,
    tag = "Relay",
    responses(
        (status = 200, description = "Execution started", body = ProcessIntentResponse),
        (status = 400, description = "Malformed body, missing field or amount below minimum")
    )
)]
pub async fn process_intent(
    State(state): State<AppState>,
    payload: Result<Json<ProcessIntentRequest>, JsonRejection>,
) -> Result<Json<ProcessIntentResponse>, ApiError> {
    let Json(request) = payload?;
    let amount = request.amount.as_ref().map(AmountInput::as_decimal);
    let intent = RelayIntent::parse(request.destination(), amount.as_deref())?;

    let record = state.submitter.submit(intent)?;
    info!(
        execution_id = %record.id,
        amount = %intent.amount_decimal(),
        mode = %state.submitter.mode(),
        "Intent accepted"
    );

    Ok(Json(ProcessIntentResponse {
        execution_id: record.id,
        status: record.status,
    }))
}
