// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, models::ExecutionRecord, state::AppState};

#[utoipa::path(
    get,
    path = "/api/status/{id}",
    params(
        ("id" = String, Path, description = "Execution id returned by process-intent")
    ),
    tag = "Relay",
    responses(
        (status = 200, body = ExecutionRecord),
        (status = 404, description = "Execution not found")
    )
)]
pub async fn get_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExecutionRecord>, ApiError> {
    Ok(Json(state.tracker.get(&id)?))
}
