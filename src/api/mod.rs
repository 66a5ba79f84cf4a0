// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        ExecutionProof, ExecutionRecord, ExecutionStatus, HealthResponse, ProcessIntentRequest,
        ProcessIntentResponse, RelayMode, RelayStage,
    },
    state::AppState,
};

pub mod health;
pub mod intents;
pub mod status;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/process-intent", post(intents::process_intent))
        .route("/status/{id}", get(status::get_status))
        .route("/health", get(health::health))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(intents::process_intent, status::get_status, health::health),
    components(
        schemas(
            ProcessIntentRequest,
            ProcessIntentResponse,
            ExecutionRecord,
            ExecutionProof,
            ExecutionStatus,
            RelayMode,
            RelayStage,
            HealthResponse
        )
    ),
    tags(
        (name = "Relay", description = "Intent submission and execution status"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;
