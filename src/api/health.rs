// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Response for the unauthenticated root endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub authentication: String,
}

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    pub checks: ReadyChecks,
}

/// Individual readiness check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Signing key source status ("ok", "unavailable" or "not_configured").
    pub jwks: String,
    /// Whether unverified tokens may be accepted.
    pub insecure_fallback: bool,
}

/// Health check endpoint (no authentication required).
#[utoipa::path(
    get,
    path = "/",
    tag = "Health Check",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Graph token verifier is running".to_string(),
        authentication: "Microsoft Graph Bearer Token required for most endpoints".to_string(),
    })
}

/// Check that signing keys can be obtained.
async fn check_jwks(state: &AppState) -> &'static str {
    let Some(keys) = state.verifier.key_source() else {
        return "not_configured";
    };

    if keys.cached_key_count().await > 0 {
        return "ok";
    }

    match keys.refresh().await {
        Ok(count) if count > 0 => "ok",
        _ => "unavailable",
    }
}

/// Readiness probe handler.
///
/// Returns 200 only if signing keys are available. With the insecure
/// fallback enabled the service still accepts tokens without keys, so it
/// reports ready in that case too.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health Check",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let jwks = check_jwks(&state).await;
    let insecure_fallback = state.verifier.allows_insecure_fallback();
    let all_ok = jwks == "ok" || insecure_fallback;

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: ReadyChecks {
            service: "ok".to_string(),
            jwks: jwks.to_string(),
            insecure_fallback,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
