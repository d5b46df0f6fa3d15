// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, ClaimSet};

/// Response for GET /api/v1/auth/me
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user_info: ClaimSet,
    pub message: String,
}

impl From<ClaimSet> for CurrentUserResponse {
    fn from(user_info: ClaimSet) -> Self {
        Self {
            user_info,
            message: "User authenticated successfully via Microsoft Graph".to_string(),
        }
    }
}

/// Get the current user's information from the bearer token.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized - invalid, expired or missing token"),
        (status = 503, description = "Signing keys unavailable"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<CurrentUserResponse> {
    Json(user.into())
}
