// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every verification outcome other than a returned claim set maps to one of
/// these variants, so callers can tell an expired token from a forged one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Signing keys could not be obtained
    #[error("Signing key source unavailable: {0}")]
    KeySourceUnavailable(String),
    /// Signing key fetch did not complete in time
    #[error("Timed out fetching signing keys")]
    KeyFetchTimeout,
    /// Signature could not be verified against a published key
    #[error("Token signature is invalid")]
    SignatureInvalid,
    /// Audience or issuer does not match the expected value
    #[error("Token claim '{claim}' does not match the expected value")]
    ClaimMismatch { claim: String },
    /// Token is not a well-formed signed JWT
    #[error("Token is malformed")]
    TokenMalformed,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Any other validation failure
    #[error("Token validation failed: {0}")]
    Unknown(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub(crate) fn claim_mismatch(claim: impl Into<String>) -> Self {
        AuthError::ClaimMismatch {
            claim: claim.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::KeySourceUnavailable(_) => "key_source_unavailable",
            AuthError::KeyFetchTimeout => "key_fetch_timeout",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimMismatch { .. } => "claim_mismatch",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::TokenExpired => "token_expired",
            AuthError::Unknown(_) => "unknown",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeySourceUnavailable(_) | AuthError::KeyFetchTimeout => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => AuthError::SignatureInvalid,
            ErrorKind::InvalidAudience => AuthError::claim_mismatch("aud"),
            ErrorKind::InvalidIssuer => AuthError::claim_mismatch("iss"),
            ErrorKind::MissingRequiredClaim(claim) => AuthError::claim_mismatch(claim.as_str()),
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::TokenMalformed,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => {
                AuthError::Unknown("token is not yet valid".to_string())
            }
            _ => AuthError::Unknown(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
