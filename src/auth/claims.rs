// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token payload and the claim set handed to callers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Placeholder used when neither `unique_name` nor `upn` is present.
pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Placeholder used when the token has no `name` claim.
pub const UNKNOWN_NAME: &str = "Unknown User";

/// Placeholder used when the token has no `exp` claim.
pub const UNKNOWN_EXPIRY: &str = "Unknown";

/// Claims read from a Microsoft identity platform access token.
///
/// Only the claims that feed [`ClaimSet`] are modelled; `aud`, `iss` and
/// `nbf` are checked by `jsonwebtoken` during verification and otherwise
/// ignored. Unknown claims are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphClaims {
    /// Legacy user principal name (v1 tokens)
    pub unique_name: Option<String>,
    /// User principal name
    pub upn: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Tenant ID
    pub tid: Option<String>,
    /// Object ID of the principal in the tenant
    pub oid: Option<String>,
    /// App roles assigned to the principal
    pub roles: Option<Vec<String>>,
    /// Expiration timestamp (NumericDate, may carry a fraction)
    pub exp: Option<f64>,
}

impl GraphClaims {
    fn principal_name(&self) -> Option<&str> {
        self.unique_name.as_deref().or(self.upn.as_deref())
    }
}

/// How the payload behind a [`ClaimSet`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// Signature, audience and issuer were checked against the tenant keys
    Verified,
    /// Payload was decoded without signature verification
    UnverifiedFallback,
}

/// Identity extracted from a bearer token.
///
/// This is the value callers receive from the verifier. It is built once per
/// verification and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClaimSet {
    /// `unique_name`, falling back to `upn`, then `"Unknown"`
    pub username: String,
    /// Display name, or `"Unknown User"`
    pub name: String,
    /// Same source as `username`, empty when absent
    pub email: String,
    /// Tenant ID (`tid`)
    pub tenant_id: Option<String>,
    /// Object ID (`oid`)
    pub object_id: Option<String>,
    /// App roles in token order
    pub roles: Vec<String>,
    /// RFC 3339 UTC expiry, or `"Unknown"` when the token has no `exp`
    pub expires_at: String,
    /// Whether the signature was verified
    pub verification: Verification,
}

impl ClaimSet {
    /// Build the claim set from a decoded payload.
    pub fn from_claims(claims: GraphClaims, verification: Verification) -> Self {
        let principal = claims.principal_name().map(str::to_owned);

        Self {
            username: principal
                .clone()
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
            name: claims.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            email: principal.unwrap_or_default(),
            tenant_id: claims.tid,
            object_id: claims.oid,
            roles: claims.roles.unwrap_or_default(),
            expires_at: format_expiry(claims.exp),
            verification,
        }
    }

    /// True when the payload came from the insecure fallback path.
    pub fn is_unverified(&self) -> bool {
        self.verification == Verification::UnverifiedFallback
    }
}

fn format_expiry(exp: Option<f64>) -> String {
    exp.map(|secs| secs.floor() as i64)
        .filter(|&secs| secs != 0)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| UNKNOWN_EXPIRY.to_string())
}
