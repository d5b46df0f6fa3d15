// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! ## Flow
//!
//! 1. Reject empty, oversized and structurally invalid tokens, including an
//!    undecodable header or payload, before any key lookup
//! 2. With a key source: resolve the key for the header `kid`, verify the
//!    RS256 signature, `aud` and `iss`
//! 3. If that fails (or there is no key source) and the insecure fallback is
//!    enabled, decode the payload without verification and write an audit
//!    warning; otherwise return the failure
//! 4. Reject tokens whose `exp` is not strictly in the future
//! 5. Map the payload into a [`ClaimSet`]

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, Header, Validation};
use tracing::instrument;

use super::claims::{ClaimSet, GraphClaims, Verification};
use super::error::AuthError;
use super::jwks::JwksManager;
use crate::config::AuthSettings;

/// Maximum accepted token size (8 KiB), checked before any parsing.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Verifies Microsoft-issued bearer tokens.
pub struct TokenVerifier {
    /// Signing key source, `None` when it could not be initialized
    key_source: Option<JwksManager>,
    /// Signature and claim rules for the verified path
    validation: Validation,
    /// Accept unverified payloads when verification fails
    allow_insecure_fallback: bool,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    /// - `key_source`: JWKS manager, or `None` to run without signature verification
    /// - `audience`: Required `aud` claim
    /// - `issuer`: Required `iss` claim
    /// - `allow_insecure_fallback`: Decode without verification when verification fails
    pub fn new(
        key_source: Option<JwksManager>,
        audience: &str,
        issuer: &str,
        allow_insecure_fallback: bool,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["aud", "iss"]);
        // expiry is checked against the caller's clock after decoding
        validation.validate_exp = false;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            key_source,
            validation,
            allow_insecure_fallback,
        }
    }

    /// Create a verifier from loaded settings.
    ///
    /// A key source that fails to initialize is logged and left out; the
    /// fallback policy then decides whether tokens can still be accepted.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        let key_source = match JwksManager::new(&settings.jwks_url, settings.jwks_timeout) {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::warn!(
                    target: "auth.verifier",
                    error = %e,
                    "Could not initialize JWKS key source"
                );
                None
            }
        };

        if settings.allow_insecure_fallback {
            tracing::warn!(
                target: "audit",
                "Insecure token fallback is ENABLED: unverifiable tokens will be accepted"
            );
        }

        Self::new(
            key_source,
            &settings.audience,
            &settings.issuer,
            settings.allow_insecure_fallback,
        )
    }

    /// The key source, if one was initialized.
    pub fn key_source(&self) -> Option<&JwksManager> {
        self.key_source.as_ref()
    }

    pub fn allows_insecure_fallback(&self) -> bool {
        self.allow_insecure_fallback
    }

    /// Verify a token against the current time.
    pub async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Verify a token against `now` (seconds since epoch).
    #[instrument(skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<ClaimSet, AuthError> {
        let (header, payload) = parse_token(token)?;

        let (claims, verification) = match &self.key_source {
            Some(keys) => match self.verify_signed(token, &header, keys).await {
                Ok(claims) => (claims, Verification::Verified),
                Err(e) => (self.fallback(payload, e)?, Verification::UnverifiedFallback),
            },
            None => {
                let cause =
                    AuthError::KeySourceUnavailable("key source not initialized".to_string());
                (self.fallback(payload, cause)?, Verification::UnverifiedFallback)
            }
        };

        check_expiry(claims.exp, now)?;

        tracing::debug!(target: "auth.verifier", verification = ?verification, "Token accepted");
        Ok(ClaimSet::from_claims(claims, verification))
    }

    async fn verify_signed(
        &self,
        token: &str,
        header: &Header,
        keys: &JwksManager,
    ) -> Result<GraphClaims, AuthError> {
        let kid = header.kid.as_deref().ok_or_else(|| {
            tracing::debug!(target: "auth.verifier", "Token header has no kid");
            AuthError::SignatureInvalid
        })?;

        let signing_key = keys.get_decoding_key(kid).await?;
        if signing_key.algorithm != Algorithm::RS256 {
            tracing::debug!(
                target: "auth.verifier",
                kid = %kid,
                algorithm = ?signing_key.algorithm,
                "Published key is not an RS256 key"
            );
            return Err(AuthError::SignatureInvalid);
        }

        let data = decode::<GraphClaims>(token, &signing_key.key, &self.validation)?;
        Ok(data.claims)
    }

    /// Accept the unverified payload if the policy allows it, else surface `cause`.
    fn fallback(&self, payload: GraphClaims, cause: AuthError) -> Result<GraphClaims, AuthError> {
        if !self.allow_insecure_fallback {
            return Err(cause);
        }

        tracing::warn!(
            target: "audit",
            reason = cause.error_code(),
            error = %cause,
            "Accepting token payload WITHOUT signature verification"
        );

        Ok(payload)
    }
}

/// Check size and shape, then decode header and payload without verifying.
fn parse_token(token: &str) -> Result<(Header, GraphClaims), AuthError> {
    if token.is_empty() || token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "auth.verifier",
            token_size = token.len(),
            "Token rejected: bad size"
        );
        return Err(AuthError::TokenMalformed);
    }

    if token.split('.').count() != 3 {
        return Err(AuthError::TokenMalformed);
    }

    let data = jsonwebtoken::dangerous::insecure_decode::<GraphClaims>(token).map_err(|e| {
        tracing::debug!(target: "auth.verifier", error = %e, "Token rejected: undecodable");
        AuthError::TokenMalformed
    })?;
    Ok((data.header, data.claims))
}

fn check_expiry(exp: Option<f64>, now: i64) -> Result<(), AuthError> {
    match exp {
        Some(exp) if exp <= now as f64 => Err(AuthError::TokenExpired),
        _ => Ok(()),
    }
}
