// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Caching
//!
//! - Keys are cached per `kid` for the lifetime of the process
//! - A cache miss triggers a fetch of the full key set; new keys are added,
//!   existing entries are never replaced
//! - Misses are refetched at most once per `min_refresh_interval`; inside that
//!   window an unknown `kid` is rejected without contacting the endpoint
//! - No lock is held while the key set is fetched, so concurrent misses may
//!   fetch twice but never block readers
//!
//! ## Usage
//!
//! Build a `JwksManager` from the tenant discovery URL and hand it to the
//! `TokenVerifier`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default minimum time between key set fetches triggered by unknown `kid`s.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A public key reconstructed from a JWK.
#[derive(Clone)]
pub struct SigningKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// JWKS manager with a per-`kid` key cache.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (tenant discovery endpoint)
    jwks_url: String,
    /// Cached keys by key ID
    cache: Arc<RwLock<HashMap<String, SigningKey>>>,
    /// HTTP client
    client: reqwest::Client,
    /// Time of the last successful fetch
    fetched_at: Arc<RwLock<Option<Instant>>>,
    /// Minimum time between fetches triggered by cache misses
    min_refresh_interval: Duration,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL, e.g.
    ///   `https://login.microsoftonline.com/<tenant>/discovery/v2.0/keys`
    /// - `timeout`: Upper bound for each fetch of the key set
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::KeySourceUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            client,
            fetched_at: Arc::new(RwLock::new(None)),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    /// Set the minimum time between fetches triggered by unknown `kid`s.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Number of keys currently cached.
    pub async fn cached_key_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Get the verification key for the given key ID.
    ///
    /// Served from the cache when possible, otherwise the key set is fetched
    /// once, unless it was fetched within `min_refresh_interval`. A `kid` that
    /// is still unknown yields `AuthError::SignatureInvalid`.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        if let Some(key) = self.cache.read().await.get(kid).cloned() {
            tracing::debug!(target: "auth.jwks", kid = %kid, "JWKS cache hit");
            return Ok(key);
        }

        if self.fetched_recently().await {
            tracing::debug!(target: "auth.jwks", kid = %kid, "JWKS refresh rate limited");
        } else {
            self.refresh().await?;
        }

        let found = self.cache.read().await.get(kid).cloned();
        found.ok_or_else(|| {
            tracing::warn!(target: "auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            AuthError::SignatureInvalid
        })
    }

    /// Fetch the key set and add any keys not yet cached.
    ///
    /// Returns the number of cached keys afterwards.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let fetched = self.fetch_keys().await?;

        let count = {
            let mut cache = self.cache.write().await;
            for (key_id, key) in fetched {
                cache.entry(key_id).or_insert(key);
            }
            cache.len()
        };

        // keys must be visible before a rate-limited miss re-reads the cache
        *self.fetched_at.write().await = Some(Instant::now());
        Ok(count)
    }

    async fn fetched_recently(&self) -> bool {
        self.fetched_at
            .read()
            .await
            .is_some_and(|at| at.elapsed() < self.min_refresh_interval)
    }

    /// Fetch the key set and convert every usable key.
    async fn fetch_keys(&self) -> Result<Vec<(String, SigningKey)>, AuthError> {
        tracing::debug!(target: "auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(fetch_error)?;

        if !response.status().is_success() {
            tracing::error!(
                target: "auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySourceUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(fetch_error)?;

        let keys: Vec<(String, SigningKey)> = jwks
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                match jwk_to_signing_key(jwk) {
                    Ok(key) => Some((kid, key)),
                    Err(e) => {
                        tracing::debug!(
                            target: "auth.jwks",
                            kid = %kid,
                            error = %e,
                            "Skipping unusable JWK"
                        );
                        None
                    }
                }
            })
            .collect();

        tracing::info!(target: "auth.jwks", key_count = keys.len(), "JWKS fetched");

        Ok(keys)
    }
}

fn fetch_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        tracing::error!(target: "auth.jwks", "JWKS fetch timed out");
        AuthError::KeyFetchTimeout
    } else {
        tracing::error!(target: "auth.jwks", error = %err, "Failed to fetch JWKS");
        AuthError::KeySourceUnavailable(err.to_string())
    }
}

/// Convert a JWK to a verification key.
fn jwk_to_signing_key(jwk: &Jwk) -> Result<SigningKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::Unknown(format!("Failed to create RSA key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok(SigningKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::Unknown(format!("Failed to create EC key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok(SigningKey { key, algorithm })
        }
        _ => Err(AuthError::Unknown(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
