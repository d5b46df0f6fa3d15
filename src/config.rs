// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AZURE_TENANT_ID` | Entra ID tenant the tokens are issued for | Required |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Microsoft Graph resource ID |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | `https://sts.windows.net/{tenant}/` |
//! | `AUTH_JWKS_URL_TEMPLATE` | JWKS discovery URL, `{tenant}` is substituted | Microsoft login endpoint |
//! | `AUTH_ALLOW_INSECURE_FALLBACK` | Accept unverified payloads when verification fails | `false` |
//! | `AUTH_JWKS_TIMEOUT_SECS` | JWKS fetch timeout in seconds (1-60) | `10` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const ISSUER_ENV: &str = "AUTH_ISSUER";
pub const JWKS_URL_TEMPLATE_ENV: &str = "AUTH_JWKS_URL_TEMPLATE";
pub const ALLOW_INSECURE_FALLBACK_ENV: &str = "AUTH_ALLOW_INSECURE_FALLBACK";
pub const JWKS_TIMEOUT_ENV: &str = "AUTH_JWKS_TIMEOUT_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Resource ID of Microsoft Graph, the audience of Graph access tokens.
pub const DEFAULT_AUDIENCE: &str = "00000003-0000-0000-c000-000000000000";

/// Placeholder substituted with the tenant ID in URL templates.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

pub const DEFAULT_ISSUER_TEMPLATE: &str = "https://sts.windows.net/{tenant}/";

pub const DEFAULT_JWKS_URL_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/discovery/v2.0/keys";

pub const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for `AUTH_JWKS_TIMEOUT_SECS`.
pub const MAX_JWKS_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

impl ConfigError {
    fn invalid(var: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

/// Token verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Entra ID tenant identifier.
    pub tenant_id: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Fully resolved JWKS endpoint.
    pub jwks_url: String,
    /// Decode tokens without signature verification when verification fails.
    pub allow_insecure_fallback: bool,
    /// Timeout applied to each JWKS fetch.
    pub jwks_timeout: Duration,
}

impl AuthSettings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&utf8_vars(env::vars_os()))
    }

    /// Load settings from a map (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let tenant_id = vars
            .get(TENANT_ID_ENV)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(TENANT_ID_ENV.to_string()))?
            .to_string();

        let audience = vars
            .get(AUDIENCE_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let issuer = vars
            .get(ISSUER_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISSUER_TEMPLATE.replace(TENANT_PLACEHOLDER, &tenant_id));

        let template = vars
            .get(JWKS_URL_TEMPLATE_ENV)
            .map(String::as_str)
            .unwrap_or(DEFAULT_JWKS_URL_TEMPLATE);
        let jwks_url = template.replace(TENANT_PLACEHOLDER, &tenant_id);
        validate_http_url(JWKS_URL_TEMPLATE_ENV, &jwks_url)?;

        let allow_insecure_fallback = match vars.get(ALLOW_INSECURE_FALLBACK_ENV) {
            Some(value) => parse_bool(ALLOW_INSECURE_FALLBACK_ENV, value)?,
            None => false,
        };

        let jwks_timeout = if let Some(value_str) = vars.get(JWKS_TIMEOUT_ENV) {
            let secs: u64 = value_str.trim().parse().map_err(|e| {
                ConfigError::invalid(
                    JWKS_TIMEOUT_ENV,
                    format!("must be a positive integer, got '{value_str}': {e}"),
                )
            })?;

            if secs == 0 || secs > MAX_JWKS_TIMEOUT.as_secs() {
                return Err(ConfigError::invalid(
                    JWKS_TIMEOUT_ENV,
                    format!(
                        "must be between 1 and {} seconds, got {secs}",
                        MAX_JWKS_TIMEOUT.as_secs()
                    ),
                ));
            }

            Duration::from_secs(secs)
        } else {
            DEFAULT_JWKS_TIMEOUT
        };

        Ok(Self {
            tenant_id,
            audience,
            issuer,
            jwks_url,
            allow_insecure_fallback,
            jwks_timeout,
        })
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub json_logs: bool,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&utf8_vars(env::vars_os()))
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = vars
            .get(HOST_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match vars.get(PORT_ENV) {
            Some(value) => value.trim().parse().map_err(|e| {
                ConfigError::invalid(PORT_ENV, format!("must be a valid port, got '{value}': {e}"))
            })?,
            None => DEFAULT_PORT,
        };

        let json_logs = vars
            .get(LOG_FORMAT_ENV)
            .is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            host,
            port,
            json_logs,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Collect variables whose name and value are valid UTF-8; others are skipped.
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            var,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn validate_http_url(var: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::invalid(var, format!("'{value}' is not a valid URL: {e}")))?;

    match url.scheme() {
        "https" | "http" => Ok(()),
        scheme => Err(ConfigError::invalid(
            var,
            format!("unsupported URL scheme '{scheme}'"),
        )),
    }
}
