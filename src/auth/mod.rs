// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Verifies Microsoft identity platform bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. Client obtains a Microsoft Graph access token from Entra ID
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. Server:
//!    - Resolves the signing key for the token `kid` from the tenant JWKS
//!    - Verifies the RS256 signature, audience and issuer
//!    - Rejects tokens whose `exp` is not in the future
//!    - Extracts the caller identity into a `ClaimSet`
//!
//! ## Security
//!
//! - Signing keys are cached per `kid` for the process lifetime
//! - JWKS fetches are bounded by a configurable timeout
//! - Unverified decoding is only possible when explicitly enabled, and every
//!   use is written to the `audit` log target

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{ClaimSet, GraphClaims, Verification};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use jwks::JwksManager;
pub use verifier::TokenVerifier;
