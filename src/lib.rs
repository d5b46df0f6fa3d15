// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Graph Token Verifier - Microsoft bearer token verification service
//!
//! This crate verifies Microsoft identity platform (Entra ID) access tokens
//! against the tenant's published signing keys and exposes the caller's
//! identity to HTTP handlers.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, JWKS key source, extractors
//! - `config` - Environment-driven settings
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
