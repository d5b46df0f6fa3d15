// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use graph_token_verifier::api::router;
use graph_token_verifier::auth::TokenVerifier;
use graph_token_verifier::config::{AuthSettings, ServerSettings};
use graph_token_verifier::state::AppState;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = ServerSettings::from_env()?;
    init_tracing(server.json_logs);

    let auth = AuthSettings::from_env()?;
    tracing::info!(
        tenant_id = %auth.tenant_id,
        audience = %auth.audience,
        issuer = %auth.issuer,
        jwks_url = %auth.jwks_url,
        jwks_timeout_secs = auth.jwks_timeout.as_secs(),
        insecure_fallback = auth.allow_insecure_fallback,
        "Loaded authentication settings"
    );

    let state = AppState::new(TokenVerifier::from_settings(&auth));
    let app = router(state);

    let addr: SocketAddr = server.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Graph token verifier listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
