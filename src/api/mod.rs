// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{ClaimSet, Verification},
    state::AppState,
};

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new().route("/me", get(auth::get_current_user));

    Router::new()
        .route("/", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1/auth", auth_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::get_current_user
    ),
    components(
        schemas(
            ClaimSet,
            Verification,
            auth::CurrentUserResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::ReadyChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health Check", description = "Liveness and readiness"),
        (name = "Authentication", description = "Microsoft Graph bearer token identity")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::*;
    use crate::auth::{JwksManager, TokenVerifier};
    use axum::body::{to_bytes, Body};
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn verified_app() -> (Router, wiremock::MockServer) {
        let server = jwks_server().await;
        let keys = JwksManager::new(jwks_url(&server), Duration::from_secs(5)).unwrap();
        let verifier = TokenVerifier::new(Some(keys), AUDIENCE, ISSUER, false);
        (router(AppState::new(verifier)), server)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(uri: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_health_check_needs_no_auth() {
        let (app, _server) = verified_app().await;

        let response = app.oneshot(request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn me_returns_claims_for_valid_token() {
        let (app, _server) = verified_app().await;
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = signed_token(&graph_claims(exp));

        let response = app
            .oneshot(request("/api/v1/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["user_info"]["username"], "alice@example.com");
        assert_eq!(body["user_info"]["roles"][0], "admin");
        assert_eq!(body["user_info"]["verification"], "verified");
        assert_eq!(
            body["message"],
            "User authenticated successfully via Microsoft Graph"
        );
    }

    #[tokio::test]
    async fn me_rejects_expired_token() {
        let (app, _server) = verified_app().await;
        let exp = chrono::Utc::now().timestamp() - 60;
        let token = signed_token(&graph_claims(exp));

        let response = app
            .oneshot(request("/api/v1/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "token_expired");
    }

    #[tokio::test]
    async fn me_requires_authorization_header() {
        let (app, _server) = verified_app().await;

        let response = app.oneshot(request("/api/v1/auth/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn readiness_reports_key_source() {
        let (app, _server) = verified_app().await;

        let response = app.oneshot(request("/health/ready", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["checks"]["jwks"], "ok");
    }

    #[tokio::test]
    async fn readiness_degrades_without_keys_or_fallback() {
        let app = router(AppState::new(TokenVerifier::new(None, AUDIENCE, ISSUER, false)));

        let response = app.oneshot(request("/health/ready", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["jwks"], "not_configured");
    }

    #[test]
    fn openapi_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/me"));
    }
}
