// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for authentication tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT_ID: &str = "5d3e2773-e07f-4432-a630-1a0f68a28a05";
pub const AUDIENCE: &str = "00000003-0000-0000-c000-000000000000";
pub const ISSUER: &str = "https://sts.windows.net/5d3e2773-e07f-4432-a630-1a0f68a28a05/";
pub const KID: &str = "test-key-1";
pub const JWKS_PATH: &str = "/tenant/discovery/v2.0/keys";

/// Private key whose public half is published in the test JWKS.
pub const SIGNING_KEY_PEM: &str = include_str!("testdata/signing_key.pem");

/// Modulus of `SIGNING_KEY_PEM`.
pub const SIGNING_KEY_N: &str = "1hgq-bFbENpAQHxjPeNIWgegHpQcY5lTHAjt7vtMx7aRk1Mi4ksdhFSu7JCMxCJhb4-wDOwxFRKYFBBfSl4ZDmxze3Ao88K_1Px1UnbhBZu7V5a8Z0ld72sxh0L4f2g4yx9AKFmdNN4BrdknPiSHzO6SujH2DtDXAs9cFoq7SXQ9h9vmfeSwCAGC5bvxfOmeQv4GMYmGYdqoYLaFEIa-BWrnttTyvtchAG5SgvxPGBavchUbRVS32KgAmI2fL9UnRleK4DdxyiNjf2fHXufoOkVZ9Ka1Jo33hLe3XLFbQNu9ljvxge3Kff95oj9uxRETynI2pKM6Bexa_iGFpZgynw";

/// Private key that is never published; tokens signed with it are forgeries.
pub const UNTRUSTED_KEY_PEM: &str = include_str!("testdata/untrusted_key.pem");

pub const RSA_EXPONENT: &str = "AQAB";

/// Coordinates of a P-256 public key.
pub const EC_X: &str = "Pbbm4b2sH9uOxtRxetUIX2RwXYNRd3T8Ma6PeLM-1cE";
pub const EC_Y: &str = "27U_qXAdUpsrlUYmEIqsqFEtIQxML8RVEG6gxyCn01w";

/// Fixed "now" used by tests that pass an explicit clock.
pub const NOW: i64 = 1_750_000_000;

pub fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "kid": kid,
        "n": n,
        "e": RSA_EXPONENT,
    })
}

pub fn ec_jwk(kid: &str) -> Value {
    json!({
        "kty": "EC",
        "use": "sig",
        "kid": kid,
        "crv": "P-256",
        "x": EC_X,
        "y": EC_Y,
    })
}

pub fn jwks_document(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Start a mock JWKS endpoint publishing the trusted signing key.
pub async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(vec![rsa_jwk(KID, SIGNING_KEY_N)])),
        )
        .mount(&server)
        .await;
    server
}

pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// Graph-style payload with the expected audience and issuer.
pub fn graph_claims(exp: i64) -> Value {
    json!({
        "aud": AUDIENCE,
        "iss": ISSUER,
        "upn": "alice@example.com",
        "name": "Alice",
        "tid": TENANT_ID,
        "oid": "8f2a1c7e-0000-4000-8000-000000000001",
        "roles": ["admin"],
        "exp": exp,
    })
}

/// Sign `claims` with RS256.
pub fn sign(claims: &Value, kid: Option<&str>, private_pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Sign `claims` with the trusted key.
pub fn signed_token(claims: &Value) -> String {
    sign(claims, Some(KID), SIGNING_KEY_PEM)
}

/// Build a token with a well-formed header and a garbage signature.
pub fn unsigned_token(claims: &Value) -> String {
    token_with_raw_payload(&URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes()))
}

/// Build a token with a well-formed header and the payload segment as given.
pub fn token_with_raw_payload(payload: &str) -> String {
    let header = json!({"alg": "RS256", "typ": "JWT", "kid": KID});
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
    format!("{header_b64}.{payload}.fake_signature")
}

/// In-memory JSON log sink.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on the current thread into this sink until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Events recorded for `target`, in emission order.
    pub fn events(&self, target: &str) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|event| event["target"] == target)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
