//! HTTP surface tests
//!
//! Drives the full router against the in-memory store: public health,
//! bearer token verification and role checks surfacing as status codes.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::Site;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use shared::{Identity, Role};
use stockflow::config::{Config, DatabaseConfig, JwtConfig, ServerConfig};
use stockflow::middleware::Claims;
use stockflow::{create_app, AppState};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        replenishment: Default::default(),
        logging: Default::default(),
    }
}

fn app(site: &Site) -> Router {
    create_app(AppState::new(site.store(), test_config()))
}

fn token_for(identity: &Identity) -> String {
    let claims = Claims {
        sub: identity.user_id,
        tenant_id: identity.tenant_id,
        role: identity.role,
        warehouse_id: identity.warehouse_id,
        exp: chrono::Utc::now().timestamp() + 600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn health_is_public() {
    let site = Site::new().await;
    let response = app(&site)
        .oneshot(get("/api/v1/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let site = Site::new().await;
    let response = app(&site)
        .oneshot(get("/api/v1/stock", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_unauthorized() {
    let site = Site::new().await;
    let claims = Claims {
        sub: site.admin.user_id,
        tenant_id: site.tenant_id,
        role: Role::CompanyAdmin,
        warehouse_id: None,
        exp: chrono::Utc::now().timestamp() + 600,
    };
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let response = app(&site)
        .oneshot(get("/api/v1/stock", Some(&forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_lists_stock() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 10).await;
    let token = token_for(&site.admin);

    let response = app(&site)
        .oneshot(get("/api/v1/stock", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn picker_cannot_read_the_ledger() {
    let site = Site::new().await;
    let picker = site.member(Role::Picker).await;
    let token = token_for(&picker);

    let response = app(&site)
        .oneshot(get("/api/v1/stock", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&site)
        .oneshot(get("/api/v1/pick-lists", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let site = Site::new().await;
    let token = token_for(&site.admin);
    let uri = format!("/api/v1/orders/{}", uuid::Uuid::new_v4());

    let response = app(&site)
        .oneshot(get(&uri, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
