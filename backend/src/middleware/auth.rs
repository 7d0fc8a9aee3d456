//! Identity middleware
//!
//! Tokens are issued by the upstream auth layer. This module only verifies
//! the signature and turns the claims into an [`Identity`]; it never logs
//! anyone in.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{Identity, Role};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Identity token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<Uuid>,
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            tenant_id: claims.tenant_id,
            user_id: claims.sub,
            role: claims.role,
            warehouse_id: claims.warehouse_id,
        }
    }
}

fn decode_identity(token: &str, secret: &str) -> Result<Identity, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims.into())
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Verifies the bearer token and stores the caller's [`Identity`] in the
/// request extensions
pub async fn identity_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let identity = decode_identity(bearer.token(), &state.config.jwt.secret)?;
    tracing::debug!(
        tenant_id = %identity.tenant_id,
        user_id = %identity.user_id,
        role = %identity.role,
        "Identity resolved"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for the caller resolved by [`identity_middleware`]
#[derive(Clone, Debug)]
pub struct CurrentIdentity(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| AppError::Unauthorized("Identity required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: Role::Picker,
            warehouse_id: None,
            exp: chrono::Utc::now().timestamp() + 3600,
        }
    }

    #[test]
    fn decodes_claims_into_identity() {
        let claims = claims();
        let identity = decode_identity(&token(&claims, "s3cret"), "s3cret").unwrap();

        assert_eq!(identity.user_id, claims.sub);
        assert_eq!(identity.tenant_id, claims.tenant_id);
        assert_eq!(identity.role, Role::Picker);
    }

    #[test]
    fn rejects_wrong_secret() {
        let err = decode_identity(&token(&claims(), "s3cret"), "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_expired_token() {
        let mut claims = claims();
        claims.exp = chrono::Utc::now().timestamp() - 3600;
        let err = decode_identity(&token(&claims, "s3cret"), "s3cret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
