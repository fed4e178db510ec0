//! Principal attachment middleware
//!
//! Authentication itself lives in an external service; this middleware only
//! verifies the bearer token it issued and attaches the resulting
//! [`Principal`] to the request, before tenant resolution runs. Routes
//! behind it require a valid token; explicitly public routes are simply not
//! behind it.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::Principal,
    utils::{AppError, AppResult, ErrorResponse},
    AppState,
};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,
    /// Principal email (optional)
    #[serde(default)]
    pub email: Option<String>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// Create a new access token
///
/// Production tokens come from the auth service; this helper exists for
/// seeds and the test suite.
pub fn create_access_token(
    principal_id: &Uuid,
    email: Option<&str>,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours);

    let claims = Claims {
        sub: principal_id.to_string(),
        email: email.map(|e| e.to_string()),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        nbf: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate and decode a bearer token into a principal
pub fn validate_token(token: &str, secret: &str) -> AppResult<Principal> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Authentication token has expired".to_string())
        }
        _ => AppError::Unauthorized("Invalid authentication token".to_string()),
    })?;

    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid principal id in token".to_string()))?;

    Ok(Principal {
        id,
        email: data.claims.email,
    })
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Require a valid bearer token and attach the principal to the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
        let token = extract_bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;
        validate_token(token, &state.config.auth.jwt_secret)?
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Extractor for Principal from request extensions
///
/// Usable as a handler parameter after `auth_middleware` has run.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("unauthorized", "Authentication required")),
            )
        })
    }
}
