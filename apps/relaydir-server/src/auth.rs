use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use relaydir_db::models::credential::ApiCredential;

const TOKEN_TTL_SECS: usize = 24 * 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin row id.
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

/// Extractor for routes that require an admin JWT.
pub struct AdminUser(pub AdminClaims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let claims = decode_admin_token(token, &state.jwt_secret)?;
        Ok(AdminUser(claims))
    }
}

/// Extractor for the public discovery route: resolves `X-API-Key` to an
/// active credential. Rate limiting happens after this, in the handler,
/// because the handler owns the response headers.
pub struct ApiCaller(pub ApiCredential);

impl FromRequestParts<AppState> for ApiCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-API-Key header".into()))?;

        let credential = state
            .credentials
            .resolve_key(key)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid API key".into()))?;

        if !credential.is_active {
            return Err(ApiError::Unauthorized("API key is disabled".into()));
        }

        Ok(ApiCaller(credential))
    }
}

pub fn create_admin_token(
    admin_id: i64,
    username: &str,
    jwt_secret: &str,
) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = AdminClaims {
        sub: admin_id.to_string(),
        username: username.to_string(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };
    let key = jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key)
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
}

pub fn decode_admin_token(token: &str, jwt_secret: &str) -> Result<AdminClaims, ApiError> {
    let key = jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = jsonwebtoken::Validation::default();
    jsonwebtoken::decode::<AdminClaims>(token, &key, &validation)
        .map(|d| d.claims)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {e}")))
}

fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_token_round_trip() {
        let token = create_admin_token(7, "ops", "test-secret-test-secret").unwrap();
        let claims = decode_admin_token(&token, "test-secret-test-secret").unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "ops");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn admin_token_rejects_wrong_secret() {
        let token = create_admin_token(7, "ops", "test-secret-test-secret").unwrap();
        assert!(decode_admin_token(&token, "another-secret-entirely").is_err());
    }

    #[test]
    fn admin_token_rejects_garbage() {
        assert!(decode_admin_token("not.a.jwt", "test-secret-test-secret").is_err());
    }
}
