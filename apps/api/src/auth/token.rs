//! JWT issue/verify and the `AuthUser` extractor guarding dashboard routes.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue(user: &UserRow, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
}

pub fn verify(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Authenticated interviewer, extracted from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = verify(token, &state.config.jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "lead@example.com".to_string(),
            password_hash: "unused".to_string(),
            display_name: "Lead Interviewer".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let user = user();
        let token = issue(&user, "secret").unwrap();
        let claims = verify(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue(&user(), "secret").unwrap();
        assert!(matches!(
            verify(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = user();
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email,
            iat: (now - Duration::hours(48)).timestamp() as usize,
            exp: (now - Duration::hours(24)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            verify(&token, "secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            verify("not.a.jwt", "secret"),
            Err(AppError::Unauthorized)
        ));
    }
}
