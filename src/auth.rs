use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

/// Ok(false) on a wrong password, Err only when the stored hash is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Failed to verify password: {}", e)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    exp: i64,
}

pub fn issue_token(
    user_id: i64,
    secret: &[u8],
    valid_for: time::Duration,
) -> anyhow::Result<String> {
    let exp = (time::OffsetDateTime::now_utc() + valid_for).unix_timestamp();
    let claims = Claims { sub: user_id, exp };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &[u8]) -> anyhow::Result<i64> {
    let c = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )?
    .claims;
    Ok(c.sub)
}

/// Extractor for routes that require a logged-in user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Authentication required"))?;
        let user_id = verify_token(bearer.token(), state.config.jwt_secret.as_bytes())
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;
        Ok(AuthUser(user_id))
    }
}

/// Extractor for routes that work anonymously but personalize when a valid
/// token is present. Bad or missing tokens degrade to `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<i64>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(TypedHeader(Authorization(bearer))) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
        else {
            return Ok(MaybeAuthUser(None));
        };
        let user_id = verify_token(bearer.token(), state.config.jwt_secret.as_bytes()).ok();
        Ok(MaybeAuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash).unwrap());
        assert!(!verify_password("hunter43", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn token_roundtrip() {
        let token = issue_token(42, b"secret", time::Duration::days(7)).unwrap();
        assert_eq!(verify_token(&token, b"secret").unwrap(), 42);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = issue_token(42, b"secret", time::Duration::days(7)).unwrap();
        assert!(verify_token(&token, b"other-secret").is_err());
    }

    #[test]
    fn token_rejects_expired() {
        let token = issue_token(42, b"secret", time::Duration::minutes(-5)).unwrap();
        assert!(verify_token(&token, b"secret").is_err());
    }
}
