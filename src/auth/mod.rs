use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub tenant: String,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub access: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant: String, tenant_id: Uuid, user_id: Uuid, email: String, access: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            tenant,
            tenant_id,
            user_id,
            email,
            access,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hash(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT token: {}", e)))?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let cost = config::config().security.bcrypt_cost;
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hash(e.to_string()))
}

/// Constant result shape for login: any mismatch is InvalidCredentials
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}

/// URL-safe random token for account activation links
pub fn generate_activation_token() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..43)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter23", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn jwt_roundtrip() {
        let claims = Claims::new(
            "acme".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "admin@acme.test".to_string(),
            "admin".to_string(),
        );
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.tenant, "acme");
        assert_eq!(decoded.user_id, claims.user_id);
    }

    #[test]
    fn activation_tokens_are_unique() {
        let a = generate_activation_token();
        let b = generate_activation_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }
}
