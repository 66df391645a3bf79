//! Utilidades JWT
//!
//! Este módulo contiene el servicio que emite y verifica los access tokens
//! de la API. Los claims solo llevan el usuario y su rol.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::environment::EnvironmentConfig,
    models::user::{Identity, UserRole},
    utils::errors::AppError,
};

/// Claims del JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,  // user_id
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl JwtClaims {
    pub fn identity(&self) -> Result<Identity, AppError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Jwt("Invalid subject in token".to_string()))?;
        Ok(Identity::new(user_id, self.role))
    }
}

/// Configuración de JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: Duration,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration: Duration::seconds(config.jwt_expiration as i64),
        }
    }
}

/// Servicio JWT (HS256)
#[derive(Clone)]
pub struct JwtService {
    expiration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            expiration: config.expiration,
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
        }
    }

    /// Genera un access token para la identidad dada
    pub fn generate_token(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: identity.user_id.to_string(),
            role: identity.role,
            exp: (now + self.expiration).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Jwt(format!("Error generating token: {}", e)))
    }

    /// Valida y decodifica un token
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.expiration.num_seconds()
    }
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthenticated("Authorization header must start with 'Bearer '".to_string())
    })?;

    if token.trim().is_empty() {
        return Err(AppError::Unauthenticated("Access token is required".to_string()));
    }

    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, seconds: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: secret.to_string(),
            expiration: Duration::seconds(seconds),
        })
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = service("test-secret", 3600);
        let identity = Identity::mechanic(Uuid::new_v4());

        let token = jwt.generate_token(&identity).unwrap();
        let claims = jwt.verify_token(&token).unwrap();

        assert_eq!(claims.identity().unwrap(), identity);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = service("secret-a", 3600)
            .generate_token(&Identity::admin(Uuid::new_v4()))
            .unwrap();
        let err = service("secret-b", 3600).verify_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = service("test-secret", -3600);
        let token = jwt.generate_token(&Identity::customer(Uuid::new_v4())).unwrap();
        assert!(jwt.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }
}
