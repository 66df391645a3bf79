//! Servicio de autenticación
//!
//! Alta y login de cuentas con bcrypt, emisión de JWT y resolución de la
//! identidad de cada request.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::user::{Identity, User, UserRole};
use crate::repositories::user_repository::IdentityStore;
use crate::repositories::with_storage_timeout;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::jwt::JwtService;

/// Datos de alta ya validados por el DTO
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Token emitido junto al usuario
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    jwt: JwtService,
    timeout: Duration,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(identities: Arc<dyn IdentityStore>, jwt: JwtService, timeout: Duration) -> Self {
        Self {
            identities,
            jwt,
            timeout,
            hash_cost: DEFAULT_COST,
        }
    }

    /// Coste de bcrypt reducido para tests
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Alta pública: solo roles customer y mechanic
    pub async fn signup(&self, account: NewAccount) -> AppResult<AuthSession> {
        if account.role == UserRole::Admin {
            return Err(AppError::Validation(
                "role must be one of: customer, mechanic".to_string(),
            ));
        }

        let password_hash = hash(&account.password, self.hash_cost)
            .map_err(|e| AppError::Hash(format!("Error hashing password: {}", e)))?;

        let user = User {
            id: Uuid::new_v4(),
            name: account.name.trim().to_string(),
            email: account.email.trim().to_lowercase(),
            password_hash,
            role: account.role,
            phone: account.phone,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        };

        with_storage_timeout(self.timeout, "create user", self.identities.create(&user)).await?;
        info!("👤 Usuario {} registrado como {}", user.id, user.role.as_str());

        self.session_for(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let invalid = || AppError::Unauthenticated("Invalid email or password".to_string());

        let mut user = with_storage_timeout(
            self.timeout,
            "find user",
            self.identities.find_by_email(email.trim()),
        )
        .await?
        .ok_or_else(invalid)?;

        let matches = verify(password, &user.password_hash)
            .map_err(|e| AppError::Hash(format!("Error verifying password: {}", e)))?;
        if !matches {
            warn!("🔒 Login fallido para {}", user.id);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::Unauthenticated("Account is deactivated".to_string()));
        }

        let now = Utc::now();
        with_storage_timeout(
            self.timeout,
            "record login",
            self.identities.record_login(user.id, now),
        )
        .await?;
        user.last_login = Some(now);

        info!("🔑 Login de {} ({})", user.id, user.role.as_str());
        self.session_for(user)
    }

    /// Resuelve un bearer token a una cuenta activa
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self.jwt.verify_token(token)?;
        let identity = claims.identity()?;

        let user = with_storage_timeout(
            self.timeout,
            "find user",
            self.identities.find_by_id(identity.user_id),
        )
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User no longer exists".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthenticated("Account is deactivated".to_string()));
        }
        Ok(user)
    }

    pub async fn current_user(&self, identity: &Identity) -> AppResult<User> {
        with_storage_timeout(
            self.timeout,
            "find user",
            self.identities.find_by_id(identity.user_id),
        )
        .await?
        .ok_or_else(|| not_found_error("User", &identity.user_id.to_string()))
    }

    fn session_for(&self, user: User) -> AppResult<AuthSession> {
        let token = self.jwt.generate_token(&user.identity())?;
        Ok(AuthSession {
            token,
            expires_in: self.jwt.expires_in_seconds(),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::InMemoryIdentityStore;
    use crate::utils::jwt::JwtConfig;

    fn service() -> AuthService {
        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            expiration: chrono::Duration::hours(1),
        });
        AuthService::new(
            Arc::new(InMemoryIdentityStore::new()),
            jwt,
            Duration::from_secs(1),
        )
        .with_hash_cost(4)
    }

    fn account(email: &str, role: UserRole) -> NewAccount {
        NewAccount {
            name: "Ravi Kumar".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            phone: None,
            role,
        }
    }

    #[tokio::test]
    async fn test_signup_login_and_authenticate() {
        let auth = service();
        let session = auth
            .signup(account("Ravi@Example.com", UserRole::Mechanic))
            .await
            .unwrap();
        assert_eq!(session.user.email, "ravi@example.com");

        let login = auth.login("ravi@example.com", "secret123").await.unwrap();
        let user = auth.authenticate(&login.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
        assert_eq!(user.role, UserRole::Mechanic);
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_signup_rejects_admin_and_duplicates() {
        let auth = service();
        assert!(matches!(
            auth.signup(account("boss@example.com", UserRole::Admin)).await,
            Err(AppError::Validation(_))
        ));

        auth.signup(account("dup@example.com", UserRole::Customer))
            .await
            .unwrap();
        assert!(matches!(
            auth.signup(account("dup@example.com", UserRole::Customer)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let auth = service();
        auth.signup(account("user@example.com", UserRole::Customer))
            .await
            .unwrap();
        assert!(matches!(
            auth.login("user@example.com", "wrong-pass").await,
            Err(AppError::Unauthenticated(_))
        ));
    }
}
