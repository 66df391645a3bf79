//! Identidades y roles
//!
//! Cuentas con su rol; el núcleo solo resuelve id -> rol y comprueba que
//! la cuenta siga activa.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::User;
use crate::utils::errors::{conflict_error, AppError, AppResult};

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Falla con `Conflict` si el email ya existe
    async fn create(&self, user: &User) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|_| AppError::Internal(format!("Unknown stored role '{}'", row.role)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, phone, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                conflict_error("User", "email", &user.email)
            }
            other => AppError::from(other),
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(conflict_error("User", "email", &user.email));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}
