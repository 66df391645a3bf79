//! Modelo de User
//!
//! Este módulo contiene el struct User, el rol de cada cuenta y la
//! identidad resuelta para cada request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Mechanic,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Mechanic => "mechanic",
            UserRole::Admin => "admin",
        }
    }

    /// Roles que pueden ver y escribir notas internas
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Mechanic | UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "mechanic" => Ok(UserRole::Mechanic),
            "admin" => Ok(UserRole::Admin),
            other => Err(AppError::Validation(format!("Invalid role '{}'", other))),
        }
    }
}

/// Identidad resuelta de quien actúa sobre un booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Identity {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: Uuid) -> Self {
        Self::new(user_id, UserRole::Customer)
    }

    pub fn mechanic(user_id: Uuid) -> Self {
        Self::new(user_id, UserRole::Mechanic)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, UserRole::Admin)
    }
}

/// User - mapea a la tabla users
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.role)
    }
}

/// Response de usuario para la API (sin password)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
