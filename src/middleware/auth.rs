//! Middleware de autenticación JWT
//!
//! Este módulo maneja la extracción del bearer token y la verificación de
//! que la cuenta sigue activa.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    models::user::{Identity, User, UserRole},
    state::AppState,
    utils::{errors::AppError, jwt::extract_token_from_header},
};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub name: String,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.role)
    }
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            name: user.name,
            email: user.email,
        }
    }
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Access token is required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let user = state.auth.authenticate(token).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(user));

    Ok(next.run(request).await)
}
