use crate::dto::auth_dto::{AuthResponse, LoginRequest, SignupRequest};
use crate::dto::ApiResponse;
use crate::models::user::{Identity, UserResponse, UserRole};
use crate::services::auth_service::{AuthService, NewAccount};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{field_error, validate_phone};

pub struct AuthController {
    auth: AuthService,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
        }
    }

    pub async fn signup(
        &self,
        request: SignupRequest,
    ) -> Result<ApiResponse<AuthResponse>, AppError> {
        let phone = request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            validate_phone(phone).map_err(|e| field_error("phone", e))?;
        }

        let role = match request.role.as_deref() {
            None | Some("") => UserRole::Customer,
            Some(role) => role.parse()?,
        };

        let session = self
            .auth
            .signup(NewAccount {
                name: request.name.trim().to_string(),
                email: request.email,
                password: request.password,
                phone,
                role,
            })
            .await?;

        Ok(ApiResponse::success_with_message(
            AuthResponse::from(session),
            "User registered successfully",
        ))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<ApiResponse<AuthResponse>, AppError> {
        let session = self.auth.login(&request.email, &request.password).await?;
        Ok(ApiResponse::success_with_message(
            AuthResponse::from(session),
            "Login successful",
        ))
    }

    pub async fn me(&self, identity: &Identity) -> Result<ApiResponse<UserResponse>, AppError> {
        let user = self.auth.current_user(identity).await?;
        Ok(ApiResponse::success(UserResponse::from(user)))
    }
}
