use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::dto::auth_dto::{AuthResponse, LoginRequest, SignupRequest};
use crate::dto::{ApiResponse, ValidatedJson};
use crate::middleware::{auth_middleware, AuthenticatedUser};
use crate::models::user::UserResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas de autenticación; solo `/me` exige token
pub fn create_auth_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
}

async fn signup(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let controller = AuthController::new(&state);
    let response = controller.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.login(request).await?))
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.me(&user.identity()).await?))
}
