use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::booking_controller::BookingController;
use crate::dto::booking_dto::{
    AddNoteRequest, BookingListResponse, BookingResponse, CancelBookingRequest,
    CreateBookingRequest, ListBookingsQuery, PendingBookingsQuery, PendingBookingsResponse,
    StatsQuery, UpdateBookingRequest, UpdateStatusRequest,
};
use crate::dto::{parse_optional_body, ApiResponse, ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::middleware::AuthenticatedUser;
use crate::services::booking_stats_service::StatsReport;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas de bookings; todas requieren autenticación
pub fn create_booking_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/pending", get(pending_bookings))
        .route("/admin/stats", get(booking_stats))
        .route("/:id", get(get_booking).put(update_booking))
        .route("/:id/status", put(update_status))
        .route("/:id/cancel", put(cancel_booking))
        .route("/:id/notes", post(add_note))
}

type BookingResult = Result<Json<ApiResponse<BookingResponse>>, AppError>;

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponse>>), AppError> {
    let controller = BookingController::new(&state);
    let response = controller.create(&user.identity(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<ListBookingsQuery>,
) -> Result<Json<ApiResponse<BookingListResponse>>, AppError> {
    let controller = BookingController::new(&state);
    Ok(Json(controller.list(&user.identity(), query).await?))
}

async fn pending_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<PendingBookingsQuery>,
) -> Result<Json<ApiResponse<PendingBookingsResponse>>, AppError> {
    let controller = BookingController::new(&state);
    Ok(Json(controller.pending(&user.identity(), query).await?))
}

async fn booking_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<StatsQuery>,
) -> Result<Json<ApiResponse<StatsReport>>, AppError> {
    let controller = BookingController::new(&state);
    Ok(Json(controller.stats(&user.identity(), query).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> BookingResult {
    let controller = BookingController::new(&state);
    Ok(Json(controller.get(&user.identity(), id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateBookingRequest>,
) -> BookingResult {
    let controller = BookingController::new(&state);
    Ok(Json(controller.update(&user.identity(), id, request).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> BookingResult {
    let controller = BookingController::new(&state);
    Ok(Json(
        controller.update_status(&user.identity(), id, request).await?,
    ))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    body: Bytes,
) -> BookingResult {
    let request: CancelBookingRequest = parse_optional_body(&body)?;
    let controller = BookingController::new(&state);
    Ok(Json(controller.cancel(&user.identity(), id, request).await?))
}

async fn add_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(request): ValidatedJson<AddNoteRequest>,
) -> BookingResult {
    let controller = BookingController::new(&state);
    Ok(Json(
        controller.add_note(&user.identity(), id, request).await?,
    ))
}
