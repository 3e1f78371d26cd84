//! pickers.rs
//!
//! HTTP-обертка над `SelectionController` для браузерного UI.
//! Каждый открытый picker живет в своей задаче; обработчики только
//! пересылают ему команды и возвращают типизированные исходы и снимок состояния.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::AuthSession,
    models::{SelectionMode, TicketCategory},
    picker::{PickerAction, PickerOutcome, PickerSnapshot, SelectionController},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pickers", post(open_picker))
        .route("/pickers/{id}", get(get_picker).delete(close_picker))
        .route("/pickers/{id}/mode", post(choose_mode))
        .route("/pickers/{id}/quantity", post(set_quantity))
        .route("/pickers/{id}/seats/{seat_id}/toggle", post(toggle_seat))
        .route("/pickers/{id}/category", post(change_category))
        .route("/pickers/{id}/checkout", post(checkout))
        .route("/pickers/{id}/retry", post(retry_catalog))
        .route("/pickers/{id}/reset", post(reset_picker))
        .route("/pickers/{id}/notices/scattered", delete(dismiss_scattered_notice))
}

// --- Request/Response структуры ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenPickerRequest {
    #[validate(range(min = 1))]
    pub event_id: i64,
    #[validate(range(min = 1))]
    pub area_id: i64,
    #[validate(nested)]
    pub ticket_category: TicketCategory,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPickerResponse {
    pub picker_id: Uuid,
    pub outcomes: Vec<PickerOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: SelectionMode,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub outcomes: Vec<PickerOutcome>,
    pub snapshot: PickerSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    message: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn to_api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { success: false, message: message.to_string() }))
}

// --- Вспомогательные функции ---

async fn run_action(state: &AppState, id: Uuid, action: PickerAction) -> ApiResult<Json<CommandResponse>> {
    let handle = state
        .pickers
        .get(&id)
        .await
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Picker not found"))?;

    let outcomes = handle
        .dispatch(action)
        .await
        .map_err(|_| to_api_error(StatusCode::GONE, "Picker is closed"))?;
    let snapshot = handle
        .snapshot()
        .await
        .map_err(|_| to_api_error(StatusCode::GONE, "Picker is closed"))?;

    Ok(Json(CommandResponse { outcomes, snapshot }))
}

fn validate(payload: &impl Validate) -> ApiResult<()> {
    payload.validate().map_err(|e| {
        tracing::debug!("Rejected picker request: {}", e);
        to_api_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string())
    })
}

// --- HTTP Handlers ---

/// POST /api/pickers
async fn open_picker(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Json(req): Json<OpenPickerRequest>,
) -> ApiResult<impl IntoResponse> {
    validate(&req)?;

    let source = Arc::new(state.seat_client.with_auth(auth));
    let controller = SelectionController::new(
        source,
        state.clock.clone(),
        req.event_id,
        req.area_id,
        req.ticket_category,
        state.config.picker.clone(),
    );
    let (handle, outcomes) = controller.spawn();
    let picker_id = state.pickers.insert(handle).await;

    tracing::info!(%picker_id, event_id = req.event_id, area_id = req.area_id, "Picker opened");
    Ok((StatusCode::CREATED, Json(OpenPickerResponse { picker_id, outcomes })))
}

/// GET /api/pickers/{id}
async fn get_picker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PickerSnapshot>> {
    let handle = state
        .pickers
        .get(&id)
        .await
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Picker not found"))?;
    let snapshot = handle
        .snapshot()
        .await
        .map_err(|_| to_api_error(StatusCode::GONE, "Picker is closed"))?;
    Ok(Json(snapshot))
}

/// DELETE /api/pickers/{id}
async fn close_picker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.pickers.close(&id).await {
        tracing::info!(picker_id = %id, "Picker closed by client");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(to_api_error(StatusCode::NOT_FOUND, "Picker not found"))
    }
}

/// POST /api/pickers/{id}/mode
async fn choose_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ModeRequest>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::ChooseMode(req.mode)).await
}

/// POST /api/pickers/{id}/quantity
async fn set_quantity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuantityRequest>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::SetQuantity(req.count)).await
}

/// POST /api/pickers/{id}/seats/{seat_id}/toggle
async fn toggle_seat(
    State(state): State<Arc<AppState>>,
    Path((id, seat_id)): Path<(Uuid, i64)>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::ToggleSeat(seat_id)).await
}

/// POST /api/pickers/{id}/category
async fn change_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(category): Json<TicketCategory>,
) -> ApiResult<Json<CommandResponse>> {
    validate(&category)?;
    run_action(&state, id, PickerAction::ChangeCategory(category)).await
}

/// POST /api/pickers/{id}/checkout
///
/// Запускает сверку; результат (оплата или конфликт) приходит в уведомлениях снимка.
async fn checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::Checkout).await
}

/// POST /api/pickers/{id}/retry
async fn retry_catalog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::RetryCatalog).await
}

/// POST /api/pickers/{id}/reset
async fn reset_picker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::Reset).await
}

/// DELETE /api/pickers/{id}/notices/scattered
async fn dismiss_scattered_notice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CommandResponse>> {
    run_action(&state, id, PickerAction::DismissScatteredNotice).await
}
