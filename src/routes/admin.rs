use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::admin::{
        ActionResponse, AmountRequest, CategoryRequest, ConfigResponse, DelayRequest,
        DifficultyRequest, EncodeRequest, FetchBatchRequest, PrefixRequest, QuestionTypeRequest,
        StatusResponse,
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Operator endpoints controlling the trivia loop and its settings.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/trivia/enable", post(enable))
        .route("/admin/trivia/disable", post(disable))
        .route("/admin/trivia/reload", post(reload))
        .route("/admin/trivia/now", post(trigger_now))
        .route("/admin/trivia/status", get(status))
        .route("/admin/trivia/config", get(config))
        .route("/admin/trivia/amount", put(set_amount))
        .route("/admin/trivia/category", put(set_category))
        .route("/admin/trivia/difficulty", put(set_difficulty))
        .route("/admin/trivia/type", put(set_type))
        .route("/admin/trivia/encode", put(set_encode))
        .route("/admin/trivia/delay", put(set_delay))
        .route("/admin/trivia/fetch-batch", put(set_fetch_batch))
        .route("/admin/trivia/prefix", put(set_prefix))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Enable trivia and start the loop if it is stopped.
#[utoipa::path(
    post,
    path = "/admin/trivia/enable",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Trivia enabled", body = ActionResponse))
)]
pub async fn enable(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::enable(&state)?))
}

/// Disable trivia; the pending answer of the current round is never revealed.
#[utoipa::path(
    post,
    path = "/admin/trivia/disable",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Trivia disabled", body = ActionResponse))
)]
pub async fn disable(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::disable(&state)?))
}

/// Re-read the settings file and restart with an empty queue.
#[utoipa::path(
    post,
    path = "/admin/trivia/reload",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Settings reloaded", body = ConfigResponse))
)]
pub async fn reload(State(state): State<SharedState>) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::reload(&state).await?))
}

/// Skip the rest of the current round and ask a question now.
#[utoipa::path(
    post,
    path = "/admin/trivia/now",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "Round triggered", body = ActionResponse),
        (status = 409, description = "Trivia is disabled")
    )
)]
pub async fn trigger_now(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::trigger_now(&state).await?))
}

#[utoipa::path(
    get,
    path = "/admin/trivia/status",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Loop status", body = StatusResponse))
)]
pub async fn status(State(state): State<SharedState>) -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(admin_service::status(&state).await?))
}

#[utoipa::path(
    get,
    path = "/admin/trivia/config",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Current settings", body = ConfigResponse))
)]
pub async fn config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(admin_service::config(&state).await)
}

#[utoipa::path(
    put,
    path = "/admin/trivia/amount",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = AmountRequest,
    responses((status = 200, description = "Amount updated; loop restarted", body = ConfigResponse))
)]
pub async fn set_amount(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AmountRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_amount(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/category",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = CategoryRequest,
    responses((status = 200, description = "Category updated; loop restarted", body = ConfigResponse))
)]
pub async fn set_category(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CategoryRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_category(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/difficulty",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = DifficultyRequest,
    responses(
        (status = 200, description = "Difficulty updated; loop restarted", body = ConfigResponse),
        (status = 400, description = "Unknown difficulty")
    )
)]
pub async fn set_difficulty(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DifficultyRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_difficulty(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/type",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = QuestionTypeRequest,
    responses(
        (status = 200, description = "Question type updated; loop restarted", body = ConfigResponse),
        (status = 400, description = "Unknown question type")
    )
)]
pub async fn set_type(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<QuestionTypeRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_type(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/encode",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = EncodeRequest,
    responses((status = 200, description = "Encoding updated; loop restarted", body = ConfigResponse))
)]
pub async fn set_encode(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<EncodeRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_encode(&state, payload).await?))
}

/// Change both delays; the loop restarts without an upfront refill.
#[utoipa::path(
    put,
    path = "/admin/trivia/delay",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = DelayRequest,
    responses((status = 200, description = "Delays updated; loop restarted", body = ConfigResponse))
)]
pub async fn set_delay(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DelayRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_delay(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/fetch-batch",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = FetchBatchRequest,
    responses((status = 200, description = "Fetch batch size updated", body = ConfigResponse))
)]
pub async fn set_fetch_batch(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<FetchBatchRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_fetch_batch(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/trivia/prefix",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = PrefixRequest,
    responses((status = 200, description = "Prefix updated", body = ConfigResponse))
)]
pub async fn set_prefix(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PrefixRequest>>,
) -> Result<Json<ConfigResponse>, AppError> {
    Ok(Json(admin_service::set_prefix(&state, payload).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = {
        let guard = state.admin_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin SSE stream not initialised yet".into(),
        )),
    }
}
