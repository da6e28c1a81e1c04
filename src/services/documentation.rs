use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::admin::enable,
        crate::routes::admin::disable,
        crate::routes::admin::reload,
        crate::routes::admin::trigger_now,
        crate::routes::admin::status,
        crate::routes::admin::config,
        crate::routes::admin::set_amount,
        crate::routes::admin::set_category,
        crate::routes::admin::set_difficulty,
        crate::routes::admin::set_type,
        crate::routes::admin::set_encode,
        crate::routes::admin::set_delay,
        crate::routes::admin::set_fetch_batch,
        crate::routes::admin::set_prefix,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::AdminHandshake,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::StatusResponse,
            crate::dto::admin::ConfigResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "admin", description = "Trivia loop control, gated by the admin token"),
    )
)]
pub struct ApiDoc;
