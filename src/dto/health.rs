use serde::Serialize;
use utoipa::ToSchema;

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while the trivia loop answers commands, `degraded` otherwise.
    pub status: String,
    /// Whether a round chain is currently scheduled.
    pub running: bool,
}

impl HealthResponse {
    /// The loop answered; `running` mirrors its state.
    pub fn ok(running: bool) -> Self {
        Self {
            status: "ok".to_string(),
            running,
        }
    }

    /// The loop did not answer.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            running: false,
        }
    }
}
