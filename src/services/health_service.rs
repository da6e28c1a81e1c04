use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` while the cycle runner answers, `degraded` otherwise.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.scheduler().status().await {
        Ok(status) => HealthResponse::ok(status.running),
        Err(err) => {
            warn!(error = %err, "trivia scheduler did not answer the health probe");
            HealthResponse::degraded()
        }
    }
}
