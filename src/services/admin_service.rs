//! Operator commands: loop control and persisted settings changes.
//!
//! Every settings mutation is persisted first; the cycle runner only hears about
//! values that made it to disk.

use std::time::Duration;

use tracing::info;

use crate::{
    config::TriviaSettings,
    dto::{
        admin::{
            ActionResponse, AmountRequest, CategoryRequest, ConfigResponse, DelayRequest,
            DifficultyRequest, EncodeRequest, FetchBatchRequest, PrefixRequest,
            QuestionTypeRequest, StatusResponse,
        },
        validation::normalize_filter,
    },
    error::ServiceError,
    state::{SharedState, audience::Audience},
};

/// How a persisted settings change reaches the running loop.
#[derive(Debug, Clone, Copy)]
enum Apply {
    /// Restart from an empty queue, refilling right away.
    RestartWithFetch,
    /// Restart from an empty queue without an upfront refill.
    Restart,
    /// Keep the round in flight.
    InPlace,
}

/// Enable trivia and start the loop if it is stopped.
pub fn enable(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.scheduler().enable()?;
    info!("trivia enabled by operator");
    Ok(ActionResponse::new("Trivia enabled."))
}

/// Disable trivia and stop the loop.
pub fn disable(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.scheduler().disable()?;
    info!("trivia disabled by operator");
    Ok(ActionResponse::new("Trivia disabled."))
}

/// Re-read the settings file and restart from a fresh queue.
pub async fn reload(state: &SharedState) -> Result<ConfigResponse, ServiceError> {
    let settings = state.settings().reload().await;
    let response = ConfigResponse::from(&settings);
    state.scheduler().reload(settings, true)?;
    info!(path = %state.settings().path().display(), "trivia settings reloaded");
    Ok(response)
}

/// Abandon the current round and ask the next question now.
pub async fn trigger_now(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    state.scheduler().trigger_now().await.map_err(|err| match err {
        ServiceError::InvalidState(_) => ServiceError::InvalidState(
            "trivia is disabled; enable it before triggering a round".into(),
        ),
        other => other,
    })?;
    Ok(ActionResponse::new("Triggered next trivia round."))
}

/// Report the loop state, queue size and audience.
pub async fn status(state: &SharedState) -> Result<StatusResponse, ServiceError> {
    let status = state.scheduler().status().await?;
    Ok(StatusResponse::new(
        status,
        state.fetch_gate().is_claimed(),
        state.audience().count(),
    ))
}

/// Current settings.
pub async fn config(state: &SharedState) -> ConfigResponse {
    ConfigResponse::from(&state.settings().snapshot().await)
}

/// Set the number of questions requested per refill.
pub async fn set_amount(
    state: &SharedState,
    payload: AmountRequest,
) -> Result<ConfigResponse, ServiceError> {
    persist_and_apply(state, Apply::RestartWithFetch, |settings| {
        settings.amount = payload.amount;
    })
    .await
}

/// Set the category filter.
pub async fn set_category(
    state: &SharedState,
    payload: CategoryRequest,
) -> Result<ConfigResponse, ServiceError> {
    let category = normalize_filter(&payload.category);
    persist_and_apply(state, Apply::RestartWithFetch, move |settings| {
        settings.category = category;
    })
    .await
}

/// Set the difficulty filter.
pub async fn set_difficulty(
    state: &SharedState,
    payload: DifficultyRequest,
) -> Result<ConfigResponse, ServiceError> {
    let difficulty = normalize_filter(&payload.difficulty).to_ascii_lowercase();
    persist_and_apply(state, Apply::RestartWithFetch, move |settings| {
        settings.difficulty = difficulty;
    })
    .await
}

/// Set the question type filter.
pub async fn set_type(
    state: &SharedState,
    payload: QuestionTypeRequest,
) -> Result<ConfigResponse, ServiceError> {
    let question_type = normalize_filter(&payload.question_type).to_ascii_lowercase();
    persist_and_apply(state, Apply::RestartWithFetch, move |settings| {
        settings.question_type = question_type;
    })
    .await
}

/// Set the text encoding requested from the source.
pub async fn set_encode(
    state: &SharedState,
    payload: EncodeRequest,
) -> Result<ConfigResponse, ServiceError> {
    let encode = payload.encode.trim().to_string();
    if encode.is_empty() {
        return Err(ServiceError::InvalidInput("encode must not be blank".into()));
    }
    persist_and_apply(state, Apply::RestartWithFetch, move |settings| {
        settings.encode = encode;
    })
    .await
}

/// Set the answer and between-round delays.
pub async fn set_delay(
    state: &SharedState,
    payload: DelayRequest,
) -> Result<ConfigResponse, ServiceError> {
    if payload.answer_seconds < 1 {
        return Err(ServiceError::InvalidInput(
            "answer_seconds must be at least 1".into(),
        ));
    }
    persist_and_apply(state, Apply::Restart, |settings| {
        settings.answer_delay = Duration::from_secs(payload.answer_seconds);
        settings.between_delay = Duration::from_secs(payload.between_seconds);
    })
    .await
}

/// Set the fetch batch size without interrupting the loop.
pub async fn set_fetch_batch(
    state: &SharedState,
    payload: FetchBatchRequest,
) -> Result<ConfigResponse, ServiceError> {
    persist_and_apply(state, Apply::InPlace, |settings| {
        settings.fetch_batch_size = payload.size;
    })
    .await
}

/// Set the broadcast prefix without interrupting the loop.
pub async fn set_prefix(
    state: &SharedState,
    payload: PrefixRequest,
) -> Result<ConfigResponse, ServiceError> {
    persist_and_apply(state, Apply::InPlace, move |settings| {
        settings.chat_prefix = payload.prefix;
    })
    .await
}

async fn persist_and_apply<F>(
    state: &SharedState,
    apply: Apply,
    change: F,
) -> Result<ConfigResponse, ServiceError>
where
    F: FnOnce(&mut TriviaSettings),
{
    let settings = state.settings().update(change).await?;
    let response = ConfigResponse::from(&settings);

    match apply {
        Apply::RestartWithFetch => state.scheduler().restart(settings, true)?,
        Apply::Restart => state.scheduler().restart(settings, false)?,
        Apply::InPlace => state.scheduler().update_settings(settings)?,
    }
    info!(?apply, "applied trivia settings change");
    Ok(response)
}
