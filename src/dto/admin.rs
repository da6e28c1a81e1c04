//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::TriviaSettings,
    dto::validation::{validate_difficulty, validate_not_blank, validate_question_type},
    state::scheduler::SchedulerStatus,
};

/// Number of questions requested per refill.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AmountRequest {
    #[validate(range(min = 1))]
    pub amount: u32,
}

/// Category filter; `any`, `none` or `-` clears it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CategoryRequest {
    #[validate(length(max = 32))]
    pub category: String,
}

/// Difficulty filter.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DifficultyRequest {
    #[validate(custom(function = "validate_difficulty"))]
    pub difficulty: String,
}

/// Question type filter.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuestionTypeRequest {
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_question_type"))]
    pub question_type: String,
}

/// Text encoding requested from the question source.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EncodeRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub encode: String,
}

/// Round delays, in seconds.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DelayRequest {
    #[validate(range(min = 1))]
    pub answer_seconds: u64,
    pub between_seconds: u64,
}

/// Batch size the low-water mark derives from.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FetchBatchRequest {
    #[validate(range(min = 1))]
    pub size: u32,
}

/// Text prepended to every broadcast line.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PrefixRequest {
    #[validate(length(max = 64))]
    pub prefix: String,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Snapshot of the trivia loop.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub enabled: bool,
    pub running: bool,
    pub queue_size: usize,
    pub generation: u64,
    /// Whether a refill is in flight.
    pub fetching: bool,
    /// Number of connected audience members.
    pub audience: usize,
    /// RFC 3339 time the snapshot was taken.
    pub checked_at: String,
}

impl StatusResponse {
    pub fn new(status: SchedulerStatus, fetching: bool, audience: usize) -> Self {
        Self {
            enabled: status.enabled,
            running: status.running,
            queue_size: status.queue_size,
            generation: status.generation,
            fetching,
            audience,
            checked_at: super::format_system_time(std::time::SystemTime::now()),
        }
    }
}

/// Current trivia settings as exposed to administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub amount: u32,
    pub category: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub encode: String,
    pub answer_delay_seconds: u64,
    pub between_questions_delay_seconds: u64,
    pub fetch_batch_size: u32,
    /// Queue size under which a refill is requested.
    pub low_water_mark: usize,
    pub chat_prefix: String,
    pub start_enabled: bool,
    pub api_url: String,
    pub fetch_timeout_seconds: u64,
}

impl From<&TriviaSettings> for ConfigResponse {
    fn from(settings: &TriviaSettings) -> Self {
        Self {
            amount: settings.amount,
            category: settings.category.clone(),
            difficulty: settings.difficulty.clone(),
            question_type: settings.question_type.clone(),
            encode: settings.encode.clone(),
            answer_delay_seconds: settings.answer_delay.as_secs(),
            between_questions_delay_seconds: settings.between_delay.as_secs(),
            fetch_batch_size: settings.fetch_batch_size,
            low_water_mark: settings.low_water_mark(),
            chat_prefix: settings.chat_prefix.clone(),
            start_enabled: settings.start_enabled,
            api_url: settings.api_url.clone(),
            fetch_timeout_seconds: settings.fetch_timeout.as_secs(),
        }
    }
}
