pub mod error;
pub mod opentdb;

use futures::future::BoxFuture;

pub use self::error::{SourceError, SourceResult};

/// Status code reported by the source when `records` can be used.
pub const STATUS_SUCCESS: i64 = 0;

/// Filters forwarded as-is to the question source. Empty means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilters {
    pub category: String,
    pub difficulty: String,
    pub question_type: String,
    pub encode: String,
}

/// One record as returned by the source, possibly encoded and incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub question: Option<String>,
    pub correct_answer: Option<String>,
    pub incorrect_answers: Vec<String>,
}

/// Outcome of a successful round trip to the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    /// Source-level status; only [`STATUS_SUCCESS`] makes `records` usable.
    pub status_code: i64,
    pub records: Vec<RawRecord>,
}

impl SourceBatch {
    /// Whether the source reported success.
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS
    }
}

/// Abstraction over the upstream provider of trivia questions.
pub trait QuestionSource: Send + Sync {
    fn fetch(
        &self,
        amount: u32,
        filters: QuestionFilters,
    ) -> BoxFuture<'static, SourceResult<SourceBatch>>;
}
