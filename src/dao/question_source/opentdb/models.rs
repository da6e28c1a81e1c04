use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::dao::question_source::RawRecord;

/// Top-level document returned by `api.php`.
///
/// Results stay untyped so one malformed record cannot reject the records before it.
#[derive(Debug, Deserialize)]
pub struct OpenTdbResponse {
    pub response_code: Option<i64>,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl OpenTdbResponse {
    /// Convert results in order, stopping at the first record that does not fit [`OpenTdbRecord`].
    pub fn into_records(self) -> Vec<RawRecord> {
        let mut records = Vec::with_capacity(self.results.len());
        for (index, value) in self.results.into_iter().enumerate() {
            match serde_json::from_value::<OpenTdbRecord>(value) {
                Ok(record) => records.push(record.into()),
                Err(err) => {
                    warn!(
                        index,
                        kept = records.len(),
                        error = %err,
                        "malformed Open Trivia DB record; dropping the rest of the batch"
                    );
                    break;
                }
            }
        }
        records
    }
}

/// A single question as serialised by Open Trivia DB.
#[derive(Debug, Deserialize)]
pub struct OpenTdbRecord {
    pub question: Option<String>,
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

impl From<OpenTdbRecord> for RawRecord {
    fn from(record: OpenTdbRecord) -> Self {
        Self {
            question: record.question,
            correct_answer: record.correct_answer,
            incorrect_answers: record.incorrect_answers,
        }
    }
}
