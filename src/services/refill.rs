//! Single-flight refill of the question queue from the upstream source.

use std::{sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{Rng, seq::SliceRandom};
use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    dao::question_source::{QuestionFilters, QuestionSource, RawRecord},
    state::{
        audience::Audience,
        fetch_gate::{FetchGate, FetchPermit},
        question::Question,
    },
};

/// Parameters of one refill attempt.
#[derive(Debug, Clone)]
pub struct RefillRequest {
    /// Number of questions asked from the source.
    pub amount: u32,
    /// Filters forwarded untouched to the source.
    pub filters: QuestionFilters,
    /// Queue epoch the batch will be appended to.
    pub epoch: u64,
    /// Upper bound on the source call.
    pub timeout: Duration,
}

/// Questions produced by a successful refill.
///
/// Holds the single-flight permit: the gate reopens once the batch is dropped.
#[derive(Debug)]
pub struct RefillBatch {
    /// Queue epoch the batch was requested for.
    pub epoch: u64,
    /// Decoded questions in source order.
    pub questions: Vec<Question>,
    _permit: FetchPermit,
}

impl RefillBatch {
    /// Split the batch into its epoch and questions, releasing the gate.
    pub fn into_parts(self) -> (u64, Vec<Question>) {
        (self.epoch, self.questions)
    }
}

/// Issues at most one outstanding request to the question source.
#[derive(Clone)]
pub struct RefillCoordinator {
    source: Arc<dyn QuestionSource>,
    audience: Arc<dyn Audience>,
    gate: FetchGate,
}

impl RefillCoordinator {
    /// Build a coordinator sharing `gate` with the scheduler.
    pub fn new(
        source: Arc<dyn QuestionSource>,
        audience: Arc<dyn Audience>,
        gate: FetchGate,
    ) -> Self {
        Self {
            source,
            audience,
            gate,
        }
    }

    /// Start a refill in the background unless one is outstanding or nobody listens.
    ///
    /// `deliver` receives the batch on success. Failed attempts are logged and
    /// release the gate without calling `deliver`.
    pub fn request_refill<F>(&self, request: RefillRequest, deliver: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(RefillBatch) + Send + 'static,
    {
        if self.audience.is_empty() {
            debug!("skipping refill: no audience");
            return None;
        }

        let permit = self.gate.try_claim()?;
        let source = Arc::clone(&self.source);

        Some(tokio::spawn(async move {
            let RefillRequest {
                amount,
                filters,
                epoch,
                timeout: limit,
            } = request;

            info!(amount, ?filters, "fetching trivia questions");
            let records = match timeout(limit, source.fetch(amount, filters)).await {
                Ok(Ok(batch)) if batch.is_success() => batch.records,
                Ok(Ok(batch)) => {
                    warn!(
                        status_code = batch.status_code,
                        "question source returned an error status; no questions added"
                    );
                    return;
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "failed to fetch trivia questions");
                    return;
                }
                Err(_) => {
                    warn!(timeout = ?limit, "question source did not answer in time");
                    return;
                }
            };

            let questions = decode_records(records, &mut rand::rng());
            info!(added = questions.len(), epoch, "fetched trivia questions");
            deliver(RefillBatch {
                epoch,
                questions,
                _permit: permit,
            });
        }))
    }
}

/// Turn raw source records into shuffled questions.
///
/// Records with a blank question or answer are skipped. A structurally broken
/// record stops the batch; questions decoded before it are kept.
pub fn decode_records<R>(records: Vec<RawRecord>, rng: &mut R) -> Vec<Question>
where
    R: Rng + ?Sized,
{
    let mut questions = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let (Some(raw_question), Some(raw_correct)) = (record.question, record.correct_answer)
        else {
            warn!(
                index,
                kept = questions.len(),
                "malformed question record; dropping the rest of the batch"
            );
            break;
        };

        let text = decode_text(&raw_question);
        let correct = decode_text(&raw_correct);
        if text.trim().is_empty() || correct.trim().is_empty() {
            continue;
        }

        let mut choices: Vec<String> = record
            .incorrect_answers
            .iter()
            .map(|answer| decode_text(answer))
            .collect();
        choices.push(correct.clone());
        choices.shuffle(rng);

        let Some(correct_index) = choices.iter().position(|choice| *choice == correct) else {
            continue;
        };

        match Question::new(text, choices, correct_index) {
            Ok(question) => questions.push(question),
            Err(err) => debug!(index, error = %err, "skipping unusable question record"),
        }
    }

    questions
}

/// Decode a base64 text field, returning the raw text when it is not base64 UTF-8.
pub fn decode_text(raw: &str) -> String {
    STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}
