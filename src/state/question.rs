use std::collections::VecDeque;

use thiserror::Error;

/// Minimum number of choices a question must offer.
pub const MIN_CHOICES: usize = 2;

/// Reasons a question cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    /// Fewer than [`MIN_CHOICES`] choices were supplied.
    #[error("a question needs at least {MIN_CHOICES} choices (got {0})")]
    TooFewChoices(usize),
    /// The correct index does not point inside the choice list.
    #[error("correct index {index} is out of range for {len} choices")]
    CorrectIndexOutOfRange {
        /// Index that was supplied.
        index: usize,
        /// Number of choices available.
        len: usize,
    },
}

/// One multiple-choice question ready to be asked.
///
/// The choice list is already shuffled; `correct_index` always designates the
/// answer the source marked as correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    choices: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Build a question, rejecting choice lists that break the invariants.
    pub fn new(
        text: impl Into<String>,
        choices: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        if choices.len() < MIN_CHOICES {
            return Err(QuestionError::TooFewChoices(choices.len()));
        }
        if correct_index >= choices.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: choices.len(),
            });
        }

        Ok(Self {
            text: text.into(),
            choices,
            correct_index,
        })
    }

    /// Question text as displayed to the audience.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Choices in display order.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Position of the correct choice inside [`Question::choices`].
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Text of the correct choice.
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }

    /// Lines announcing the question: the text followed by one labelled line per choice.
    pub fn question_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.choices.len() + 1);
        lines.push(format!("Question: {}", self.text));
        lines.extend(
            self.choices
                .iter()
                .enumerate()
                .map(|(index, choice)| format!("{}) {}", choice_label(index), choice)),
        );
        lines
    }

    /// Line revealing the correct choice.
    pub fn answer_line(&self) -> String {
        format!(
            "Answer: {}) {}",
            choice_label(self.correct_index),
            self.correct_choice()
        )
    }
}

/// Stable label for the choice at `index`: `A`, `B`, `C`, ... then 1-based numbers past `Z`.
pub fn choice_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(offset) if offset < 26 => char::from(b'A' + offset).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// FIFO buffer of questions waiting to be asked.
#[derive(Debug, Default)]
pub struct QuestionQueue {
    items: VecDeque<Question>,
}

impl QuestionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a question at the back.
    pub fn push_back(&mut self, question: Question) {
        self.items.push_back(question);
    }

    /// Append a batch, preserving its order.
    pub fn extend(&mut self, questions: impl IntoIterator<Item = Question>) {
        self.items.extend(questions);
    }

    /// Remove the oldest question, if any.
    pub fn pop_front(&mut self) -> Option<Question> {
        self.items.pop_front()
    }

    /// Number of queued questions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no question.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every queued question.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str) -> Question {
        Question::new(text, vec!["yes".into(), "no".into()], 0).unwrap()
    }

    #[test]
    fn rejects_single_choice() {
        let err = Question::new("lonely?", vec!["yes".into()], 0).unwrap_err();
        assert_eq!(err, QuestionError::TooFewChoices(1));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Question::new("q", vec!["a".into(), "b".into()], 2).unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn formats_question_and_answer_lines() {
        let question = Question::new(
            "2+2=?",
            vec!["3".into(), "4".into(), "5".into(), "6".into()],
            1,
        )
        .unwrap();

        assert_eq!(
            question.question_lines(),
            vec!["Question: 2+2=?", "A) 3", "B) 4", "C) 5", "D) 6"]
        );
        assert_eq!(question.answer_line(), "Answer: B) 4");
    }

    #[test]
    fn labels_past_the_alphabet_fall_back_to_numbers() {
        assert_eq!(choice_label(0), "A");
        assert_eq!(choice_label(25), "Z");
        assert_eq!(choice_label(26), "27");
    }

    #[test]
    fn queue_is_fifo_and_clearable() {
        let mut queue = QuestionQueue::new();
        queue.push_back(sample("first"));
        queue.extend([sample("second"), sample("third")]);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop_front().unwrap().text(), "first");
        assert_eq!(queue.pop_front().unwrap().text(), "second");

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop_front().is_none());
    }
}
