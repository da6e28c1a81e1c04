//! Adapters for the external collaborators the trivia loop depends on.

pub mod question_source;
