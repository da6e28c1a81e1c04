//! Open Trivia DB implementation of the question source.

pub mod config;
pub mod models;
pub mod source;

pub use self::{config::OpenTdbConfig, source::OpenTdbSource};
