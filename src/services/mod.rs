/// Admin commands controlling the trivia loop.
pub mod admin_service;
/// Fan-out of trivia lines.
pub mod broadcast;
/// The task owning the scheduler.
pub mod cycle_runner;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Background question refills.
pub mod refill;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
