pub mod audience;
pub mod fetch_gate;
pub mod question;
pub mod scheduler;
mod sse;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::SettingsStore,
    dao::question_source::QuestionSource,
    services::{
        broadcast::{Broadcaster, SseBroadcaster},
        cycle_runner::{CycleRunner, SchedulerHandle},
    },
};

pub use self::sse::{SseHub, TriviaChannels};
use self::{audience::AudienceTracker, fetch_gate::FetchGate, sse::SseState};

pub type SharedState = Arc<AppState>;

/// Central application state shared by every route.
pub struct AppState {
    sse: SseState,
    audience: Arc<AudienceTracker>,
    settings: SettingsStore,
    scheduler: SchedulerHandle,
    fetch_gate: FetchGate,
}

impl AppState {
    /// Build the shared state together with the cycle runner that drives it.
    ///
    /// The runner is returned unstarted; the caller spawns [`CycleRunner::run`].
    pub async fn new(
        settings: SettingsStore,
        source: Arc<dyn QuestionSource>,
    ) -> (SharedState, CycleRunner) {
        let sse = SseState::new(64, 16);
        let audience = Arc::new(AudienceTracker::new());
        let fetch_gate = FetchGate::new();

        let broadcaster: Arc<dyn Broadcaster> = Arc::new(SseBroadcaster::new(
            sse.channels().clone(),
            audience.clone(),
        ));
        let (runner, scheduler) = CycleRunner::new(
            settings.snapshot().await,
            audience.clone(),
            source,
            broadcaster,
            fetch_gate.clone(),
        );

        let state = Arc::new(Self {
            sse,
            audience,
            settings,
            scheduler,
            fetch_gate,
        });
        (state, runner)
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.channels().audience()
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.channels().console()
    }

    /// Token guard that ensures a single admin SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.sse.console_token()
    }

    /// Subscribers of the public stream.
    pub fn audience(&self) -> &AudienceTracker {
        &self.audience
    }

    /// Persisted trivia settings.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Command channel into the cycle runner.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Single-flight flag of the refill coordinator.
    pub fn fetch_gate(&self) -> &FetchGate {
        &self.fetch_gate
    }
}
