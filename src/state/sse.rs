use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

/// Event name carried by every trivia line.
pub const EVENT_TRIVIA: &str = "trivia";

/// Streams owned by [`AppState`](super::AppState): the audience feed and the operator console.
pub struct SseState {
    channels: TriviaChannels,
    console_token: Mutex<Option<String>>,
}

impl SseState {
    /// Build both streams with their channel capacities.
    pub fn new(audience_capacity: usize, console_capacity: usize) -> Self {
        Self {
            channels: TriviaChannels::new(audience_capacity, console_capacity),
            console_token: Mutex::new(None),
        }
    }

    /// Hubs a trivia line is published on.
    pub fn channels(&self) -> &TriviaChannels {
        &self.channels
    }

    /// Slot holding the token of the one connected operator console.
    pub fn console_token(&self) -> &Mutex<Option<String>> {
        &self.console_token
    }
}

/// The audience hub paired with the operator console hub. Clones share both channels.
#[derive(Clone)]
pub struct TriviaChannels {
    audience: SseHub,
    console: SseHub,
}

impl TriviaChannels {
    /// Create both hubs with their own capacities.
    pub fn new(audience_capacity: usize, console_capacity: usize) -> Self {
        Self {
            audience: SseHub::new(audience_capacity),
            console: SseHub::new(console_capacity),
        }
    }

    /// Hub the public stream subscribes to.
    pub fn audience(&self) -> &SseHub {
        &self.audience
    }

    /// Hub the admin stream subscribes to.
    pub fn console(&self) -> &SseHub {
        &self.console
    }

    /// Publish one line as a `trivia` event on both hubs.
    pub fn publish(&self, line: &str) {
        let event = ServerEvent::new(Some(EVENT_TRIVIA.to_string()), line.to_string());
        self.audience.broadcast(event.clone());
        self.console.broadcast(event);
    }
}

/// Broadcast hub wrapper used by the SSE services. Clones share the channel.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
