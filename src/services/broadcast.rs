//! Fan-out of trivia lines to the audience and the operator console.

use std::sync::Arc;

use tracing::info;

use crate::state::{TriviaChannels, audience::Audience};

/// Channel every trivia line goes through.
pub trait Broadcaster: Send + Sync {
    /// Deliver `line` to every current recipient.
    fn send(&self, line: &str);
}

/// Publishes lines on the public SSE stream and mirrors them to the operator console.
pub struct SseBroadcaster {
    channels: TriviaChannels,
    audience: Arc<dyn Audience>,
}

impl SseBroadcaster {
    /// Build a broadcaster over the audience and console hubs.
    pub fn new(channels: TriviaChannels, audience: Arc<dyn Audience>) -> Self {
        Self { channels, audience }
    }
}

impl Broadcaster for SseBroadcaster {
    fn send(&self, line: &str) {
        if self.audience.is_empty() {
            return;
        }

        self.channels.publish(line);
        info!(target: "console", "{line}");
    }
}
