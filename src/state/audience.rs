use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use dashmap::DashMap;
use uuid::Uuid;

/// Read-only view of who is currently listening to the broadcast channel.
pub trait Audience: Send + Sync {
    /// Number of current recipients.
    fn count(&self) -> usize;

    /// Whether nobody is listening.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Tracks the subscribers of the public stream.
#[derive(Debug, Default)]
pub struct AudienceTracker {
    members: DashMap<Uuid, Instant>,
    count: AtomicUsize,
}

impl AudienceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member. Returns `true` when the audience was empty before.
    pub fn join(&self, id: Uuid) -> bool {
        if self.members.insert(id, Instant::now()).is_some() {
            return false;
        }
        self.count.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Remove a member. Unknown identifiers are ignored.
    pub fn leave(&self, id: Uuid) {
        if self.members.remove(&id).is_some() {
            self.count.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Audience for AudienceTracker {
    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}
