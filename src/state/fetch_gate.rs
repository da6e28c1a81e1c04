use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Single-flight gate guarding the outstanding question refill.
///
/// Cloning the gate shares the same flag, so every trigger site observes the
/// same claim.
#[derive(Debug, Clone, Default)]
pub struct FetchGate {
    fetching: Arc<AtomicBool>,
}

impl FetchGate {
    /// Create an unclaimed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or return `None` when a refill is already outstanding.
    pub fn try_claim(&self) -> Option<FetchPermit> {
        self.fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FetchPermit {
                fetching: Arc::clone(&self.fetching),
            })
    }

    /// Whether a refill is currently outstanding.
    pub fn is_claimed(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }
}

/// Proof of an outstanding refill. Dropping it releases the gate.
#[derive(Debug)]
pub struct FetchPermit {
    fetching: Arc<AtomicBool>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.fetching.store(false, Ordering::Release);
    }
}
