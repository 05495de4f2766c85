//! Latest-wins request arbitration per slot
//!
//! Every asynchronous collision check or load is tagged with a token for
//! its slot. Issuing a new token for a slot supersedes all earlier ones;
//! only the holder of the current token may commit results. Superseded
//! tokens are also flagged cancelled so long-running work can stop early,
//! but the equality check in [`RequestArbiter::is_current`] is what decides.

use beebo_core::Slot;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Opaque, strictly increasing per-slot request tag
#[derive(Debug, Clone)]
pub struct RequestToken {
    slot: Slot,
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl RequestToken {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Set once a newer token for the same slot exists
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl PartialEq for RequestToken {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl Eq for RequestToken {}

/// Issues tokens and answers staleness queries
#[derive(Debug, Default)]
pub struct RequestArbiter {
    next_generation: u64,
    current: HashMap<Slot, RequestToken>,
}

impl RequestArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// New current token for `slot`; every earlier token for it goes stale
    pub fn issue(&mut self, slot: Slot) -> RequestToken {
        self.next_generation += 1;
        let token = RequestToken {
            slot,
            generation: self.next_generation,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        if let Some(previous) = self.current.insert(slot, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Whether `token` is still the latest issued for its slot
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.current
            .get(&token.slot)
            .is_some_and(|current| current.generation == token.generation)
    }

    /// Make every outstanding token for `slot` stale without issuing a new one
    pub fn invalidate(&mut self, slot: Slot) {
        if let Some(previous) = self.current.remove(&slot) {
            previous.cancel();
        }
    }

    /// Make every outstanding token stale
    pub fn invalidate_all(&mut self) {
        for (_, previous) in self.current.drain() {
            previous.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins() {
        let mut arbiter = RequestArbiter::new();
        let first = arbiter.issue(Slot::HEAD);
        assert!(arbiter.is_current(&first));

        let second = arbiter.issue(Slot::HEAD);
        assert!(!arbiter.is_current(&first));
        assert!(first.is_cancelled());
        assert!(arbiter.is_current(&second));
        assert!(!second.is_cancelled());
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_slots_are_independent() {
        let mut arbiter = RequestArbiter::new();
        let head = arbiter.issue(Slot::HEAD);
        let clothes = arbiter.issue(Slot::CLOTHES);
        assert!(arbiter.is_current(&head));
        assert!(arbiter.is_current(&clothes));
        assert_ne!(head, clothes);
    }

    #[test]
    fn test_invalidate() {
        let mut arbiter = RequestArbiter::new();
        let head = arbiter.issue(Slot::HEAD);
        let body = arbiter.issue(Slot::BODY);

        arbiter.invalidate(Slot::HEAD);
        assert!(!arbiter.is_current(&head));
        assert!(arbiter.is_current(&body));

        arbiter.invalidate_all();
        assert!(!arbiter.is_current(&body));
        assert!(body.is_cancelled());

        let fresh = arbiter.issue(Slot::BODY);
        assert!(arbiter.is_current(&fresh));
    }
}
