//! Username registry
//!
//! The set of currently claimed usernames, owned by the broker.
//! A single mutex guards the set and is held only for the duration of
//! one check-and-insert or one removal.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// In-memory set of claimed usernames
///
/// At most one active claim per name. Never persisted.
#[derive(Debug, Default)]
pub struct UsernameRegistry {
    names: Mutex<HashSet<String>>,
}

impl UsernameRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `name`
    ///
    /// Returns true if the name was free and is now claimed,
    /// false if someone already holds it (registry unchanged).
    pub fn claim(&self, name: &str) -> bool {
        self.lock().insert(name.to_string())
    }

    /// Release `name`
    ///
    /// Idempotent: returns whether the name was actually held.
    pub fn release(&self, name: &str) -> bool {
        self.lock().remove(name)
    }

    /// Check if a name is currently claimed
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// Number of claimed names
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set has no invariant a panicking holder could break halfway.
        self.names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_claim_and_conflict() {
        let registry = UsernameRegistry::new();

        assert!(registry.claim("alice"));
        assert!(!registry.claim("alice"));
        assert!(registry.claim("bob"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = UsernameRegistry::new();
        registry.claim("alice");

        assert!(registry.release("alice"));
        assert!(!registry.release("alice"));
        assert!(!registry.release("alice"));
        assert!(!registry.contains("alice"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reclaim_after_release() {
        let registry = UsernameRegistry::new();

        assert!(registry.claim("alice"));
        registry.release("alice");
        assert!(registry.claim("alice"));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let registry = Arc::new(UsernameRegistry::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.claim("alice"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}
