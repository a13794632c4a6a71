// Standard library imports
use std::collections::HashSet;
use std::sync::RwLock;

// Internal imports
use crate::types::ChatEndpoint;

/// Outcome of a subscribe call. Subscribing twice is a no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeStatus {
    Added,
    AlreadySubscribed,
}

/// Outcome of an unsubscribe call. Removing a non-member is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeStatus {
    Removed,
    NotSubscribed,
}

/// In-memory set of subscriber endpoints.
///
/// The only shared mutable state in the system. Injected by `Arc` into the
/// command handlers, the poller and the broadcaster; no global singleton.
/// State is process-lifetime only: a restart loses all subscribers.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    endpoints: RwLock<HashSet<ChatEndpoint>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashSet::new()),
        }
    }

    pub fn subscribe(&self, endpoint: ChatEndpoint) -> SubscribeStatus {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        if endpoints.insert(endpoint) {
            SubscribeStatus::Added
        } else {
            SubscribeStatus::AlreadySubscribed
        }
    }

    pub fn unsubscribe(&self, endpoint: ChatEndpoint) -> UnsubscribeStatus {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        if endpoints.remove(&endpoint) {
            UnsubscribeStatus::Removed
        } else {
            UnsubscribeStatus::NotSubscribed
        }
    }

    /// Point-in-time copy of the subscriber set. Mutations after the call
    /// are not visible to the returned vector, and iterating it holds no
    /// lock on the live registry.
    pub fn snapshot(&self) -> Vec<ChatEndpoint> {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        endpoints.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_idempotent() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.subscribe(ChatEndpoint(1)), SubscribeStatus::Added);
        assert_eq!(
            registry.subscribe(ChatEndpoint(1)),
            SubscribeStatus::AlreadySubscribed
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_idempotent() {
        let registry = SubscriberRegistry::new();
        assert_eq!(
            registry.unsubscribe(ChatEndpoint(1)),
            UnsubscribeStatus::NotSubscribed
        );
        registry.subscribe(ChatEndpoint(1));
        assert_eq!(
            registry.unsubscribe(ChatEndpoint(1)),
            UnsubscribeStatus::Removed
        );
        assert_eq!(
            registry.unsubscribe(ChatEndpoint(1)),
            UnsubscribeStatus::NotSubscribed
        );
    }

    #[test]
    fn test_subscribe_then_unsubscribe_leaves_empty_snapshot() {
        let registry = SubscriberRegistry::new();
        registry.subscribe(ChatEndpoint(42));
        registry.unsubscribe(ChatEndpoint(42));
        assert!(registry.snapshot().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutations() {
        let registry = SubscriberRegistry::new();
        registry.subscribe(ChatEndpoint(1));
        registry.subscribe(ChatEndpoint(2));

        let snapshot = registry.snapshot();
        registry.subscribe(ChatEndpoint(3));
        registry.unsubscribe(ChatEndpoint(1));

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&ChatEndpoint(1)));
        assert!(snapshot.contains(&ChatEndpoint(2)));
        assert!(!snapshot.contains(&ChatEndpoint(3)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_mutation() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriberRegistry::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    registry.subscribe(ChatEndpoint(i * 100 + j));
                    let _ = registry.snapshot();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 800);
    }
}
