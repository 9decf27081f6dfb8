//! Listener bookkeeping: event listeners and connection lifecycle hooks.

use std::collections::HashMap;
use std::sync::Arc;

use insforge_common::ListenerId;

use crate::types::{events, RealtimeErrorPayload, SocketMessage};

/// Callback invoked for a dispatched custom event.
pub type EventCallback = Arc<dyn Fn(&SocketMessage) + Send + Sync>;

pub(crate) type ConnectHook = Arc<dyn Fn() + Send + Sync>;
pub(crate) type ReasonHook = Arc<dyn Fn(&str) + Send + Sync>;
pub(crate) type ErrorHook = Arc<dyn Fn(&RealtimeErrorPayload) + Send + Sync>;

// ---------------------------------------------------------------------------
// Event listeners
// ---------------------------------------------------------------------------

/// Event name -> listener id -> callback.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: HashMap<String, HashMap<ListenerId, EventCallback>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, event: &str, callback: EventCallback) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .entry(event.to_string())
            .or_default()
            .insert(id.clone(), callback);
        id
    }

    /// Returns false if nothing was registered under that id.
    pub(crate) fn remove(&mut self, event: &str, id: &ListenerId) -> bool {
        let Some(set) = self.listeners.get_mut(event) else {
            return false;
        };
        let removed = set.remove(id).is_some();
        if set.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Snapshot of the callbacks for `event`, including wildcard listeners.
    pub(crate) fn matching(&self, event: &str) -> Vec<EventCallback> {
        let exact = self.listeners.get(event).into_iter().flat_map(|s| s.values());
        let wildcard = if event == events::WILDCARD {
            None
        } else {
            self.listeners.get(events::WILDCARD)
        };
        exact
            .chain(wildcard.into_iter().flat_map(|s| s.values()))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle hooks
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct Hooks {
    connect: HashMap<ListenerId, ConnectHook>,
    disconnect: HashMap<ListenerId, ReasonHook>,
    connect_error: HashMap<ListenerId, ReasonHook>,
    error: HashMap<ListenerId, ErrorHook>,
}

impl Hooks {
    pub(crate) fn add_connect(&mut self, hook: ConnectHook) -> ListenerId {
        let id = ListenerId::new();
        self.connect.insert(id.clone(), hook);
        id
    }

    pub(crate) fn add_disconnect(&mut self, hook: ReasonHook) -> ListenerId {
        let id = ListenerId::new();
        self.disconnect.insert(id.clone(), hook);
        id
    }

    pub(crate) fn add_connect_error(&mut self, hook: ReasonHook) -> ListenerId {
        let id = ListenerId::new();
        self.connect_error.insert(id.clone(), hook);
        id
    }

    pub(crate) fn add_error(&mut self, hook: ErrorHook) -> ListenerId {
        let id = ListenerId::new();
        self.error.insert(id.clone(), hook);
        id
    }

    pub(crate) fn remove(&mut self, id: &ListenerId) -> bool {
        self.connect.remove(id).is_some()
            | self.disconnect.remove(id).is_some()
            | self.connect_error.remove(id).is_some()
            | self.error.remove(id).is_some()
    }

    pub(crate) fn connect(&self) -> Vec<ConnectHook> {
        self.connect.values().cloned().collect()
    }

    pub(crate) fn disconnect(&self) -> Vec<ReasonHook> {
        self.disconnect.values().cloned().collect()
    }

    pub(crate) fn connect_error(&self) -> Vec<ReasonHook> {
        self.connect_error.values().cloned().collect()
    }

    pub(crate) fn error(&self) -> Vec<ErrorHook> {
        self.error.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> EventCallback {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn add_and_remove_listener() {
        let mut registry = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = registry.add("updated", counting(&hits));

        assert_eq!(registry.matching("updated").len(), 1);
        assert!(registry.remove("updated", &id));
        assert!(registry.matching("updated").is_empty());
    }

    #[test]
    fn removing_unknown_listener_is_a_no_op() {
        let mut registry = ListenerRegistry::default();
        let id = registry.add("updated", counting(&Arc::new(AtomicUsize::new(0))));

        assert!(!registry.remove("created", &id));
        assert!(!registry.remove("updated", &ListenerId::new()));
        assert_eq!(registry.matching("updated").len(), 1);
    }

    #[test]
    fn matching_includes_wildcard_once() {
        let mut registry = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.add("updated", counting(&hits));
        registry.add("updated", counting(&hits));
        registry.add(events::WILDCARD, counting(&hits));
        registry.add("deleted", counting(&hits));

        assert_eq!(registry.matching("updated").len(), 3);
        assert_eq!(registry.matching("created").len(), 1);
        assert_eq!(registry.matching(events::WILDCARD).len(), 1);
    }

    #[test]
    fn hooks_remove_by_id_across_kinds() {
        let mut hooks = Hooks::default();
        let connect = hooks.add_connect(Arc::new(|| {}));
        let error = hooks.add_error(Arc::new(|_| {}));
        hooks.add_disconnect(Arc::new(|_| {}));

        assert!(hooks.remove(&connect));
        assert!(hooks.remove(&error));
        assert!(!hooks.remove(&connect));
        assert!(hooks.connect().is_empty());
        assert!(hooks.error().is_empty());
        assert_eq!(hooks.disconnect().len(), 1);
    }
}
