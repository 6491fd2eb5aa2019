//! Hook registry owned by each pool.

use super::Event;
use crate::crawler::Crawler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// A callback run when an [`Event`] fires.
pub type Hook = Arc<dyn Fn(Event, &Crawler) + Send + Sync>;

/// Identifies one registration, for [`EventRegistry::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Registered {
    id: HookId,
    hook: Hook,
    once: bool,
}

/// Ordered hooks keyed by event.
///
/// Hooks for one event run in registration order. The list is copied under
/// the lock and the hooks run after it is released, so a hook may register
/// more hooks or drive the pool that fired it.
#[derive(Default)]
pub struct EventRegistry {
    hooks: Mutex<HashMap<Event, Vec<Registered>>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for every firing of `event`.
    pub fn on(&self, event: Event, hook: Hook) -> HookId {
        self.register(event, hook, false)
    }

    /// Registers `hook` for the next firing of `event` only.
    pub fn once(&self, event: Event, hook: Hook) -> HookId {
        self.register(event, hook, true)
    }

    fn register(&self, event: Event, hook: Hook, once: bool) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .lock()
            .entry(event)
            .or_default()
            .push(Registered { id, hook, once });
        id
    }

    /// Unregisters the hook `id` from `event`.
    ///
    /// Returns `false` if it is not registered there, e.g. a `once` hook that
    /// already ran.
    pub fn off(&self, event: Event, id: HookId) -> bool {
        let mut hooks = self.hooks.lock();
        let Some(registered) = hooks.get_mut(&event) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|r| r.id != id);
        registered.len() != before
    }

    /// Runs the hooks registered for `event`.
    pub fn fire(&self, event: Event, crawler: &Crawler) {
        let snapshot: Vec<Hook> = {
            let mut hooks = self.hooks.lock();
            let Some(registered) = hooks.get_mut(&event) else {
                return;
            };
            let snapshot = registered.iter().map(|r| r.hook.clone()).collect();
            registered.retain(|r| !r.once);
            snapshot
        };

        trace!(event = %event, hooks = snapshot.len(), "Firing event");
        for hook in snapshot {
            hook(event, crawler);
        }
    }

    /// Number of hooks registered for `event`.
    #[must_use]
    pub fn len(&self, event: Event) -> usize {
        self.hooks.lock().get(&event).map_or(0, Vec::len)
    }

    /// Whether no hooks are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.lock().values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<Event, usize> = self
            .hooks
            .lock()
            .iter()
            .map(|(event, hooks)| (*event, hooks.len()))
            .collect();
        f.debug_struct("EventRegistry").field("hooks", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use parking_lot::Mutex as SyncMutex;

    fn crawler() -> Crawler {
        Crawler::builder(1)
            .with_fetcher(Arc::new(MockFetcher::ok()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let registry = EventRegistry::new();
        let calls = Arc::new(SyncMutex::new(Vec::new()));

        for n in 0..3 {
            let calls = calls.clone();
            registry.on(Event::Start, Arc::new(move |_, _| calls.lock().push(n)));
        }

        registry.fire(Event::Start, &crawler());
        assert_eq!(*calls.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fire_without_hooks_is_noop() {
        let registry = EventRegistry::new();
        registry.fire(Event::Wait, &crawler());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_once_hook_runs_once() {
        let registry = EventRegistry::new();
        let calls = Arc::new(SyncMutex::new(0));
        {
            let calls = calls.clone();
            registry.once(Event::Stop, Arc::new(move |_, _| *calls.lock() += 1));
        }
        assert_eq!(registry.len(Event::Stop), 1);

        let crawler = crawler();
        registry.fire(Event::Stop, &crawler);
        registry.fire(Event::Stop, &crawler);

        assert_eq!(*calls.lock(), 1);
        assert_eq!(registry.len(Event::Stop), 0);
    }

    #[test]
    fn test_hook_can_register_hooks_while_firing() {
        let registry = Arc::new(EventRegistry::new());
        let inner_calls = Arc::new(SyncMutex::new(0));
        {
            let registry_ref = registry.clone();
            let inner_calls = inner_calls.clone();
            registry.on(
                Event::Started,
                Arc::new(move |_, _| {
                    let inner_calls = inner_calls.clone();
                    registry_ref.on(Event::Started, Arc::new(move |_, _| *inner_calls.lock() += 1));
                }),
            );
        }

        let crawler = crawler();
        registry.fire(Event::Started, &crawler);
        assert_eq!(*inner_calls.lock(), 0);
        assert_eq!(registry.len(Event::Started), 2);

        registry.fire(Event::Started, &crawler);
        assert_eq!(*inner_calls.lock(), 1);
    }

    #[test]
    fn test_off_removes_only_that_hook() {
        let registry = EventRegistry::new();
        let calls = Arc::new(SyncMutex::new(Vec::new()));
        let ids: Vec<HookId> = (0..3)
            .map(|n| {
                let calls = calls.clone();
                registry.once(Event::Stop, Arc::new(move |_, _| calls.lock().push(n)))
            })
            .collect();

        assert!(registry.off(Event::Stop, ids[1]));
        assert!(!registry.off(Event::Stop, ids[1]));
        assert!(!registry.off(Event::Start, ids[0]));

        registry.fire(Event::Stop, &crawler());
        assert_eq!(*calls.lock(), vec![0, 2]);
        assert!(!registry.off(Event::Stop, ids[0]));
    }
}
