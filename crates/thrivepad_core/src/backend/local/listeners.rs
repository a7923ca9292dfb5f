//! Listener registry shared by auth and document subscriptions.
//!
//! Callbacks are cloned out of the registry before they run, so no lock is
//! held while user code executes.

use std::sync::{Arc, Mutex, MutexGuard};

type SharedListener<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Entry<M, T> {
    id: u64,
    meta: M,
    listener: SharedListener<T>,
}

pub(crate) struct ListenerSet<M, T> {
    state: Mutex<State<M, T>>,
}

struct State<M, T> {
    next_id: u64,
    entries: Vec<Entry<M, T>>,
}

impl<M: Clone, T> ListenerSet<M, T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    pub(crate) fn register(&self, meta: M, listener: Box<dyn Fn(T) + Send + Sync>) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(Entry {
            id,
            meta,
            listener: Arc::from(listener),
        });
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().entries.retain(|entry| entry.id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns listeners whose metadata satisfies `predicate`.
    pub(crate) fn matching(
        &self,
        predicate: impl Fn(&M) -> bool,
    ) -> Vec<(M, SharedListener<T>)> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| predicate(&entry.meta))
            .map(|entry| (entry.meta.clone(), Arc::clone(&entry.listener)))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State<M, T>> {
        // A panicking listener cannot leave the registry half-updated, so a
        // poisoned lock is still safe to reuse.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
