//! Transient document handles for displaying generated HTML.
//!
//! A presented document lives only in memory, addressed by an opaque handle.
//! Ownership is exclusive: each consumer (the preview iframe, the full-screen
//! view) holds at most one live handle, and presenting a new document for a
//! consumer releases its predecessor first. Release is idempotent, so a view
//! can release unconditionally on teardown.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

#[derive(Default)]
struct SandboxState {
    /// consumer name -> live handle
    by_consumer: HashMap<String, String>,
    /// handle -> document body
    docs: HashMap<String, String>,
}

/// In-memory store of presented documents.
#[derive(Default)]
pub struct SandboxStore {
    inner: Mutex<SandboxState>,
}

impl SandboxStore {
    pub fn new() -> Self {
        SandboxStore::default()
    }

    /// Present `html` for `consumer`, releasing any document the consumer
    /// previously held, and return the new handle.
    pub fn present(&self, consumer: &str, html: String) -> String {
        let mut state = self.inner.lock().expect("sandbox lock poisoned");
        if let Some(old) = state.by_consumer.remove(consumer) {
            state.docs.remove(&old);
            tracing::debug!(consumer, handle = %old, "released superseded document");
        }
        let handle = Uuid::new_v4().to_string();
        state.docs.insert(handle.clone(), html);
        state.by_consumer.insert(consumer.to_string(), handle.clone());
        handle
    }

    /// Release a handle. Unknown or already-released handles are a no-op.
    pub fn release(&self, handle: &str) {
        let mut state = self.inner.lock().expect("sandbox lock poisoned");
        if state.docs.remove(handle).is_some() {
            state.by_consumer.retain(|_, h| h != handle);
            tracing::debug!(handle, "released document");
        }
    }

    /// Release whatever `consumer` currently holds. Called on view teardown;
    /// a consumer with no live handle is a no-op.
    pub fn release_all(&self, consumer: &str) {
        let mut state = self.inner.lock().expect("sandbox lock poisoned");
        if let Some(handle) = state.by_consumer.remove(consumer) {
            state.docs.remove(&handle);
            tracing::debug!(consumer, %handle, "released on teardown");
        }
    }

    /// Fetch the document behind a handle, if it is still live.
    pub fn fetch(&self, handle: &str) -> Option<String> {
        let state = self.inner.lock().expect("sandbox lock poisoned");
        state.docs.get(handle).cloned()
    }

    /// Number of live documents across all consumers.
    pub fn live_count(&self) -> usize {
        self.inner.lock().expect("sandbox lock poisoned").docs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_returns_fetchable_handle() {
        let store = SandboxStore::new();
        let h = store.present("preview", "<html>a</html>".to_string());
        assert_eq!(store.fetch(&h).as_deref(), Some("<html>a</html>"));
    }

    #[test]
    fn test_present_twice_keeps_exactly_one_live_handle() {
        let store = SandboxStore::new();
        let first = store.present("preview", "one".to_string());
        let second = store.present("preview", "two".to_string());
        assert_ne!(first, second);
        assert_eq!(store.live_count(), 1);
        assert!(store.fetch(&first).is_none());
        assert_eq!(store.fetch(&second).as_deref(), Some("two"));
    }

    #[test]
    fn test_consumers_are_independent() {
        let store = SandboxStore::new();
        let a = store.present("preview", "a".to_string());
        let b = store.present("fullscreen", "b".to_string());
        assert_eq!(store.live_count(), 2);
        assert!(store.fetch(&a).is_some());
        assert!(store.fetch(&b).is_some());
    }

    #[test]
    fn test_release_is_idempotent() {
        let store = SandboxStore::new();
        let h = store.present("preview", "doc".to_string());
        store.release(&h);
        store.release(&h);
        store.release("never-issued");
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_release_clears_consumer_slot() {
        let store = SandboxStore::new();
        let h = store.present("preview", "doc".to_string());
        store.release(&h);
        // A fresh present after release must not try to free the dead handle.
        let h2 = store.present("preview", "doc2".to_string());
        assert_eq!(store.fetch(&h2).as_deref(), Some("doc2"));
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_release_all_on_teardown() {
        let store = SandboxStore::new();
        store.present("preview", "doc".to_string());
        store.release_all("preview");
        store.release_all("preview");
        store.release_all("never-presented");
        assert_eq!(store.live_count(), 0);
    }
}
