//! Session token store.
//!
//! Maps short opaque ids to navigation and processing intents so that only
//! the id travels in a chat callback payload. Tokens live in memory only and
//! are gone after a restart.

use crate::error::{RcbotError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Length of generated token ids (hex characters).
const TOKEN_LEN: usize = 12;

/// What a token stands for. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open a directory at its first page.
    Navigate { path: String },
    /// Open a directory at a given entry offset.
    Paginate { path: String, offset: usize },
    /// Run the processing pipeline on a remote file.
    Process { path: String },
}

impl Intent {
    /// Remote path the intent points at.
    pub fn path(&self) -> &str {
        match self {
            Intent::Navigate { path } | Intent::Paginate { path, .. } | Intent::Process { path } => path,
        }
    }
}

#[derive(Default)]
struct Inner {
    intents: HashMap<String, Intent>,
    /// Creation order, oldest first.
    order: VecDeque<String>,
}

/// Capacity-bounded, thread-safe token store with oldest-created eviction.
pub struct TokenStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl TokenStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register an intent and return its id.
    pub fn create(&self, intent: Intent) -> String {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let id = loop {
            let candidate = Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string();
            if !inner.intents.contains_key(&candidate) {
                break candidate;
            }
        };

        while inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.intents.remove(&oldest);
                debug!("Evicted token {}", oldest);
            }
        }

        inner.intents.insert(id.clone(), intent);
        inner.order.push_back(id.clone());
        id
    }

    /// Look up a token. Reading does not consume or expire it.
    pub fn resolve(&self, id: &str) -> Result<Intent> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .intents
            .get(id)
            .cloned()
            .ok_or_else(|| RcbotError::TokenNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_create_and_resolve() {
        let store = TokenStore::new(16);
        let intent = Intent::Paginate {
            path: "videos/2024".to_string(),
            offset: 20,
        };

        let id = store.create(intent.clone());
        assert_eq!(id.len(), TOKEN_LEN);
        assert_eq!(store.resolve(&id).unwrap(), intent.clone());
        // Resolving twice is fine: tokens are not consumed on read
        assert_eq!(store.resolve(&id).unwrap(), intent);
    }

    #[test]
    fn test_unknown_token() {
        let store = TokenStore::new(4);
        assert!(matches!(
            store.resolve("deadbeef0000"),
            Err(RcbotError::TokenNotFound(id)) if id == "deadbeef0000"
        ));
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_evicts_oldest_first() {
        let store = TokenStore::new(2);
        let a = store.create(Intent::Navigate { path: "a".into() });
        let b = store.create(Intent::Navigate { path: "b".into() });
        let c = store.create(Intent::Navigate { path: "c".into() });

        assert_eq!(store.len(), 2);
        assert!(store.resolve(&a).is_err());
        assert_eq!(store.resolve(&b).unwrap().path(), "b");
        assert_eq!(store.resolve(&c).unwrap().path(), "c");
    }

    #[test]
    fn test_concurrent_creation_yields_unique_ids() {
        let store = Arc::new(TokenStore::new(100_000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..500)
                        .map(|i| {
                            store.create(Intent::Process {
                                path: format!("t{t}/f{i}"),
                            })
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 4000);
        assert_eq!(store.len(), 4000);
        for id in &ids {
            assert!(store.resolve(id).is_ok());
        }
    }
}
