//! Persisted key-value storage shared by every context of an origin
//!
//! An [`Origin`] owns a storage backend and the registry of change listeners. Every context (the
//! equivalent of a browser tab) works through its own [`LocalStorage`] handle. A write that changes
//! a value notifies listeners registered by *other* contexts of the same origin - a context never
//! hears about its own writes.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage I/O failure")]
    Io(#[from] std::io::Error),
    #[error("Malformed storage file")]
    Malformed(#[from] serde_json::Error),
}

/// Raw key-value store
///
/// Single key operations are expected to be atomic.
pub trait Backend: Send + Sync {
    /// Reads a value
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Writes a value, returning the previous one
    fn set(&self, key: &str, value: &str) -> Result<Option<String>, Error>;

    /// Removes a value, returning the previous one
    fn remove(&self, key: &str) -> Result<Option<String>, Error>;
}

/// Identifier of a single context using the storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification about a value changed by another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key
    pub key: String,
    /// Value before the change
    pub old_value: Option<String>,
    /// Value after the change, `None` if removed
    pub new_value: Option<String>,
    /// Context performing the change
    pub source: ContextId,
}

type Callback = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

struct Listener {
    id: Uuid,
    context: ContextId,
    callback: Callback,
}

struct OriginInner {
    backend: Box<dyn Backend>,
    listeners: Mutex<Vec<Listener>>,
}

impl OriginInner {
    fn dispatch(&self, event: &StorageEvent) {
        // Callbacks may touch the storage themselves, so they never run under the registry lock.
        let callbacks: Vec<Callback> = self
            .listeners
            .lock()
            .iter()
            .filter(|listener| listener.context != event.source)
            .map(|listener| listener.callback.clone())
            .collect();

        trace!(key = %event.key, source = %event.source, listeners = callbacks.len(), "Dispatching storage event");
        for callback in callbacks {
            callback(event);
        }
    }
}

/// Storage shared between all contexts of a single origin
#[derive(Clone)]
pub struct Origin(Arc<OriginInner>);

impl Origin {
    /// Creates an origin over the given backend
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self(Arc::new(OriginInner {
            backend: Box::new(backend),
            listeners: Mutex::new(Vec::new()),
        }))
    }

    /// Origin kept purely in memory
    pub fn memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Opens a new context on this origin
    pub fn context(&self) -> LocalStorage {
        LocalStorage {
            origin: self.clone(),
            context: ContextId(Uuid::new_v4()),
        }
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("listeners", &self.0.listeners.lock().len())
            .finish()
    }
}

/// Storage handle of a single context
#[derive(Debug, Clone)]
pub struct LocalStorage {
    origin: Origin,
    context: ContextId,
}

impl LocalStorage {
    /// This context id
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Reads a value
    pub fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.origin.0.backend.get(key)
    }

    /// Writes a value, notifying other contexts if it changed
    pub fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let old_value = self.origin.0.backend.set(key, value)?;
        if old_value.as_deref() != Some(value) {
            self.notify(key, old_value, Some(value.to_owned()));
        }
        Ok(())
    }

    /// Removes a value, notifying other contexts if it existed
    pub fn remove(&self, key: &str) -> Result<(), Error> {
        let old_value = self.origin.0.backend.remove(key)?;
        if old_value.is_some() {
            self.notify(key, old_value, None);
        }
        Ok(())
    }

    /// Subscribes for changes made by other contexts of the origin
    ///
    /// The subscription lasts until the returned guard is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.origin.0.listeners.lock().push(Listener {
            id,
            context: self.context,
            callback: Arc::new(callback),
        });

        Subscription {
            origin: Arc::downgrade(&self.origin.0),
            id,
        }
    }

    fn notify(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        self.origin.0.dispatch(&StorageEvent {
            key: key.to_owned(),
            old_value,
            new_value,
            source: self.context,
        });
    }
}

/// Active storage change subscription
///
/// Unsubscribes when dropped.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    origin: Weak<OriginInner>,
    id: Uuid,
}

impl Subscription {
    /// Explicitly ends the subscription
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.upgrade() {
            origin.listeners.lock().retain(|listener| listener.id != self.id);
        }
    }
}
