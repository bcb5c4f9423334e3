//! # store — flat JSON list persistence
//!
//! Two independent lists live on disk as plain JSON arrays: the watchlist
//! and the registered chat ids. Both are read fully on every access and
//! rewritten fully on every mutation.
//!
//! ```text
//!   Watchlist / Recipients          domain rules (canonical form, defaults)
//!        │
//!   GuardedList<T>                  Mutex around load → modify → save,
//!        │                          self-heal of missing / corrupt content
//!   dyn ListStore<T>                raw load/save (JSON file, or a fake)
//! ```

pub mod recipients;
pub mod watchlist;

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::StoreError;

pub use recipients::Recipients;
pub use watchlist::Watchlist;

// ─── Raw store ────────────────────────────────────────────────────────────────

/// Outcome of reading a list from backing storage.
#[derive(Debug, PartialEq)]
pub enum Loaded<T> {
    /// Nothing stored yet (first run).
    Missing,
    /// Storage exists but cannot be parsed.
    Corrupt(String),
    Items(Vec<T>),
}

#[async_trait]
pub trait ListStore<T>: Send + Sync {
    async fn load(&self) -> Result<Loaded<T>, StoreError>;
    async fn save(&self, items: &[T]) -> Result<(), StoreError>;
}

/// A JSON array in a single file.
pub struct JsonFileStore<T> {
    path:    PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _marker: PhantomData }
    }
}

#[async_trait]
impl<T> ListStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Loaded<T>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Loaded::Corrupt("empty file".to_string()));
        }

        match serde_json::from_str::<Vec<T>>(&content) {
            Ok(items) => Ok(Loaded::Items(items)),
            Err(e) => Ok(Loaded::Corrupt(e.to_string())),
        }
    }

    async fn save(&self, items: &[T]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(items)?;

        // write-then-rename so a crash never leaves a half-written list
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ─── Guarded list ─────────────────────────────────────────────────────────────

/// Serialises every read-modify-persist cycle on one list and heals missing or
/// corrupt storage by writing the default contents back.
pub struct GuardedList<T> {
    label:    &'static str,
    store:    Arc<dyn ListStore<T>>,
    defaults: Vec<T>,
    lock:     Mutex<()>,
}

impl<T> GuardedList<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(label: &'static str, store: Arc<dyn ListStore<T>>, defaults: Vec<T>) -> Self {
        Self { label, store, defaults, lock: Mutex::new(()) }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Load with the lock already held by the caller.
    pub async fn load_locked(&self, _guard: &MutexGuard<'_, ()>) -> Result<Vec<T>, StoreError> {
        match self.store.load().await? {
            Loaded::Items(items) => Ok(items),
            Loaded::Missing => {
                info!(list = self.label, "No stored list yet — writing defaults");
                self.store.save(&self.defaults).await?;
                Ok(self.defaults.clone())
            }
            Loaded::Corrupt(reason) => {
                warn!(list = self.label, %reason, "⚠️ Stored list unreadable — resetting to defaults");
                self.store.save(&self.defaults).await?;
                Ok(self.defaults.clone())
            }
        }
    }

    pub async fn save_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
        items: &[T],
    ) -> Result<(), StoreError> {
        self.store.save(items).await
    }

    pub async fn load(&self) -> Result<Vec<T>, StoreError> {
        let guard = self.lock().await;
        self.load_locked(&guard).await
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
