//! # store::watchlist
//!
//! The tickers the scanner walks every cycle. Entries are canonical (suffix
//! included) before any comparison, so `BBRI` and `BBRI.JK` are one entry.
//! Insertion order is kept for display only.

use std::sync::Arc;

use tracing::{info, warn};

use super::{GuardedList, ListStore};
use crate::error::StoreError;
use crate::models::Ticker;

pub struct Watchlist {
    list:   GuardedList<String>,
    suffix: String,
}

impl Watchlist {
    /// `defaults` are raw codes; they are canonicalised here and used both for
    /// the first-run bootstrap and for resetting unreadable storage.
    pub fn new(store: Arc<dyn ListStore<String>>, defaults: &[String], suffix: &str) -> Self {
        let defaults = dedup_canonical(defaults.iter().map(String::as_str), suffix)
            .into_iter()
            .map(|t| t.to_string())
            .collect();

        Self {
            list:   GuardedList::new("watchlist", store, defaults),
            suffix: suffix.to_string(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Canonicalise user input.
    pub fn parse(&self, raw: &str) -> Result<Ticker, StoreError> {
        Ticker::canonical(raw, &self.suffix).ok_or_else(|| StoreError::InvalidTicker(raw.to_string()))
    }

    /// Current entries in insertion order.
    pub async fn load(&self) -> Result<Vec<Ticker>, StoreError> {
        let raw = self.list.load().await?;
        Ok(dedup_canonical(raw.iter().map(String::as_str), &self.suffix))
    }

    /// `true` if the ticker was not yet present.
    pub async fn add(&self, raw: &str) -> Result<bool, StoreError> {
        let ticker = self.parse(raw)?;

        let guard = self.list.lock().await;
        let stored = self.list.load_locked(&guard).await?;
        let mut current = dedup_canonical(stored.iter().map(String::as_str), &self.suffix);

        if current.contains(&ticker) {
            return Ok(false);
        }

        current.push(ticker.clone());
        self.list.save_locked(&guard, &to_strings(&current)).await?;
        info!(ticker = %ticker, "➕ Added to watchlist");
        Ok(true)
    }

    /// `true` if the ticker was present and is now gone.
    pub async fn remove(&self, raw: &str) -> Result<bool, StoreError> {
        let ticker = self.parse(raw)?;

        let guard = self.list.lock().await;
        let stored = self.list.load_locked(&guard).await?;
        let mut current = dedup_canonical(stored.iter().map(String::as_str), &self.suffix);

        let before = current.len();
        current.retain(|t| t != &ticker);
        if current.len() == before {
            return Ok(false);
        }

        self.list.save_locked(&guard, &to_strings(&current)).await?;
        info!(ticker = %ticker, "➖ Removed from watchlist");
        Ok(true)
    }
}

fn to_strings(tickers: &[Ticker]) -> Vec<String> {
    tickers.iter().map(|t| t.to_string()).collect()
}

/// Canonicalise, drop invalid entries, keep the first of any duplicates.
fn dedup_canonical<'a>(raw: impl Iterator<Item = &'a str>, suffix: &str) -> Vec<Ticker> {
    let mut out: Vec<Ticker> = Vec::new();
    for entry in raw {
        match Ticker::canonical(entry, suffix) {
            Some(t) if !out.contains(&t) => out.push(t),
            Some(_) => {}
            None => warn!(entry, "Ignoring invalid watchlist entry"),
        }
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use std::path::Path;

    fn make_watchlist(path: &Path) -> Watchlist {
        let store: Arc<dyn ListStore<String>> = Arc::new(JsonFileStore::<String>::new(path));
        Watchlist::new(store, &["BBRI".to_string(), "BMRI".to_string()], ".JK")
    }

    fn on_disk(path: &Path) -> Vec<String> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_first_load_bootstraps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let watchlist = make_watchlist(&path);

        let tickers = watchlist.load().await.unwrap();
        assert_eq!(to_strings(&tickers), vec!["BBRI.JK", "BMRI.JK"]);
        assert_eq!(on_disk(&path), vec!["BBRI.JK", "BMRI.JK"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_resets_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        std::fs::write(&path, "[\"TLKM.JK\", oops").unwrap();
        let watchlist = make_watchlist(&path);

        let tickers = watchlist.load().await.unwrap();
        assert_eq!(tickers.len(), 2);
        assert_eq!(on_disk(&path), vec!["BBRI.JK", "BMRI.JK"]);
    }

    #[tokio::test]
    async fn test_add_deduplicates_canonical_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        std::fs::write(&path, "[]").unwrap();
        let watchlist = make_watchlist(&path);

        assert!(watchlist.add("BBRI").await.unwrap());
        assert!(!watchlist.add("BBRI.JK").await.unwrap());
        assert!(!watchlist.add("bbri").await.unwrap());

        assert_eq!(on_disk(&path), vec!["BBRI.JK"]);
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let watchlist = make_watchlist(&path);

        assert!(watchlist.add("TLKM").await.unwrap());
        assert_eq!(on_disk(&path), vec!["BBRI.JK", "BMRI.JK", "TLKM.JK"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let watchlist = make_watchlist(&path);

        assert!(watchlist.remove("bmri").await.unwrap());
        assert!(!watchlist.remove("BMRI.JK").await.unwrap());
        assert_eq!(on_disk(&path), vec!["BBRI.JK"]);
    }

    #[tokio::test]
    async fn test_invalid_ticker_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = make_watchlist(&dir.path().join("watchlist.json"));
        assert!(matches!(watchlist.add("  ").await, Err(StoreError::InvalidTicker(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        std::fs::write(&path, "[]").unwrap();
        let watchlist = Arc::new(make_watchlist(&path));

        let mut handles = Vec::new();
        for code in ["ASII", "TLKM", "UNVR", "ANTM", "INCO"] {
            let wl = Arc::clone(&watchlist);
            handles.push(tokio::spawn(async move { wl.add(code).await.unwrap() }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }

        assert_eq!(on_disk(&path).len(), 5);
    }
}
