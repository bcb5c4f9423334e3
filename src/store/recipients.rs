//! # store::recipients
//!
//! Registered chat ids. Registration is idempotent: the first registration
//! wins and a repeat is a no-op.

use std::sync::Arc;

use tracing::info;

use super::{GuardedList, ListStore};
use crate::error::StoreError;
use crate::models::ChatId;

pub struct Recipients {
    list: GuardedList<ChatId>,
}

impl Recipients {
    pub fn new(store: Arc<dyn ListStore<ChatId>>) -> Self {
        Self { list: GuardedList::new("recipients", store, Vec::new()) }
    }

    pub async fn list(&self) -> Result<Vec<ChatId>, StoreError> {
        let mut ids = self.list.load().await?;
        dedup(&mut ids);
        Ok(ids)
    }

    /// `true` if the chat was newly registered.
    pub async fn register(&self, chat_id: ChatId) -> Result<bool, StoreError> {
        let guard = self.list.lock().await;
        let mut ids = self.list.load_locked(&guard).await?;
        if ids.contains(&chat_id) {
            return Ok(false);
        }

        ids.push(chat_id);
        self.list.save_locked(&guard, &ids).await?;
        info!(chat_id, "📝 Recipient registered");
        Ok(true)
    }

    /// `true` if the chat was registered and is now removed.
    pub async fn unregister(&self, chat_id: ChatId) -> Result<bool, StoreError> {
        let guard = self.list.lock().await;
        let mut ids = self.list.load_locked(&guard).await?;
        let before = ids.len();
        ids.retain(|id| *id != chat_id);
        if ids.len() == before {
            return Ok(false);
        }

        self.list.save_locked(&guard, &ids).await?;
        info!(chat_id, "Recipient unregistered");
        Ok(true)
    }
}

fn dedup(ids: &mut Vec<ChatId>) {
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_ids.json");
        let recipients = Recipients::new(Arc::new(JsonFileStore::<ChatId>::new(&path)));

        assert!(recipients.register(1001).await.unwrap());
        assert!(recipients.register(-2002).await.unwrap());
        assert!(!recipients.register(1001).await.unwrap());

        assert_eq!(recipients.list().await.unwrap(), vec![1001, -2002]);
    }

    #[tokio::test]
    async fn test_unregister() {
        let dir = tempfile::tempdir().unwrap();
        let recipients = Recipients::new(Arc::new(JsonFileStore::<ChatId>::new(dir.path().join("ids.json"))));

        recipients.register(7).await.unwrap();
        assert!(recipients.unregister(7).await.unwrap());
        assert!(!recipients.unregister(7).await.unwrap());
        assert!(recipients.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_resets_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_ids.json");
        std::fs::write(&path, "not-json").unwrap();
        let recipients = Recipients::new(Arc::new(JsonFileStore::<ChatId>::new(&path)));

        assert!(recipients.list().await.unwrap().is_empty());
        assert!(recipients.register(5).await.unwrap());
        assert_eq!(recipients.list().await.unwrap(), vec![5]);
    }
}
