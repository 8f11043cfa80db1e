use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::diary::DiaryEntry;

/// Process-local diary storage. Cloning shares the same entries.
#[derive(Debug, Clone, Default)]
pub struct DiaryStore {
    entries: Arc<RwLock<Vec<DiaryEntry>>>,
}

impl DiaryStore {
    pub async fn insert(&self, entry: DiaryEntry) {
        self.entries.write().await.push(entry);
    }

    /// Entries in insertion order.
    pub async fn list(&self) -> Vec<DiaryEntry> {
        self.entries.read().await.clone()
    }

    /// Removes the entry with `id`. Returns `false` and changes nothing when it is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }
}
