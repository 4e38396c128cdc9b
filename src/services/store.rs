use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::FieldError;

/// An entity served by one of the CRUD services
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    /// Validated fields for a new record
    type Draft: Send;

    /// Validated fields for a partial update
    type Patch: Send;

    /// Display name used in messages, e.g. `User`
    const KIND: &'static str;

    fn id(&self) -> u64;

    fn from_draft(id: u64, draft: Self::Draft) -> Self;

    /// Apply a partial update. The id never changes.
    fn apply(&mut self, patch: Self::Patch);

    fn parse_draft(body: &Value) -> Result<Self::Draft, Vec<FieldError>>;

    fn parse_patch(body: &Value) -> Result<Self::Patch, Vec<FieldError>>;
}

/// In-memory record collection in insertion order
pub struct RecordStore<T> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> RecordStore<T> {
    pub fn new(seed: Vec<T>) -> Self {
        Self {
            records: RwLock::new(seed),
        }
    }

    pub async fn list(&self) -> Vec<T> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: u64) -> Option<T> {
        self.records.read().await.iter().find(|r| r.id() == id).cloned()
    }

    /// Insert with the next id (highest existing id + 1)
    pub async fn insert(&self, draft: T::Draft) -> T {
        let mut records = self.records.write().await;
        let id = records.iter().map(Record::id).max().unwrap_or(0) + 1;
        let record = T::from_draft(id, draft);
        records.push(record.clone());
        record
    }

    pub async fn update(&self, id: u64, patch: T::Patch) -> Option<T> {
        let mut records = self.records.write().await;
        let record = records.iter_mut().find(|r| r.id() == id)?;
        record.apply(patch);
        Some(record.clone())
    }

    pub async fn remove(&self, id: u64) -> bool {
        let mut records = self.records.write().await;
        match records.iter().position(|r| r.id() == id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Note {
        id: u64,
        text: String,
    }

    impl Record for Note {
        type Draft = String;
        type Patch = Option<String>;
        const KIND: &'static str = "Note";

        fn id(&self) -> u64 {
            self.id
        }

        fn from_draft(id: u64, text: String) -> Self {
            Note { id, text }
        }

        fn apply(&mut self, patch: Option<String>) {
            if let Some(text) = patch {
                self.text = text;
            }
        }

        fn parse_draft(_body: &Value) -> Result<String, Vec<FieldError>> {
            Ok(String::new())
        }

        fn parse_patch(_body: &Value) -> Result<Option<String>, Vec<FieldError>> {
            Ok(None)
        }
    }

    fn note(id: u64, text: &str) -> Note {
        Note { id, text: text.to_string() }
    }

    #[tokio::test]
    async fn test_insert_uses_max_id() {
        let store = RecordStore::new(vec![note(1, "a"), note(2, "b")]);
        assert!(store.remove(1).await);

        // length + 1 would collide with the remaining id 2
        let created = store.insert("c".to_string()).await;
        assert_eq!(created.id, 3);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_insert_into_empty_store() {
        let store: RecordStore<Note> = RecordStore::new(Vec::new());
        assert_eq!(store.insert("first".to_string()).await.id, 1);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let store = RecordStore::new(vec![note(1, "a")]);

        let updated = store.update(1, Some("z".to_string())).await.unwrap();
        assert_eq!(updated, note(1, "z"));
        assert_eq!(store.get(1).await, Some(note(1, "z")));

        assert!(store.update(9, None).await.is_none());
        assert!(!store.remove(9).await);
        assert!(store.remove(1).await);
        assert!(store.get(1).await.is_none());
        assert!(store.list().await.is_empty());
    }
}
