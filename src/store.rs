//! Card persistence.
//!
//! A single JSON file keeps the whole card list; writes go through a temp
//! file and rename so a crash never leaves a half-written store behind.

use crate::card::{CardContent, MemoryCard};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// How many cards `list_recent` returns at most.
pub const RECENT_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Seam between the pipeline/feed and persistence.
pub trait CardStore: Send + Sync {
    /// Persist a new card, minting its id and timestamp, and return the
    /// stored record.
    fn insert(&self, transcript: String, content: CardContent) -> Result<MemoryCard, StoreError>;

    /// Newest first, capped at [`RECENT_LIMIT`].
    fn list_recent(&self) -> Result<Vec<MemoryCard>, StoreError>;

    /// Remove a card; returns whether it existed.
    fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// File-backed store holding the full list in memory behind a mutex.
pub struct JsonCardStore {
    path: PathBuf,
    cards: Mutex<Vec<MemoryCard>>,
}

impl JsonCardStore {
    /// Open or create the store at `path`. A missing file is an empty store;
    /// a corrupt file is an error so user data is never silently clobbered.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cards = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            cards: Mutex::new(cards),
        })
    }

    fn persist(&self, cards: &[MemoryCard]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = temp_sibling(&self.path);
        fs::write(&tmp, serde_json::to_vec_pretty(cards)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cards.json".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

impl CardStore for JsonCardStore {
    fn insert(&self, transcript: String, content: CardContent) -> Result<MemoryCard, StoreError> {
        let mut cards = self.cards.lock().map_err(|_| StoreError::Poisoned)?;
        let card = MemoryCard {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transcript,
            title: content.title,
            mood: content.mood,
            categories: content.categories,
            action_items: content.action_items,
        };
        cards.push(card.clone());
        self.persist(&cards)?;
        Ok(card)
    }

    fn list_recent(&self) -> Result<Vec<MemoryCard>, StoreError> {
        let cards = self.cards.lock().map_err(|_| StoreError::Poisoned)?;
        let mut recent: Vec<MemoryCard> = cards.clone();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(RECENT_LIMIT);
        Ok(recent)
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut cards = self.cards.lock().map_err(|_| StoreError::Poisoned)?;
        let before = cards.len();
        cards.retain(|card| card.id != id);
        let removed = cards.len() != before;
        if removed {
            self.persist(&cards)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Mood;
    use chrono::Duration;

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("memoterm-store-{tag}-{}.json", Uuid::new_v4()))
    }

    fn content(title: &str) -> CardContent {
        CardContent {
            title: title.to_string(),
            mood: Mood::Content,
            categories: vec!["test".to_string()],
            action_items: vec![],
        }
    }

    #[test]
    fn missing_file_opens_empty() {
        let path = scratch_path("missing");
        let store = JsonCardStore::open(&path).unwrap();
        assert!(store.list_recent().unwrap().is_empty());
    }

    #[test]
    fn insert_persists_across_reopen() {
        let path = scratch_path("reopen");
        let inserted = {
            let store = JsonCardStore::open(&path).unwrap();
            store.insert("hello world".to_string(), content("First")).unwrap()
        };
        let store = JsonCardStore::open(&path).unwrap();
        let cards = store.list_recent().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, inserted.id);
        assert_eq!(cards[0].title, "First");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn list_recent_is_newest_first_and_capped() {
        let path = scratch_path("cap");
        let store = JsonCardStore::open(&path).unwrap();
        let now = Utc::now();
        {
            let mut cards = store.cards.lock().unwrap();
            for i in 0..RECENT_LIMIT + 5 {
                cards.push(MemoryCard {
                    id: Uuid::new_v4(),
                    created_at: now - Duration::minutes(i as i64),
                    transcript: String::new(),
                    title: format!("card {i}"),
                    mood: Mood::Mixed,
                    categories: vec![],
                    action_items: vec![],
                });
            }
        }
        let recent = store.list_recent().unwrap();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0].title, "card 0");
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn delete_reports_whether_the_card_existed() {
        let path = scratch_path("delete");
        let store = JsonCardStore::open(&path).unwrap();
        let card = store.insert("t".to_string(), content("Doomed")).unwrap();
        assert!(store.delete(card.id).unwrap());
        assert!(!store.delete(card.id).unwrap());
        assert!(store.list_recent().unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = scratch_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonCardStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
        let _ = fs::remove_file(&path);
    }
}
