//! In-flight cards shown in the feed before the server copy exists.
//!
//! Each entry carries an explicit phase; a failed entry keeps its failure
//! message and stays visible until the user dismisses it.

use crate::card::{MemoryCard, Mood};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle of an optimistic entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardPhase {
    /// The pipeline is still working on this memo.
    Pending,
    /// The server copy exists; the entry disappears once the stored list
    /// supersedes it.
    Confirmed,
    /// The pipeline failed; the message is shown until dismissed.
    Failed(String),
}

/// A locally displayed card that may not have a server copy yet.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimisticCard {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub transcript: String,
    pub mood: Option<Mood>,
    pub categories: Vec<String>,
    pub action_items: Vec<String>,
    pub phase: CardPhase,
}

impl OptimisticCard {
    /// Neutral pending placeholder shown the moment an upload starts.
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: "New voice memo".to_string(),
            transcript: String::new(),
            mood: None,
            categories: Vec::new(),
            action_items: Vec::new(),
            phase: CardPhase::Pending,
        }
    }
}

/// Field-wise update applied to an existing entry; `None` leaves the field
/// untouched.
#[derive(Clone, Debug, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub transcript: Option<String>,
    pub mood: Option<Mood>,
    pub categories: Option<Vec<String>>,
    pub action_items: Option<Vec<String>>,
}

impl CardPatch {
    /// Patch carrying everything from a saved server card.
    pub fn from_card(card: &MemoryCard) -> Self {
        Self {
            title: Some(card.title.clone()),
            transcript: Some(card.transcript.clone()),
            mood: Some(card.mood),
            categories: Some(card.categories.clone()),
            action_items: Some(card.action_items.clone()),
        }
    }
}

/// Ordered list of in-flight cards, newest first. Ids are unique; adding an
/// existing id replaces the old entry.
#[derive(Debug, Default)]
pub struct OptimisticCards {
    cards: Vec<OptimisticCard>,
}

impl OptimisticCards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[OptimisticCard] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&OptimisticCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// True when any entry's id matches, used by the feed merge to drop the
    /// stored duplicate.
    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Insert at the front. If the id already exists the old entry is
    /// removed first, keeping ids unique.
    pub fn add_card(&mut self, card: OptimisticCard) {
        self.cards.retain(|existing| existing.id != card.id);
        self.cards.insert(0, card);
    }

    /// Merge a patch into the entry with `id`; unknown ids are a no-op.
    pub fn update_card(&mut self, id: Uuid, patch: CardPatch) {
        let Some(card) = self.cards.iter_mut().find(|card| card.id == id) else {
            return;
        };
        if let Some(title) = patch.title {
            card.title = title;
        }
        if let Some(transcript) = patch.transcript {
            card.transcript = transcript;
        }
        if let Some(mood) = patch.mood {
            card.mood = Some(mood);
        }
        if let Some(categories) = patch.categories {
            card.categories = categories;
        }
        if let Some(action_items) = patch.action_items {
            card.action_items = action_items;
        }
    }

    /// Swap an entry's identity in place, keeping its position. Used when the
    /// server id arrives for a locally minted placeholder. Any other entry
    /// already holding `new` is evicted first, keeping ids unique.
    pub fn replace_card_id(&mut self, old: Uuid, new: Uuid) {
        if old == new || !self.contains(old) {
            return;
        }
        self.cards.retain(|card| card.id != new);
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == old) {
            card.id = new;
        }
    }

    pub fn set_phase(&mut self, id: Uuid, phase: CardPhase) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == id) {
            card.phase = phase;
        }
    }

    pub fn remove_card(&mut self, id: Uuid) {
        self.cards.retain(|card| card.id != id);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Drop confirmed entries whose id now appears in the stored list.
    pub fn prune_confirmed(&mut self, stored_ids: &[Uuid]) {
        self.cards.retain(|card| {
            !(card.phase == CardPhase::Confirmed && stored_ids.contains(&card.id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_pending_with_neutral_title() {
        let card = OptimisticCard::placeholder();
        assert_eq!(card.phase, CardPhase::Pending);
        assert_eq!(card.title, "New voice memo");
    }

    #[test]
    fn add_card_inserts_at_the_front() {
        let mut cards = OptimisticCards::new();
        let first = OptimisticCard::placeholder();
        let second = OptimisticCard::placeholder();
        cards.add_card(first.clone());
        cards.add_card(second.clone());
        assert_eq!(cards.cards()[0].id, second.id);
        assert_eq!(cards.cards()[1].id, first.id);
    }

    #[test]
    fn adding_a_duplicate_id_replaces_the_old_entry() {
        let mut cards = OptimisticCards::new();
        let mut card = OptimisticCard::placeholder();
        cards.add_card(card.clone());
        card.title = "Updated".to_string();
        cards.add_card(card.clone());
        assert_eq!(cards.cards().len(), 1);
        assert_eq!(cards.cards()[0].title, "Updated");
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let mut cards = OptimisticCards::new();
        let card = OptimisticCard::placeholder();
        let id = card.id;
        cards.add_card(card);
        cards.update_card(
            id,
            CardPatch {
                title: Some("Morning thoughts".to_string()),
                mood: Some(Mood::Hopeful),
                ..CardPatch::default()
            },
        );
        let updated = cards.get(id).unwrap();
        assert_eq!(updated.title, "Morning thoughts");
        assert_eq!(updated.mood, Some(Mood::Hopeful));
        assert!(updated.transcript.is_empty());
        assert_eq!(updated.phase, CardPhase::Pending);
    }

    #[test]
    fn update_of_unknown_id_is_a_no_op() {
        let mut cards = OptimisticCards::new();
        cards.add_card(OptimisticCard::placeholder());
        cards.update_card(
            Uuid::new_v4(),
            CardPatch {
                title: Some("ghost".to_string()),
                ..CardPatch::default()
            },
        );
        assert_ne!(cards.cards()[0].title, "ghost");
    }

    #[test]
    fn add_then_replace_id_leaves_exactly_one_entry() {
        let mut cards = OptimisticCards::new();
        let card = OptimisticCard::placeholder();
        let local_id = card.id;
        cards.add_card(card);
        let server_id = Uuid::new_v4();
        cards.replace_card_id(local_id, server_id);
        assert_eq!(cards.cards().len(), 1);
        assert!(cards.contains(server_id));
        assert!(!cards.contains(local_id));
    }

    #[test]
    fn replace_id_evicts_an_existing_entry_with_the_new_id() {
        let mut cards = OptimisticCards::new();
        let mut stale = OptimisticCard::placeholder();
        stale.title = "stale".to_string();
        let mut fresh = OptimisticCard::placeholder();
        fresh.title = "fresh".to_string();
        let stale_id = stale.id;
        let fresh_id = fresh.id;
        cards.add_card(stale);
        cards.add_card(fresh);
        cards.replace_card_id(fresh_id, stale_id);
        assert_eq!(cards.cards().len(), 1);
        assert_eq!(cards.get(stale_id).unwrap().title, "fresh");
    }

    #[test]
    fn replace_id_to_itself_keeps_the_entry() {
        let mut cards = OptimisticCards::new();
        let card = OptimisticCard::placeholder();
        let id = card.id;
        cards.add_card(card);
        cards.replace_card_id(id, id);
        assert_eq!(cards.cards().len(), 1);
        assert!(cards.contains(id));
    }

    #[test]
    fn failed_phase_keeps_its_message() {
        let mut cards = OptimisticCards::new();
        let card = OptimisticCard::placeholder();
        let id = card.id;
        cards.add_card(card);
        cards.set_phase(id, CardPhase::Failed("Couldn't reach server".to_string()));
        match &cards.get(id).unwrap().phase {
            CardPhase::Failed(message) => assert_eq!(message, "Couldn't reach server"),
            other => panic!("unexpected phase {other:?}"),
        }
    }

    #[test]
    fn prune_drops_only_confirmed_entries_present_in_store() {
        let mut cards = OptimisticCards::new();
        let confirmed = OptimisticCard::placeholder();
        let pending = OptimisticCard::placeholder();
        let confirmed_id = confirmed.id;
        cards.add_card(confirmed);
        cards.add_card(pending.clone());
        cards.set_phase(confirmed_id, CardPhase::Confirmed);
        cards.prune_confirmed(&[confirmed_id, pending.id]);
        assert_eq!(cards.cards().len(), 1);
        assert_eq!(cards.cards()[0].id, pending.id);
    }

    #[test]
    fn remove_and_clear() {
        let mut cards = OptimisticCards::new();
        let card = OptimisticCard::placeholder();
        let id = card.id;
        cards.add_card(card);
        cards.add_card(OptimisticCard::placeholder());
        cards.remove_card(id);
        assert_eq!(cards.cards().len(), 1);
        cards.clear();
        assert!(cards.is_empty());
    }
}
