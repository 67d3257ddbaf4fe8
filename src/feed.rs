//! Chronological feed grouping.
//!
//! Stored cards fall into Today / Yesterday / Earlier by local calendar day;
//! optimistic entries are prepended to Today. A card whose id appears in both
//! lists is shown once, from the optimistic side.

use crate::card::MemoryCard;
use crate::optimistic::{OptimisticCard, OptimisticCards};
use chrono::{DateTime, Local, NaiveDate, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedSection {
    Today,
    Yesterday,
    Earlier,
}

impl FeedSection {
    pub fn label(&self) -> &'static str {
        match self {
            FeedSection::Today => "Today",
            FeedSection::Yesterday => "Yesterday",
            FeedSection::Earlier => "Earlier",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedEntry {
    Optimistic(OptimisticCard),
    Stored(MemoryCard),
}

impl FeedEntry {
    pub fn title(&self) -> &str {
        match self {
            FeedEntry::Optimistic(card) => &card.title,
            FeedEntry::Stored(card) => &card.title,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        match self {
            FeedEntry::Optimistic(card) => card.id,
            FeedEntry::Stored(card) => card.id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedGroup {
    pub section: FeedSection,
    pub entries: Vec<FeedEntry>,
}

/// Which section a card day belongs to relative to `today`.
pub fn section_for(day: NaiveDate, today: NaiveDate) -> FeedSection {
    if day == today {
        FeedSection::Today
    } else if day.succ_opt() == Some(today) {
        FeedSection::Yesterday
    } else {
        FeedSection::Earlier
    }
}

/// Group stored and optimistic cards using the local timezone.
pub fn build_feed(stored: &[MemoryCard], optimistic: &OptimisticCards) -> Vec<FeedGroup> {
    let today = Local::now().date_naive();
    build_feed_on(stored, optimistic, today, |ts| {
        ts.with_timezone(&Local).date_naive()
    })
}

/// Grouping core, pure over the day extractor so tests control the calendar.
pub fn build_feed_on(
    stored: &[MemoryCard],
    optimistic: &OptimisticCards,
    today: NaiveDate,
    day_of: impl Fn(&DateTime<Utc>) -> NaiveDate,
) -> Vec<FeedGroup> {
    let mut today_entries: Vec<FeedEntry> = optimistic
        .cards()
        .iter()
        .cloned()
        .map(FeedEntry::Optimistic)
        .collect();
    let mut yesterday_entries = Vec::new();
    let mut earlier_entries = Vec::new();

    for card in stored {
        // The optimistic copy wins while it exists.
        if optimistic.contains(card.id) {
            continue;
        }
        let entry = FeedEntry::Stored(card.clone());
        match section_for(day_of(&card.created_at), today) {
            FeedSection::Today => today_entries.push(entry),
            FeedSection::Yesterday => yesterday_entries.push(entry),
            FeedSection::Earlier => earlier_entries.push(entry),
        }
    }

    let mut groups = Vec::new();
    for (section, entries) in [
        (FeedSection::Today, today_entries),
        (FeedSection::Yesterday, yesterday_entries),
        (FeedSection::Earlier, earlier_entries),
    ] {
        if !entries.is_empty() {
            groups.push(FeedGroup { section, entries });
        }
    }
    groups
}
