//! Application state: recording lifecycle, memo jobs, and feed
//! reconciliation. Everything here is UI-toolkit-free so the logic can be
//! tested without a terminal.

use memoterm::audio::{
    LiveMeter, RecordingSession, StopListeners, StopResult, StopSubscription,
};
use memoterm::card::MemoryCard;
use memoterm::config::AppConfig;
use memoterm::feed::{build_feed, FeedEntry, FeedGroup};
use memoterm::llm::CardModel;
use memoterm::log_debug;
use memoterm::optimistic::{CardPatch, CardPhase, OptimisticCard, OptimisticCards};
use memoterm::pipeline::{should_upload, start_memo_job, MemoJob, MemoJobMessage};
use memoterm::store::CardStore;
use memoterm::stt::SpeechToText;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Feed,
    Detail,
}

/// The feed-facing half of the app state: stored cards, optimistic entries,
/// and the grouped view derived from them.
pub struct FeedState {
    pub stored: Vec<MemoryCard>,
    pub optimistic: OptimisticCards,
    pub groups: Vec<FeedGroup>,
    pub selected: usize,
}

impl FeedState {
    pub fn new(stored: Vec<MemoryCard>) -> Self {
        let mut state = Self {
            stored,
            optimistic: OptimisticCards::new(),
            groups: Vec::new(),
            selected: 0,
        };
        state.rebuild();
        state
    }

    pub fn rebuild(&mut self) {
        self.groups = build_feed(&self.stored, &self.optimistic);
        let count = self.entry_count();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.entries.len()).sum()
    }

    pub fn selected_entry(&self) -> Option<&FeedEntry> {
        self.groups
            .iter()
            .flat_map(|group| group.entries.iter())
            .nth(self.selected)
    }

    pub fn select_next(&mut self) {
        let count = self.entry_count();
        if count > 0 && self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Show a pending placeholder for a capture that just started uploading.
    pub fn begin_upload(&mut self) -> Uuid {
        let card = OptimisticCard::placeholder();
        let id = card.id;
        self.optimistic.add_card(card);
        self.rebuild();
        id
    }

    /// Fold a saved server card into the placeholder: contents merge in
    /// place, the id swaps to the server id, and the entry is confirmed.
    pub fn apply_saved(&mut self, local_id: Uuid, card: &MemoryCard, refreshed: Vec<MemoryCard>) {
        self.optimistic
            .update_card(local_id, CardPatch::from_card(card));
        self.optimistic.replace_card_id(local_id, card.id);
        self.optimistic.set_phase(card.id, CardPhase::Confirmed);
        self.stored = refreshed;
        let stored_ids: Vec<Uuid> = self.stored.iter().map(|c| c.id).collect();
        self.optimistic.prune_confirmed(&stored_ids);
        self.rebuild();
    }

    /// Mark the placeholder failed; it stays until explicitly dismissed.
    pub fn apply_failed(&mut self, local_id: Uuid, message: String) {
        self.optimistic
            .set_phase(local_id, CardPhase::Failed(message));
        self.rebuild();
    }

    /// Dismiss a failed optimistic entry; other entries are left alone.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let dismissable = matches!(
            self.optimistic.get(id).map(|card| &card.phase),
            Some(CardPhase::Failed(_))
        );
        if dismissable {
            self.optimistic.remove_card(id);
            self.rebuild();
        }
        dismissable
    }

    pub fn remove_stored(&mut self, id: Uuid) {
        self.stored.retain(|card| card.id != id);
        self.rebuild();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Processing,
}

pub struct App {
    pub config: AppConfig,
    pub meter: LiveMeter,
    pub feed: FeedState,
    pub mode: Mode,
    pub status: String,
    pub should_quit: bool,

    store: Arc<dyn CardStore>,
    stt: Option<Arc<dyn SpeechToText + Send + Sync>>,
    model: Option<Arc<dyn CardModel + Send + Sync>>,

    listeners: StopListeners,
    _stop_feed: StopSubscription,
    stop_rx: Receiver<Arc<StopResult>>,
    session: Option<RecordingSession>,
    job: Option<(Uuid, MemoJob)>,
}

impl App {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn CardStore>,
        stt: Option<Arc<dyn SpeechToText + Send + Sync>>,
        model: Option<Arc<dyn CardModel + Send + Sync>>,
    ) -> anyhow::Result<Self> {
        let stored = store.list_recent()?;
        let listeners = StopListeners::new();
        // Stop results cross from the capture worker to the UI loop here.
        let (stop_tx, stop_rx) = mpsc::sync_channel::<Arc<StopResult>>(1);
        let stop_feed = listeners.subscribe(move |result| {
            let _ = stop_tx.try_send(result);
        });

        Ok(Self {
            config,
            meter: LiveMeter::new(),
            feed: FeedState::new(stored),
            mode: Mode::Feed,
            status: String::new(),
            should_quit: false,
            store,
            stt,
            model,
            listeners,
            _stop_feed: stop_feed,
            stop_rx,
            session: None,
            job: None,
        })
    }

    pub fn recording_state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else if self.job.is_some() {
            RecordingState::Processing
        } else {
            RecordingState::Idle
        }
    }

    /// Space bar: start a session, or ask the running one to stop.
    pub fn toggle_recording(&mut self) {
        match self.recording_state() {
            RecordingState::Recording => {
                if let Some(session) = &self.session {
                    session.stop();
                }
                self.status = "Stopping...".to_string();
            }
            RecordingState::Processing => {
                self.status = "Still working on the last memo".to_string();
            }
            RecordingState::Idle => self.start_recording(),
        }
    }

    fn start_recording(&mut self) {
        let options = self.config.session_options();
        // No-op required handler: the UI consumes results via its broadcast
        // subscription instead.
        match RecordingSession::start(options, self.meter.clone(), self.listeners.clone(), |_| {})
        {
            Ok(session) => {
                self.session = Some(session);
                self.status = "Recording... (space to stop)".to_string();
            }
            Err(err) => {
                log_debug(&format!("session_start_error: {err:#}"));
                self.status = format!("Couldn't start recording: {err}");
            }
        }
    }

    /// Drain worker messages; called every UI tick.
    pub fn poll_background(&mut self) {
        match self.stop_rx.try_recv() {
            Ok(result) => self.handle_stop(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        let message = match &self.job {
            Some((_, job)) => match job.receiver.try_recv() {
                Ok(message) => Some(message),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    Some(MemoJobMessage::Failed("Memo worker exited".to_string()))
                }
            },
            None => None,
        };
        if let Some(message) = message {
            if let Some((local_id, mut job)) = self.job.take() {
                if let Some(handle) = job.handle.take() {
                    let _ = handle.join();
                }
                self.apply_job_message(local_id, message);
            }
        }
    }

    fn handle_stop(&mut self, result: Arc<StopResult>) {
        self.session = None;
        self.meter.reset();

        if self.config.offline {
            self.status = format!(
                "Offline: discarded {:.1}s of audio (avg rms {:.4})",
                result.elapsed_ms as f32 / 1000.0,
                result.avg_rms
            );
            return;
        }
        if !should_upload(&result) {
            log_debug(&format!(
                "capture discarded: elapsed_ms={} avg_rms={:.5} too_quiet={} too_short={}",
                result.elapsed_ms, result.avg_rms, result.is_too_quiet, result.is_empty_or_too_short
            ));
            self.status.clear();
            return;
        }

        let (Some(stt), Some(model)) = (self.stt.clone(), self.model.clone()) else {
            self.status =
                "Set DEEPGRAM_API_KEY and OPENAI_API_KEY to save memos (or use --offline)"
                    .to_string();
            return;
        };

        let local_id = self.feed.begin_upload();
        let job = start_memo_job(result, stt, model, self.store.clone());
        self.job = Some((local_id, job));
        self.status = "Transcribing...".to_string();
    }

    fn apply_job_message(&mut self, local_id: Uuid, message: MemoJobMessage) {
        match message {
            MemoJobMessage::Saved(card) => {
                let refreshed = self.store.list_recent().unwrap_or_else(|err| {
                    log_debug(&format!("store_refresh_error: {err}"));
                    self.feed.stored.clone()
                });
                self.feed.apply_saved(local_id, &card, refreshed);
                self.status = format!("Saved \"{}\"", card.title);
            }
            MemoJobMessage::Failed(user_message) => {
                self.status = user_message.clone();
                self.feed.apply_failed(local_id, user_message);
            }
        }
    }

    /// Delete the selected stored card, or dismiss a failed optimistic entry.
    pub fn delete_selected(&mut self) {
        let Some(entry) = self.feed.selected_entry() else {
            return;
        };
        match entry {
            FeedEntry::Optimistic(card) => {
                let id = card.id;
                if self.feed.dismiss(id) {
                    self.status = "Dismissed".to_string();
                }
            }
            FeedEntry::Stored(card) => {
                let id = card.id;
                match self.store.delete(id) {
                    Ok(true) => {
                        self.feed.remove_stored(id);
                        self.status = "Deleted".to_string();
                    }
                    Ok(false) => {
                        self.feed.remove_stored(id);
                    }
                    Err(err) => {
                        log_debug(&format!("store_delete_error: {err}"));
                        self.status = "Couldn't delete that card".to_string();
                    }
                }
                if self.mode == Mode::Detail {
                    self.mode = Mode::Feed;
                }
            }
        }
    }

    pub fn open_detail(&mut self) {
        if self.feed.selected_entry().is_some() {
            self.mode = Mode::Detail;
        }
    }

    pub fn close_detail(&mut self) {
        self.mode = Mode::Feed;
    }

    pub fn quit(&mut self) {
        // Dropping the session releases the microphone before the terminal
        // is restored.
        self.session = None;
        if let Some((_, job)) = &self.job {
            job.cancel();
        }
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoterm::card::{CardContent, Mood};
    use memoterm::optimistic::CardPhase;

    fn saved_card(title: &str) -> MemoryCard {
        MemoryCard::from_content(
            "a transcript".to_string(),
            CardContent {
                title: title.to_string(),
                mood: Mood::Inspired,
                categories: vec!["ideas".to_string()],
                action_items: vec![],
            },
        )
    }

    #[test]
    fn begin_upload_shows_a_pending_placeholder() {
        let mut feed = FeedState::new(Vec::new());
        let id = feed.begin_upload();
        assert_eq!(feed.entry_count(), 1);
        assert_eq!(feed.optimistic.get(id).unwrap().phase, CardPhase::Pending);
    }

    #[test]
    fn saved_reconciliation_leaves_one_entry_with_the_server_id() {
        let mut feed = FeedState::new(Vec::new());
        let local_id = feed.begin_upload();
        let card = saved_card("Morning pages");
        feed.apply_saved(local_id, &card, vec![card.clone()]);
        // The confirmed optimistic entry is superseded by the stored copy.
        assert!(feed.optimistic.is_empty());
        assert_eq!(feed.entry_count(), 1);
        assert_eq!(feed.selected_entry().unwrap().id(), card.id);
        assert_eq!(feed.selected_entry().unwrap().title(), "Morning pages");
    }

    #[test]
    fn confirmed_entry_survives_until_store_refresh_contains_it() {
        let mut feed = FeedState::new(Vec::new());
        let local_id = feed.begin_upload();
        let card = saved_card("Kept");
        // Refresh that does not yet include the card: optimistic copy stays.
        feed.apply_saved(local_id, &card, Vec::new());
        assert_eq!(feed.optimistic.cards().len(), 1);
        assert_eq!(feed.optimistic.cards()[0].id, card.id);
        assert_eq!(feed.entry_count(), 1);
    }

    #[test]
    fn failed_entry_stays_until_dismissed() {
        let mut feed = FeedState::new(Vec::new());
        let local_id = feed.begin_upload();
        feed.apply_failed(local_id, "Couldn't hear audio".to_string());
        assert_eq!(feed.entry_count(), 1);
        assert!(!feed.dismiss(Uuid::new_v4()));
        assert!(feed.dismiss(local_id));
        assert_eq!(feed.entry_count(), 0);
    }

    #[test]
    fn pending_entry_cannot_be_dismissed() {
        let mut feed = FeedState::new(Vec::new());
        let local_id = feed.begin_upload();
        assert!(!feed.dismiss(local_id));
        assert_eq!(feed.entry_count(), 1);
    }

    #[test]
    fn selection_is_clamped_after_rebuilds() {
        let card = saved_card("Only one");
        let mut feed = FeedState::new(vec![card.clone()]);
        feed.select_next();
        assert_eq!(feed.selected, 0);
        let local_id = feed.begin_upload();
        feed.select_next();
        assert_eq!(feed.selected, 1);
        feed.apply_failed(local_id, "failed".to_string());
        assert!(feed.dismiss(local_id));
        assert_eq!(feed.selected, 0);
        feed.remove_stored(card.id);
        assert_eq!(feed.entry_count(), 0);
        assert!(feed.selected_entry().is_none());
    }
}
