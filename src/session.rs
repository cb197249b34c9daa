use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::{Result, StudioError};
use crate::events::StudioEvent;
use crate::types::{Dish, GeneratedImageItem, SessionSnapshot};

#[derive(Debug, Default)]
struct SessionState {
    items: Vec<GeneratedImageItem>,
    global_error: Option<String>,
    generating_since: Option<DateTime<Utc>>,
    /// Bumped whenever the item collection is replaced. Results computed
    /// against an older epoch are discarded.
    epoch: u64,
}

/// In-memory state of one photo session.
///
/// Holds the ordered generated items, the batch-global error and the
/// "generation in progress" marker. Readers get clones; every mutation is
/// crate-private and made by [`BatchOrchestrator`](crate::batch::BatchOrchestrator)
/// or [`EditOrchestrator`](crate::edit::EditOrchestrator). Each transition is
/// also published to [`subscribe()`](Self::subscribe) receivers.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    events: broadcast::Sender<StudioEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Session {
    /// Create an empty session whose event channel buffers `event_capacity` events.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            items: state.items.clone(),
            global_error: state.global_error.clone(),
            generating: state.generating_since.is_some(),
            generating_since: state.generating_since,
        }
    }

    pub fn items(&self) -> Vec<GeneratedImageItem> {
        self.state().items.clone()
    }

    pub fn item(&self, id: &str) -> Option<GeneratedImageItem> {
        self.state().items.iter().find(|i| i.id == id).cloned()
    }

    pub fn global_error(&self) -> Option<String> {
        self.state().global_error.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.state().generating_since.is_some()
    }

    /// When the running batch started, or `None` if no batch is running.
    pub fn generating_since(&self) -> Option<DateTime<Utc>> {
        self.state().generating_since
    }

    /// Receive every transition made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: StudioEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Drop all items, e.g. because a new menu replaced the dishes.
    pub(crate) fn clear(&self) -> Result<()> {
        let mut state = self.state();
        if state.generating_since.is_some() {
            return Err(StudioError::Validation(
                "Cannot replace the menu while images are being generated.".into(),
            ));
        }
        state.items.clear();
        state.global_error = None;
        state.epoch += 1;
        Ok(())
    }

    /// Replace the collection for a new batch. Returns the batch epoch.
    pub(crate) fn begin_batch(&self, started_at: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state();
        if state.generating_since.is_some() {
            return Err(StudioError::Validation(
                "Image generation is already in progress.".into(),
            ));
        }
        state.items.clear();
        state.global_error = None;
        state.generating_since = Some(started_at);
        state.epoch += 1;
        Ok(state.epoch)
    }

    /// Append the item for `dish` and move it to `Loading`.
    pub(crate) fn push_loading(
        &self,
        epoch: u64,
        dish: &Dish,
        prompt: String,
    ) -> Option<GeneratedImageItem> {
        let mut state = self.state();
        if state.epoch != epoch {
            return None;
        }
        let mut item = GeneratedImageItem::new(dish, prompt);
        item.begin_loading();
        state.items.push(item.clone());
        Some(item)
    }

    pub(crate) fn finish_batch(&self, epoch: u64) {
        let mut state = self.state();
        if state.epoch == epoch {
            state.generating_since = None;
        }
    }

    /// Move an existing item to `Loading` for an edit. Returns the epoch
    /// and the loading item, which still carries its previous image.
    ///
    /// Unless the caller brings its own base image, the item must already
    /// have one.
    pub(crate) fn begin_edit(
        &self,
        id: &str,
        has_base_image: bool,
    ) -> Result<(u64, GeneratedImageItem)> {
        let mut state = self.state();
        let epoch = state.epoch;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StudioError::NotFound(id.to_string()))?;

        if item.is_loading() {
            return Err(StudioError::Validation(format!(
                "\"{}\" is still loading; wait for it to finish before editing.",
                item.dish_name
            )));
        }
        if !has_base_image && !item.has_image() {
            return Err(StudioError::Validation(format!(
                "\"{}\" has no image to edit yet.",
                item.dish_name
            )));
        }

        item.begin_loading();
        Ok((epoch, item.clone()))
    }

    /// Resolve a loading item successfully. `prompt` replaces the current
    /// prompt when given. Returns `None` if the item is gone or stale.
    pub(crate) fn mark_ready(
        &self,
        epoch: u64,
        id: &str,
        image_data: String,
        prompt: Option<String>,
    ) -> Option<GeneratedImageItem> {
        let mut state = self.state();
        if state.epoch != epoch {
            return None;
        }
        let item = state.items.iter_mut().find(|i| i.id == id)?;
        item.complete(image_data, prompt);
        Some(item.clone())
    }

    /// Resolve a loading item as failed, keeping its image and prompts.
    /// `global_error` overwrites the batch-global message when given.
    pub(crate) fn mark_failed(
        &self,
        epoch: u64,
        id: &str,
        error: String,
        global_error: Option<String>,
    ) -> Option<GeneratedImageItem> {
        let mut state = self.state();
        if state.epoch != epoch {
            return None;
        }
        if global_error.is_some() {
            state.global_error = global_error;
        }
        let item = state.items.iter_mut().find(|i| i.id == id)?;
        item.fail(error);
        Some(item.clone())
    }

    /// Fail an item whose operation was abandoned mid-flight. No-op unless
    /// the item is still `Loading` in the same epoch.
    pub(crate) fn abandon(
        &self,
        epoch: u64,
        id: &str,
        error: String,
    ) -> Option<GeneratedImageItem> {
        let mut state = self.state();
        if state.epoch != epoch {
            return None;
        }
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id && i.is_loading())?;
        item.fail(error);
        Some(item.clone())
    }
}
