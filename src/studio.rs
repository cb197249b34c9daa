use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::batch::{BatchOrchestrator, BatchRun};
use crate::config::StudioConfig;
use crate::edit::{EditOrchestrator, EditOutcome};
use crate::error::{Result, StudioError};
use crate::events::StudioEvent;
use crate::menu;
use crate::session::Session;
use crate::types::{Dish, PhotoStyle, SessionSnapshot};
use crate::ImageGenerator;

/// One menu-photography session: the loaded menu, the selected style and
/// the images generated from them.
///
/// `Studio` wires a [`Session`] to a [`BatchOrchestrator`] and an
/// [`EditOrchestrator`] that share the same generator. Every method takes
/// `&self`; wrap it in an `Arc` to drive it from several tasks.
///
/// # Example
///
/// ```no_run
/// use menu_photographer::{GeminiClient, GeminiConfig, Studio};
///
/// # async fn example() -> menu_photographer::Result<()> {
/// let studio = Studio::new(GeminiClient::new(GeminiConfig::from_env()?));
/// studio.load_menu("Classic Burger\nCaesar Salad")?;
/// let summary = studio.start_batch()?.wait().await?;
/// println!("{} of {} images generated", summary.succeeded, summary.total);
/// # Ok(())
/// # }
/// ```
pub struct Studio<G: ImageGenerator> {
    session: Arc<Session>,
    batch: BatchOrchestrator<G>,
    edits: EditOrchestrator<G>,
    dishes: Mutex<Vec<Dish>>,
    style: Mutex<PhotoStyle>,
}

impl<G: ImageGenerator> Studio<G> {
    pub fn new(generator: G) -> Self {
        Self::with_config(generator, StudioConfig::default())
    }

    pub fn with_config(generator: G, config: StudioConfig) -> Self {
        let generator = Arc::new(generator);
        let session = Arc::new(Session::new(config.event_capacity));
        Self {
            batch: BatchOrchestrator::new(Arc::clone(&generator), Arc::clone(&session)),
            edits: EditOrchestrator::new(generator, Arc::clone(&session)),
            session,
            dishes: Mutex::new(Vec::new()),
            style: Mutex::new(config.default_style),
        }
    }

    fn dishes_mut(&self) -> MutexGuard<'_, Vec<Dish>> {
        self.dishes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the menu with the dishes in `text`, one per non-blank line.
    ///
    /// Previously generated images and the global error are cleared.
    /// Returns the number of dishes loaded.
    pub fn load_menu(&self, text: &str) -> Result<usize> {
        let dishes = menu::dishes_from_lines(menu::parse_menu(text));
        self.replace_dishes(dishes)
    }

    /// Like [`load_menu`](Self::load_menu), reading a `.txt` file.
    pub fn load_menu_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let lines = menu::load_menu_file(path.as_ref())?;
        self.replace_dishes(menu::dishes_from_lines(lines))
    }

    fn replace_dishes(&self, dishes: Vec<Dish>) -> Result<usize> {
        let mut current = self.dishes_mut();
        self.session.clear()?;
        *current = dishes;
        tracing::info!(dishes = current.len(), "menu loaded");
        Ok(current.len())
    }

    pub fn dishes(&self) -> Vec<Dish> {
        self.dishes_mut().clone()
    }

    pub fn select_style(&self, style: PhotoStyle) {
        *self.style.lock().unwrap_or_else(PoisonError::into_inner) = style;
    }

    pub fn style(&self) -> PhotoStyle {
        *self.style.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate one image per loaded dish in the selected style.
    ///
    /// The menu stays locked until the batch has claimed the session, so a
    /// concurrent [`load_menu`](Self::load_menu) either lands before the
    /// batch or is rejected.
    pub fn start_batch(&self) -> Result<BatchRun> {
        let dishes = self.dishes_mut();
        if dishes.is_empty() {
            return Err(StudioError::Validation("Please upload a menu first.".into()));
        }
        self.batch.generate_batch(dishes.clone(), self.style())
    }

    /// Edit `item_id` from an explicit base image. See
    /// [`EditOrchestrator::edit_item`].
    pub async fn edit_item(
        &self,
        item_id: &str,
        image_data: &str,
        mime_type: &str,
        edit_prompt: &str,
    ) -> Result<EditOutcome> {
        self.edits
            .edit_item(item_id, image_data, mime_type, edit_prompt)
            .await
    }

    /// Edit `item_id` from the image it currently shows.
    pub async fn request_edit(&self, item_id: &str, edit_prompt: &str) -> Result<EditOutcome> {
        self.edits.edit_current(item_id, edit_prompt).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.session.subscribe()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
