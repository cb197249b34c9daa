//! # Menu Photographer
//!
//! Turn a plain-text restaurant menu into a set of AI-generated food photos,
//! then refine any of them with follow-up text prompts.
//!
//! ## Features
//!
//! - **Sequential batch generation**: one image per dish, strictly in menu
//!   order, with a lazy stream of per-item transition events
//! - **Partial-failure semantics**: a failing dish is recorded on its item
//!   and in the batch-global error, and the batch carries on
//! - **Non-destructive edits**: an edit replaces the image and current
//!   prompt only on success; the original prompt is never touched
//! - **Owned session state**: all mutation goes through the two
//!   orchestrators; readers get snapshots or subscribe to events
//! - **Gemini client**: Imagen for text-to-image, Gemini Flash Image for
//!   edits, images exchanged as `data:` URIs
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use menu_photographer::{GeminiClient, GeminiConfig, PhotoStyle, Studio, StudioEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new(GeminiConfig::from_env()?);
//!     let studio = Studio::new(client);
//!
//!     studio.load_menu("Classic Burger\nMargherita Pizza")?;
//!     studio.select_style(PhotoStyle::RusticDark);
//!
//!     let mut run = studio.start_batch()?;
//!     while let Some(event) = run.next().await {
//!         if let StudioEvent::ItemFailed { item, .. } = event {
//!             eprintln!("{} failed: {:?}", item.dish_name, item.error_message);
//!         }
//!     }
//!
//!     let first = studio.snapshot().items[0].id.clone();
//!     studio.request_edit(&first, "make it brighter").await?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod edit;
pub mod error;
pub mod events;
pub mod image;
pub mod menu;
pub mod prompt;
pub mod session;
pub mod studio;
pub mod types;

pub use batch::{BatchOrchestrator, BatchRun};
pub use client::GeminiClient;
pub use config::{GeminiConfig, GeminiConfigBuilder, StudioConfig, StudioConfigBuilder};
pub use edit::{EditOrchestrator, EditOutcome};
pub use error::{Result, StudioError};
pub use events::{Operation, StudioEvent};
pub use image::EncodedImage;
pub use session::Session;
pub use studio::Studio;
pub use types::{
    BatchSummary, Dish, GeneratedImageItem, LifecycleState, PhotoStyle, SessionSnapshot,
};

/// The external image service the orchestrators drive.
///
/// Both operations exchange images as `data:<mime>;base64,<payload>` URIs.
/// Absence of an image in the service response must be reported as an
/// error, never as an empty success.
///
/// # Example
///
/// ```
/// use menu_photographer::{ImageGenerator, Result};
///
/// struct Placeholder;
///
/// impl ImageGenerator for Placeholder {
///     async fn generate(&self, _prompt: &str) -> Result<String> {
///         Ok("data:image/png;base64,iVBORw0KGgo=".to_string())
///     }
///
///     async fn edit(&self, base_image: &str, _mime_type: &str, _instruction: &str) -> Result<String> {
///         Ok(base_image.to_string())
///     }
/// }
/// ```
pub trait ImageGenerator: Send + Sync + 'static {
    /// Produce exactly one image for `prompt`.
    fn generate(&self, prompt: &str) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Apply `instruction` to `base_image`, returning the replacement image.
    ///
    /// `base_image` may carry a data-URI prefix; implementations strip it
    /// before sending the raw payload.
    fn edit(
        &self,
        base_image: &str,
        mime_type: &str,
        instruction: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}
