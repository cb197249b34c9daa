use std::sync::Arc;

use crate::error::{Result, StudioError};
use crate::events::{Operation, StudioEvent};
use crate::image::data_uri_mime_type;
use crate::session::Session;
use crate::types::GeneratedImageItem;
use crate::ImageGenerator;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Result of a successful edit.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    /// The item after the edit, in `Ready` state.
    pub item: GeneratedImageItem,
    /// The new image as a data URI.
    pub image_data: String,
}

/// Applies follow-up prompts to already generated images.
///
/// Each edit touches only its own item. While an edit is in flight the item
/// is `Loading` and keeps showing its previous image; a second edit of the
/// same item is refused until the first resolves. On failure the item's
/// image and current prompt stay at their pre-edit values.
pub struct EditOrchestrator<G: ImageGenerator> {
    generator: Arc<G>,
    session: Arc<Session>,
}

impl<G: ImageGenerator> Clone for EditOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            session: Arc::clone(&self.session),
        }
    }
}

impl<G: ImageGenerator> EditOrchestrator<G> {
    pub fn new(generator: Arc<G>, session: Arc<Session>) -> Self {
        Self { generator, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Edit `item_id` with `edit_prompt`.
    ///
    /// `image_data` is the base image (data URI or raw base64); pass an
    /// empty string to use the item's current image. An empty `mime_type`
    /// falls back to the type declared by the base image's data URI.
    ///
    /// # Errors
    ///
    /// - [`StudioError::Validation`] if the prompt is blank, the item is
    ///   still loading or has no image yet. Nothing is sent in that case.
    /// - [`StudioError::NotFound`] if no item has this ID.
    /// - [`StudioError::Edit`] if the service call failed; the item is then
    ///   `Failed` with the same message.
    pub async fn edit_item(
        &self,
        item_id: &str,
        image_data: &str,
        mime_type: &str,
        edit_prompt: &str,
    ) -> Result<EditOutcome> {
        if edit_prompt.trim().is_empty() {
            return Err(StudioError::Validation("Please enter an edit prompt.".into()));
        }

        let (epoch, item) = self.session.begin_edit(item_id, !image_data.is_empty())?;
        let mut pending = PendingEdit {
            session: &self.session,
            epoch,
            item_id,
            armed: true,
        };
        let base = if image_data.is_empty() {
            item.image_data.clone()
        } else {
            image_data.to_string()
        };
        let mime_type = if mime_type.is_empty() {
            data_uri_mime_type(&base).unwrap_or(DEFAULT_MIME_TYPE).to_string()
        } else {
            mime_type.to_string()
        };

        tracing::info!(item = %item_id, dish = %item.dish_name, "editing image");
        self.session.publish(StudioEvent::ItemLoading {
            operation: Operation::Edit,
            item,
        });

        let result = match self.generator.edit(&base, &mime_type, edit_prompt).await {
            Ok(image) if image.is_empty() => Err(StudioError::NoImage(
                "No image data found in the edited response.".into(),
            )),
            other => other,
        };

        pending.armed = false;

        match result {
            Ok(image) => {
                let Some(item) =
                    self.session
                        .mark_ready(epoch, item_id, image.clone(), Some(edit_prompt.to_string()))
                else {
                    tracing::warn!(item = %item_id, "session reset during edit, result discarded");
                    return Err(StudioError::Edit(
                        "The image was replaced while the edit was running.".into(),
                    ));
                };
                tracing::info!(item = %item_id, "image edited");
                self.session.publish(StudioEvent::ItemReady {
                    operation: Operation::Edit,
                    item: item.clone(),
                });
                Ok(EditOutcome {
                    item,
                    image_data: image,
                })
            }
            Err(e) => {
                let message = format!("Failed to edit image: {}", e);
                tracing::warn!(item = %item_id, error = %e, "image edit failed");
                if let Some(item) = self.session.mark_failed(epoch, item_id, message.clone(), None) {
                    self.session.publish(StudioEvent::ItemFailed {
                        operation: Operation::Edit,
                        item,
                        global_error: None,
                    });
                }
                Err(StudioError::Edit(message))
            }
        }
    }

    /// Edit `item_id` starting from its current image.
    pub async fn edit_current(&self, item_id: &str, edit_prompt: &str) -> Result<EditOutcome> {
        self.edit_item(item_id, "", "", edit_prompt).await
    }
}

/// Fails the item if an edit is dropped before its service call resolves,
/// so it does not stay `Loading` forever.
struct PendingEdit<'a> {
    session: &'a Session,
    epoch: u64,
    item_id: &'a str,
    armed: bool,
}

impl Drop for PendingEdit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let message = "Edit was cancelled before it finished.".to_string();
        if let Some(item) = self.session.abandon(self.epoch, self.item_id, message) {
            tracing::warn!(item = %self.item_id, "edit cancelled, item released");
            self.session.publish(StudioEvent::ItemFailed {
                operation: Operation::Edit,
                item,
                global_error: None,
            });
        }
    }
}
