use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// A single parsed menu line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: String,
    pub name: String,
}

impl Dish {
    /// Create a dish with a generated UUID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }

    /// Set a custom ID for this dish (builder pattern).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Photographic treatment applied to every dish of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoStyle {
    RusticDark,
    #[default]
    BrightModern,
    SocialMedia,
}

impl PhotoStyle {
    pub const ALL: [PhotoStyle; 3] = [
        PhotoStyle::RusticDark,
        PhotoStyle::BrightModern,
        PhotoStyle::SocialMedia,
    ];

    /// Human-readable label shown in style pickers.
    pub fn label(&self) -> &'static str {
        match self {
            PhotoStyle::RusticDark => "Rustic/Dark",
            PhotoStyle::BrightModern => "Bright/Modern",
            PhotoStyle::SocialMedia => "Social Media (top-down)",
        }
    }

    /// Literal phrase that opens every prompt rendered in this style.
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            PhotoStyle::RusticDark => "A rustic, dark, moody, professional food photograph",
            PhotoStyle::BrightModern => {
                "A bright, modern, minimalist, professional food photograph"
            }
            PhotoStyle::SocialMedia => "A vibrant, top-down, social media style food photograph",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            PhotoStyle::RusticDark => "rustic-dark",
            PhotoStyle::BrightModern => "bright-modern",
            PhotoStyle::SocialMedia => "social-media",
        }
    }
}

impl fmt::Display for PhotoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PhotoStyle {
    type Err = StudioError;

    /// Accepts either the slug (`rustic-dark`) or the label (`Rustic/Dark`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PhotoStyle::ALL
            .into_iter()
            .find(|style| {
                style.slug().eq_ignore_ascii_case(needle)
                    || style.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| StudioError::Validation(format!("Unknown photography style: {}", s)))
    }
}

/// Per-item status: Idle -> Loading -> Ready/Failed, re-entering Loading on edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Loading => "loading",
            LifecycleState::Ready => "ready",
            LifecycleState::Failed => "failed",
        }
    }
}

/// The generated photo for one dish together with its prompt history.
///
/// `id` is shared with the originating [`Dish`]. `image_data` holds a
/// `data:<mime>;base64,<payload>` URI and keeps its last successful value
/// when a later generation or edit fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageItem {
    pub id: String,
    pub dish_name: String,
    pub original_prompt: String,
    pub current_prompt: String,
    pub image_data: String,
    pub state: LifecycleState,
    pub error_message: Option<String>,
}

impl GeneratedImageItem {
    /// A fresh, idle item for `dish` whose prompts are both `prompt`.
    pub fn new(dish: &Dish, prompt: String) -> Self {
        Self {
            id: dish.id.clone(),
            dish_name: dish.name.clone(),
            original_prompt: prompt.clone(),
            current_prompt: prompt,
            image_data: String::new(),
            state: LifecycleState::Idle,
            error_message: None,
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_data.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.state == LifecycleState::Loading
    }

    pub(crate) fn begin_loading(&mut self) {
        self.state = LifecycleState::Loading;
        self.error_message = None;
    }

    pub(crate) fn complete(&mut self, image_data: String, prompt: Option<String>) {
        self.image_data = image_data;
        if let Some(prompt) = prompt {
            self.current_prompt = prompt;
        }
        self.state = LifecycleState::Ready;
        self.error_message = None;
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.state = LifecycleState::Failed;
        self.error_message = Some(error);
    }
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub items: Vec<GeneratedImageItem>,
    pub global_error: Option<String>,
    pub generating: bool,
    pub generating_since: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn item(&self, id: &str) -> Option<&GeneratedImageItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn has_errors(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dish_ids_are_unique() {
        let a = Dish::new("Classic Burger");
        let b = Dish::new("Classic Burger");
        assert_ne!(a.id, b.id);
        assert_eq!(Dish::new("x").with_id("fixed").id, "fixed");
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!(
            "bright-modern".parse::<PhotoStyle>().unwrap(),
            PhotoStyle::BrightModern
        );
        assert_eq!(
            "Rustic/Dark".parse::<PhotoStyle>().unwrap(),
            PhotoStyle::RusticDark
        );
        assert_eq!(
            " social media (TOP-DOWN) ".parse::<PhotoStyle>().unwrap(),
            PhotoStyle::SocialMedia
        );
        let err = "polaroid".parse::<PhotoStyle>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_style_serialization() {
        let json = serde_json::to_string(&PhotoStyle::SocialMedia).unwrap();
        assert_eq!(json, "\"social-media\"");
        assert_eq!(PhotoStyle::default(), PhotoStyle::BrightModern);
    }

    #[test]
    fn test_item_transitions() {
        let dish = Dish::new("Caesar Salad").with_id("d1");
        let mut item = GeneratedImageItem::new(&dish, "prompt".into());
        assert_eq!(item.state, LifecycleState::Idle);
        assert!(!item.has_image());

        item.begin_loading();
        assert!(item.is_loading());

        item.complete("data:image/jpeg;base64,AAAA".into(), None);
        assert_eq!(item.state, LifecycleState::Ready);
        assert_eq!(item.current_prompt, "prompt");

        item.begin_loading();
        item.fail("quota exceeded".into());
        assert_eq!(item.state, LifecycleState::Failed);
        assert_eq!(item.error_message.as_deref(), Some("quota exceeded"));
        assert_eq!(item.image_data, "data:image/jpeg;base64,AAAA");
        assert_eq!(item.original_prompt, "prompt");
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let dish = Dish::new("Fish and Chips").with_id("d2");
        let item = GeneratedImageItem::new(&dish, "p".into());
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"dishName\":\"Fish and Chips\""));
        assert!(json.contains("\"state\":\"idle\""));
        assert!(json.contains("\"errorMessage\":null"));
    }
}
