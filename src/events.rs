use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BatchSummary, GeneratedImageItem};

/// Which orchestrator produced an item transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Generate,
    Edit,
}

/// Discrete state transition emitted by the orchestrators.
///
/// Item events carry a full snapshot of the item after the transition, so
/// a consumer can render from events alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StudioEvent {
    /// Emitted once, before the first dish is processed.
    #[serde(rename_all = "camelCase")]
    BatchStarted {
        total: usize,
        started_at: DateTime<Utc>,
    },

    /// The item entered `Loading` and its service call is in flight.
    #[serde(rename_all = "camelCase")]
    ItemLoading {
        operation: Operation,
        item: GeneratedImageItem,
    },

    #[serde(rename_all = "camelCase")]
    ItemReady {
        operation: Operation,
        item: GeneratedImageItem,
    },

    /// The item entered `Failed`; `global_error` is set for batch failures only.
    #[serde(rename_all = "camelCase")]
    ItemFailed {
        operation: Operation,
        item: GeneratedImageItem,
        global_error: Option<String>,
    },

    /// Emitted once, after the last dish resolved.
    #[serde(rename_all = "camelCase")]
    BatchCompleted { summary: BatchSummary },
}

impl StudioEvent {
    /// The item this event concerns, if any.
    pub fn item(&self) -> Option<&GeneratedImageItem> {
        match self {
            StudioEvent::ItemLoading { item, .. }
            | StudioEvent::ItemReady { item, .. }
            | StudioEvent::ItemFailed { item, .. } => Some(item),
            StudioEvent::BatchStarted { .. } | StudioEvent::BatchCompleted { .. } => None,
        }
    }

    /// Whether this event resolves an item (success or failure).
    pub fn is_item_resolution(&self) -> bool {
        matches!(
            self,
            StudioEvent::ItemReady { .. } | StudioEvent::ItemFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dish;

    #[test]
    fn test_event_serialization_is_tagged() {
        let dish = Dish::new("Caesar Salad").with_id("d1");
        let item = GeneratedImageItem::new(&dish, "p".into());
        let event = StudioEvent::ItemFailed {
            operation: Operation::Edit,
            item,
            global_error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "itemFailed");
        assert_eq!(json["operation"], "edit");
        assert_eq!(json["item"]["dishName"], "Caesar Salad");
        assert!(json["globalError"].is_null());
    }

    #[test]
    fn test_item_accessor() {
        let dish = Dish::new("Soup").with_id("d2");
        let event = StudioEvent::ItemReady {
            operation: Operation::Generate,
            item: GeneratedImageItem::new(&dish, "p".into()),
        };
        assert_eq!(event.item().map(|i| i.id.as_str()), Some("d2"));
        assert!(event.is_item_resolution());

        let event = StudioEvent::BatchStarted {
            total: 3,
            started_at: Utc::now(),
        };
        assert!(event.item().is_none());
        assert!(!event.is_item_resolution());
    }
}
