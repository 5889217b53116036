//! Raw inventory and visit events as read from the event store.

use chrono::{DateTime, Utc};

use crate::types::SessionId;

/// An event that can be placed on the timeline.
///
/// This trait lets aggregation work with any event representation
/// (store rows, test fixtures) as long as it carries a timestamp.
pub trait Timestamped {
    /// Returns when the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// The recognized inventory actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryAction {
    Added,
    Removed,
}

impl InventoryAction {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }

    /// Interprets a stored action label. Unrecognized labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "added" => Some(Self::Added),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A product inventory change.
///
/// The action is kept as the raw label from the store so that events with
/// actions this version does not know about still flow through (and are
/// ignored by aggregation) instead of failing the whole query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEvent {
    /// The product this change applies to.
    pub entity_id: i64,
    /// Raw action label, normally `added` or `removed`.
    pub action: String,
    /// Number of units added or removed.
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryEvent {
    /// Creates an event with a recognized action.
    pub fn new(
        entity_id: i64,
        action: InventoryAction,
        count: u32,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            action: action.as_str().to_string(),
            count,
            occurred_at,
        }
    }

    /// The parsed action, if recognized.
    pub fn kind(&self) -> Option<InventoryAction> {
        InventoryAction::from_label(&self.action)
    }
}

impl Timestamped for InventoryEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// A single site visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
}

impl VisitEvent {
    pub const fn new(session_id: SessionId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            occurred_at,
        }
    }
}

impl Timestamped for VisitEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn action_labels_roundtrip() {
        for action in [InventoryAction::Added, InventoryAction::Removed] {
            assert_eq!(InventoryAction::from_label(action.as_str()), Some(action));
        }
    }

    #[test]
    fn unknown_action_has_no_kind() {
        let event = InventoryEvent {
            entity_id: 7,
            action: "restocked".to_string(),
            count: 3,
            occurred_at: Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap(),
        };
        assert_eq!(event.kind(), None);
    }

    #[test]
    fn inventory_event_new_stores_label() {
        let at = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        let event = InventoryEvent::new(1, InventoryAction::Removed, 1, at);
        assert_eq!(event.action, "removed");
        assert_eq!(event.kind(), Some(InventoryAction::Removed));
        assert_eq!(event.occurred_at(), at);
    }
}
