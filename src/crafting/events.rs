//! Crafting Lifecycle Events
//!
//! Stations fire these synchronously, after the state change they describe,
//! to the observers subscribed on that station.

use serde::{Deserialize, Serialize};

use super::definition::CraftingItem;

/// Something that happened at a crafting station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CraftingEvent {
    /// Ingredients were taken and the clock started
    Started {
        station_id: String,
        recipe_id: String,
    },

    /// Fresh progress reading, 0.0 to 1.0
    Progress {
        station_id: String,
        recipe_id: String,
        progress: f32,
    },

    /// The result landed in the output slot
    Completed {
        station_id: String,
        recipe_id: String,
        result: CraftingItem,
    },

    /// The craft finished but the output slot refused the result
    OutputDropped {
        station_id: String,
        recipe_id: String,
        result: CraftingItem,
    },

    /// Crafting stopped early and ingredients were handed back
    Cancelled {
        station_id: String,
        recipe_id: String,
    },

    /// Items were taken out of the output slot
    OutputWithdrawn {
        station_id: String,
        item: CraftingItem,
    },
}

impl CraftingEvent {
    /// Get the station ID associated with this event
    pub fn station_id(&self) -> &str {
        match self {
            CraftingEvent::Started { station_id, .. } => station_id,
            CraftingEvent::Progress { station_id, .. } => station_id,
            CraftingEvent::Completed { station_id, .. } => station_id,
            CraftingEvent::OutputDropped { station_id, .. } => station_id,
            CraftingEvent::Cancelled { station_id, .. } => station_id,
            CraftingEvent::OutputWithdrawn { station_id, .. } => station_id,
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            CraftingEvent::Started { .. } => "started",
            CraftingEvent::Progress { .. } => "progress",
            CraftingEvent::Completed { .. } => "completed",
            CraftingEvent::OutputDropped { .. } => "output_dropped",
            CraftingEvent::Cancelled { .. } => "cancelled",
            CraftingEvent::OutputWithdrawn { .. } => "output_withdrawn",
        }
    }
}

/// Receives station events.
///
/// Observers only see the event, never the station, so a handler can't start
/// or cancel crafts while the station is mid-transition.
pub trait CraftingObserver: Send {
    fn notify(&mut self, event: &CraftingEvent);
}

impl<F> CraftingObserver for F
where
    F: FnMut(&CraftingEvent) + Send,
{
    fn notify(&mut self, event: &CraftingEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CraftingEvent::Completed {
            station_id: "forge".to_string(),
            recipe_id: "hunting_bow".to_string(),
            result: CraftingItem::new("hunting_bow", 1),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["result"]["item_id"], "hunting_bow");
        assert_eq!(event.station_id(), "forge");
        assert_eq!(event.event_type(), "completed");
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &CraftingEvent| seen.push(event.event_type());
            notify_all(&mut observer, &CraftingEvent::Cancelled {
                station_id: "forge".to_string(),
                recipe_id: "plank".to_string(),
            });
        }
        assert_eq!(seen, vec!["cancelled"]);
    }

    fn notify_all(observer: &mut dyn CraftingObserver, event: &CraftingEvent) {
        observer.notify(event);
    }
}
