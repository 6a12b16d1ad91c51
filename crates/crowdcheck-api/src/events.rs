//! In-process fan-out of report lifecycle events
use crowdcheck_core::{Admission, ReportRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEvent {
    /// `report:new`, `report:verified`, `report:pending` or `report:flagged`
    pub name: String,
    pub report_id: String,
    pub admission: Admission,
}

/// Cloneable handle; every clone publishes to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReportEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.sender.subscribe()
    }

    /// Publish every event the admission tier calls for. Returns the events sent.
    pub fn publish_for(&self, record: &ReportRecord, admission: Admission) -> Vec<ReportEvent> {
        admission
            .event_names()
            .iter()
            .map(|name| {
                let event = ReportEvent {
                    name: name.to_string(),
                    report_id: record.id.clone(),
                    admission,
                };
                // no subscribers is not an error
                if self.sender.send(event.clone()).is_err() {
                    tracing::debug!(event = %name, "no event subscribers");
                }
                event
            })
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
