use salesflow_core::errors::Result;
use salesflow_core::events::{AutomationEvent, NotificationTransport};
use serde_json::Value;
use tokio::sync::broadcast;

/// SSE event name used for automation outcomes.
pub const AUTOMATION_EVENT: &str = "automation";

/// Serializable envelope that carries event names and optional payloads.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub name: &'static str,
    pub payload: Option<Value>,
}

impl ServerEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: None,
        }
    }

    pub fn with_payload(name: &'static str, payload: Value) -> Self {
        Self {
            name,
            payload: Some(payload),
        }
    }
}

/// Lightweight broadcast bus that fans out events to any connected clients.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, event: ServerEvent) -> usize {
        // No subscribers is not an error; lagging ones drop old events.
        self.sender.send(event).unwrap_or(0)
    }
}

/// The bus is the realtime transport the automation notifier attaches to.
/// Every automation event goes out under the `automation` SSE event name.
impl NotificationTransport for EventBus {
    fn broadcast(&self, topic: &str, event: &AutomationEvent) -> Result<usize> {
        if topic != AUTOMATION_EVENT {
            tracing::debug!("Notification topic '{}' sent as '{}'", topic, AUTOMATION_EVENT);
        }
        let payload = serde_json::to_value(event)?;
        Ok(self.publish(ServerEvent::with_payload(AUTOMATION_EVENT, payload)))
    }
}
