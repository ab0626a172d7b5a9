//! Realtime notifier and its transport seam.

use std::sync::{Arc, Mutex, RwLock};

use log::debug;
use serde_json::Value;

use super::{AutomationEvent, Severity};
use crate::constants::AUTOMATION_TOPIC;
use crate::errors::{AutomationError, Result};

/// Trait for the network transport that fans events out to observers.
///
/// # Design Rules
///
/// - `broadcast()` must be fast and non-blocking
/// - No delivery guarantee, persistence or replay is expected
pub trait NotificationTransport: Send + Sync {
    /// Broadcasts an event on `topic` and returns the number of observers
    /// it reached.
    fn broadcast(&self, topic: &str, event: &AutomationEvent) -> Result<usize>;
}

/// Broadcaster injected into the automation engine.
///
/// The transport is absent until the network layer starts and attaches one;
/// until then `emit` is a no-op.
pub struct RealtimeNotifier {
    transport: RwLock<Option<Arc<dyn NotificationTransport>>>,
}

impl RealtimeNotifier {
    /// Creates a notifier with no transport attached.
    pub fn new() -> Self {
        Self {
            transport: RwLock::new(None),
        }
    }

    /// Attaches the transport once the network layer is up.
    pub fn attach(&self, transport: Arc<dyn NotificationTransport>) -> Result<()> {
        let mut slot = self
            .transport
            .write()
            .map_err(|e| AutomationError::Notification(e.to_string()))?;
        *slot = Some(transport);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self) -> bool {
        self.transport
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Broadcasts an event to every currently connected observer.
    ///
    /// Returns the number of observers reached; `0` when no transport is
    /// attached yet.
    pub fn emit(&self, severity: Severity, message: &str, meta: Value) -> Result<usize> {
        let transport = {
            let slot = self
                .transport
                .read()
                .map_err(|e| AutomationError::Notification(e.to_string()))?;
            match slot.as_ref() {
                Some(transport) => transport.clone(),
                None => {
                    debug!("Realtime transport not initialized, dropping '{}'", message);
                    return Ok(0);
                }
            }
        };

        let event = AutomationEvent::now(severity, message, meta);
        transport.broadcast(AUTOMATION_TOPIC, &event)
    }
}

impl Default for RealtimeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock transport for testing - collects broadcast events.
#[derive(Clone, Default)]
pub struct MockNotificationTransport {
    events: Arc<Mutex<Vec<(String, AutomationEvent)>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockNotificationTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<AutomationEvent> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the topics events were published on.
    pub fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every subsequent broadcast fail.
    pub fn fail_broadcasts(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }
}

impl NotificationTransport for MockNotificationTransport {
    fn broadcast(&self, topic: &str, event: &AutomationEvent) -> Result<usize> {
        if self.failing.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(AutomationError::Notification("transport unavailable".to_string()).into());
        }
        let mut events = self
            .events
            .lock()
            .map_err(|e| AutomationError::Notification(e.to_string()))?;
        events.push((topic.to_string(), event.clone()));
        Ok(1)
    }
}
