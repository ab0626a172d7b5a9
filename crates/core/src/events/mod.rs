//! Realtime events module.
//!
//! Provides the automation event payload and the injected notifier that
//! broadcasts it. Runtime adapters (the web server) implement the transport
//! trait to fan events out to connected clients.

mod automation_event;
mod notifier;

pub use automation_event::*;
pub use notifier::*;
