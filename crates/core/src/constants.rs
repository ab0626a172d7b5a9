/// Broadcast topic carrying realtime automation events.
pub const AUTOMATION_TOPIC: &str = "automation";

/// Collection names as they appear in audit entries and change events.
pub mod collections {
    pub const LEADS: &str = "leads";
    pub const OPPORTUNITIES: &str = "opportunities";
    pub const QUOTES: &str = "quotes";
    pub const ORDERS: &str = "orders";
    pub const AUTOMATION_LOGS: &str = "automation_logs";
    /// Source collection for entries the engine writes about itself.
    pub const SYSTEM: &str = "system";
}

/// Source id for entries the engine writes about itself.
pub const ENGINE_SOURCE_ID: &str = "automation-engine";

/// Audit action tags written by the automation engine.
pub mod actions {
    pub const LEAD_TO_OPPORTUNITY: &str = "Lead→Opportunity";
    pub const OPPORTUNITY_TO_QUOTE: &str = "Opportunity→Quote";
    pub const QUOTE_TO_ORDER: &str = "Quote→Order";
    pub const QUOTE_TO_OPPORTUNITY_LOST: &str = "Quote→Opportunity Lost";
    pub const ORDER_TO_OPPORTUNITY_CLOSED_WON: &str = "Order→Opportunity Closed Won";
    pub const ORDER_TO_OPPORTUNITY_LOST: &str = "Order→Opportunity Lost";
    pub const ERROR: &str = "Error";
    pub const WATCHER_INIT_ERROR: &str = "WatcherInitError";
    pub const WATCHER_FALLBACK_ENABLED: &str = "WatcherFallbackEnabled";
}

/// Default number of audit entries returned when no limit is given.
pub const DEFAULT_AUDIT_PAGE_SIZE: usize = 100;
