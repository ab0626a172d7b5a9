//! Automation module - trigger sources, cascade rules and the engine.

mod automation_model;
mod automation_traits;
mod change_feed;
mod creation_locks;
mod dispatcher;
mod engine;
mod lifecycle_hooks;
mod resolver;
mod rules;
mod selector;

#[cfg(test)]
mod rules_tests;

#[cfg(test)]
mod engine_tests;

pub use automation_model::{
    AutomationConfig, AutomationStatus, CascadeRecord, LiveFeedProbe, RuleOutcome, SkipReason,
    SubscriptionState, TriggerPreference, TriggerSourceKind,
};
pub use automation_traits::{CascadeTrigger, MockCascadeTrigger, NoOpCascadeTrigger, TriggerSource};
pub use change_feed::{ChangeFeedTriggerSource, SubscriptionBoard};
pub use creation_locks::{CreationGuard, CreationLocks};
pub use dispatcher::CascadeDispatcher;
pub use engine::{AutomationDeps, AutomationEngine};
pub use lifecycle_hooks::HookTriggerSource;
pub use resolver::OpportunityResolver;
pub use rules::CascadeRules;
pub use selector::{choose_trigger_source, probe_live_feed, TriggerSourceSelector};
