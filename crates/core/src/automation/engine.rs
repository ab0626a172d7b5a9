use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::json;
use tokio::sync::OnceCell;

use super::automation_model::{
    AutomationConfig, AutomationStatus, LiveFeedProbe, TriggerSourceKind,
};
use super::automation_traits::{CascadeTrigger, NoOpCascadeTrigger, TriggerSource};
use super::change_feed::{ChangeFeedTriggerSource, SubscriptionBoard};
use super::dispatcher::CascadeDispatcher;
use super::lifecycle_hooks::HookTriggerSource;
use super::rules::CascadeRules;
use super::selector::{choose_trigger_source, TriggerSourceSelector};
use crate::audit::{AuditLogger, AutomationLogEntry, AutomationLogRepositoryTrait, NewAutomationLogEntry};
use crate::constants::{actions, collections, ENGINE_SOURCE_ID};
use crate::errors::Result;
use crate::events::RealtimeNotifier;
use crate::store::{
    ChangeFeedTrait, Collection, LifecycleHookRegistry, PipelineRepositories, StoreAdminTrait,
};

/// Store capabilities and collaborators the engine is built from.
pub struct AutomationDeps {
    pub repositories: PipelineRepositories,
    pub audit_log: Arc<dyn AutomationLogRepositoryTrait>,
    pub admin: Arc<dyn StoreAdminTrait>,
    /// `None` when the store has no change feed at all.
    pub change_feed: Option<Arc<dyn ChangeFeedTrait>>,
    /// `None` when the store cannot fire lifecycle hooks.
    pub hooks: Option<Arc<dyn LifecycleHookRegistry>>,
    pub notifier: Arc<RealtimeNotifier>,
}

struct ActiveTrigger {
    kind: TriggerSourceKind,
    collections: Vec<Collection>,
}

/// The cascade automation engine.
///
/// `start` chooses and attaches exactly one trigger source the first time it
/// runs; later calls are no-ops. The CRUD services take the direct
/// invocation path through [`AutomationEngine::cascade_trigger`].
pub struct AutomationEngine {
    config: AutomationConfig,
    selector: TriggerSourceSelector,
    dispatcher: Arc<CascadeDispatcher>,
    repositories: PipelineRepositories,
    change_feed: Option<Arc<dyn ChangeFeedTrait>>,
    hooks: Option<Arc<dyn LifecycleHookRegistry>>,
    audit: AuditLogger,
    board: SubscriptionBoard,
    active: OnceCell<Option<ActiveTrigger>>,
}

impl AutomationEngine {
    pub fn new(deps: AutomationDeps, config: AutomationConfig) -> Self {
        let audit = AuditLogger::new(deps.audit_log);
        let rules = Arc::new(CascadeRules::new(
            deps.repositories.clone(),
            audit.clone(),
            deps.notifier,
        ));
        Self {
            config,
            selector: TriggerSourceSelector::new(deps.admin),
            dispatcher: Arc::new(CascadeDispatcher::new(rules, audit.clone())),
            repositories: deps.repositories,
            change_feed: deps.change_feed,
            hooks: deps.hooks,
            audit,
            board: SubscriptionBoard::new(),
            active: OnceCell::new(),
        }
    }

    pub fn config(&self) -> AutomationConfig {
        self.config
    }

    pub fn dispatcher(&self) -> Arc<CascadeDispatcher> {
        self.dispatcher.clone()
    }

    /// Trigger handed to the CRUD services. Does nothing when automation is
    /// disabled.
    pub fn cascade_trigger(&self) -> Arc<dyn CascadeTrigger> {
        if self.config.enabled {
            self.dispatcher.clone()
        } else {
            Arc::new(NoOpCascadeTrigger)
        }
    }

    /// Selects and attaches the trigger source. Returns the active kind, or
    /// `None` when automation is disabled or nothing could be attached.
    pub async fn start(&self) -> Option<TriggerSourceKind> {
        self.active
            .get_or_init(|| self.activate())
            .await
            .as_ref()
            .map(|active| active.kind)
    }

    async fn activate(&self) -> Option<ActiveTrigger> {
        if !self.config.enabled {
            info!("Automation disabled, no trigger source attached");
            return None;
        }

        let probe = self.selector.probe().await.clone();
        if let LiveFeedProbe::Failed(reason) = &probe {
            let entry = NewAutomationLogEntry::new(
                actions::WATCHER_INIT_ERROR,
                collections::SYSTEM,
                ENGINE_SOURCE_ID,
            )
            .with_details(json!({ "error": reason }));
            if let Err(e) = self.audit.record(entry).await {
                debug!("WatcherInitError audit entry dropped: {}", e);
            }
        }

        let mut kind = choose_trigger_source(self.config.trigger, &probe);
        if kind == TriggerSourceKind::ChangeFeed && self.change_feed.is_none() {
            warn!("Store reports a live feed but exposes no feed handle, using lifecycle hooks");
            kind = TriggerSourceKind::LifecycleHooks;
        }

        let source: Box<dyn TriggerSource> = match (kind, &self.change_feed, &self.hooks) {
            (TriggerSourceKind::ChangeFeed, Some(feed), _) => Box::new(
                ChangeFeedTriggerSource::new(feed.clone(), self.board.clone()),
            ),
            (_, _, Some(registry)) => Box::new(HookTriggerSource::new(
                registry.clone(),
                self.repositories.clone(),
                self.audit.clone(),
            )),
            (_, _, None) => {
                error!("Store supports neither a change feed nor lifecycle hooks; only direct invocation will cascade");
                return None;
            }
        };

        match source.start(self.dispatcher.clone()).await {
            Ok(collections) => {
                info!("Automation active via {} on {:?}", source.kind(), collections);
                Some(ActiveTrigger {
                    kind: source.kind(),
                    collections,
                })
            }
            Err(e) => {
                error!("Failed to attach {} trigger source: {}", source.kind(), e);
                None
            }
        }
    }

    pub fn status(&self) -> AutomationStatus {
        let active = self.active.get().and_then(Option::as_ref);
        let hooked_collections = match active {
            Some(ActiveTrigger {
                kind: TriggerSourceKind::LifecycleHooks,
                collections,
            }) => collections.iter().map(Collection::to_string).collect(),
            _ => Vec::new(),
        };
        AutomationStatus {
            enabled: self.config.enabled,
            preference: self.config.trigger,
            probe: self.selector.decided().cloned(),
            trigger_source: active.map(|a| a.kind),
            subscriptions: self.board.snapshot(),
            hooked_collections,
        }
    }

    /// Audit entries, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<AutomationLogEntry>> {
        self.audit.recent(limit)
    }
}
