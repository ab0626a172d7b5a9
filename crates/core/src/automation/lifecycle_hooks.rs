//! Lifecycle hook trigger source, used when the store has no live feed.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::json;
use tokio::runtime::Handle;

use super::automation_model::TriggerSourceKind;
use super::automation_traits::{CascadeTrigger, TriggerSource};
use crate::audit::{AuditLogger, NewAutomationLogEntry};
use crate::constants::{actions, collections, ENGINE_SOURCE_ID};
use crate::errors::{AutomationError, Result};
use crate::store::{
    Collection, HookKind, HookPayload, LifecycleHook, LifecycleHookRegistry, PipelineRepositories,
};

/// Installs a post-create and a post-update hook on every pipeline
/// collection.
///
/// Hooks run on the writer's task after commit. Each one only spawns a task
/// that re-reads the current document and hands it to the dispatcher.
pub struct HookTriggerSource {
    registry: Arc<dyn LifecycleHookRegistry>,
    repositories: PipelineRepositories,
    audit: AuditLogger,
}

impl HookTriggerSource {
    pub fn new(
        registry: Arc<dyn LifecycleHookRegistry>,
        repositories: PipelineRepositories,
        audit: AuditLogger,
    ) -> Self {
        Self {
            registry,
            repositories,
            audit,
        }
    }

    fn hook(&self, dispatcher: Arc<dyn CascadeTrigger>, runtime: Handle) -> LifecycleHook {
        let repositories = self.repositories.clone();
        Arc::new(move |payload: HookPayload| {
            let repositories = repositories.clone();
            let dispatcher = dispatcher.clone();
            runtime.spawn(async move {
                let query = payload.query();
                match repositories.load(&query) {
                    Ok(Some(document)) => dispatcher.trigger(document).await,
                    Ok(None) => debug!(
                        "{} {} no longer exists, nothing to dispatch",
                        query.collection, query.id
                    ),
                    Err(e) => warn!(
                        "Failed to resolve {} {} for cascade: {}",
                        query.collection, query.id, e
                    ),
                }
            });
        })
    }

    fn install(&self, collection: Collection, hook: &LifecycleHook) -> Result<()> {
        for kind in [HookKind::PostCreate, HookKind::PostUpdate] {
            self.registry
                .register_hook(collection, kind, hook.clone())
                .map_err(|e| AutomationError::HookInstallFailed {
                    collection: collection.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl TriggerSource for HookTriggerSource {
    fn kind(&self) -> TriggerSourceKind {
        TriggerSourceKind::LifecycleHooks
    }

    async fn start(&self, dispatcher: Arc<dyn CascadeTrigger>) -> Result<Vec<Collection>> {
        let hook = self.hook(dispatcher, Handle::current());

        let mut installed = Vec::new();
        for collection in Collection::ALL {
            match self.install(collection, &hook) {
                Ok(()) => installed.push(collection),
                Err(e) => warn!("{}", e),
            }
        }

        if installed.is_empty() {
            return Err(AutomationError::HookInstallFailed {
                collection: "*".to_string(),
                reason: "no collection accepted hooks".to_string(),
            }
            .into());
        }

        info!("WatcherFallbackEnabled: lifecycle hooks on {:?}", installed);
        let names: Vec<&str> = installed.iter().map(Collection::as_str).collect();
        let entry = NewAutomationLogEntry::new(
            actions::WATCHER_FALLBACK_ENABLED,
            collections::SYSTEM,
            ENGINE_SOURCE_ID,
        )
        .with_details(json!({ "collections": names }));
        if let Err(e) = self.audit.record(entry).await {
            debug!("WatcherFallbackEnabled audit entry dropped: {}", e);
        }
        Ok(installed)
    }
}
