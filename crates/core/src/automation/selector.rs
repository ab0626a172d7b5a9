use std::sync::Arc;

use log::{info, warn};
use tokio::sync::OnceCell;

use super::automation_model::{LiveFeedProbe, TriggerPreference, TriggerSourceKind};
use crate::errors::AutomationError;
use crate::store::StoreAdminTrait;

/// Queries the store topology and classifies it.
pub async fn probe_live_feed(admin: &dyn StoreAdminTrait) -> LiveFeedProbe {
    match admin.topology().await {
        Ok(topology) if topology.supports_change_feed() => {
            info!("Store topology {:?} supports a live change feed", topology);
            LiveFeedProbe::Available
        }
        Ok(topology) => {
            info!("Store topology {:?} has no change feed", topology);
            LiveFeedProbe::Standalone
        }
        Err(e) => {
            let failure = AutomationError::TopologyProbeFailed(e.to_string());
            warn!("WatcherInitError: {}", failure);
            LiveFeedProbe::Failed(failure.to_string())
        }
    }
}

/// Picks the trigger source for a probe result and a configured preference.
///
/// `Feed` degrades to hooks when no live feed is available.
pub fn choose_trigger_source(
    preference: TriggerPreference,
    probe: &LiveFeedProbe,
) -> TriggerSourceKind {
    match preference {
        TriggerPreference::Hooks => TriggerSourceKind::LifecycleHooks,
        TriggerPreference::Auto if probe.is_available() => TriggerSourceKind::ChangeFeed,
        TriggerPreference::Auto => TriggerSourceKind::LifecycleHooks,
        TriggerPreference::Feed if probe.is_available() => TriggerSourceKind::ChangeFeed,
        TriggerPreference::Feed => {
            warn!(
                "Change feed requested but unavailable ({:?}), using lifecycle hooks",
                probe
            );
            TriggerSourceKind::LifecycleHooks
        }
    }
}

/// Makes the live feed decision once per process.
pub struct TriggerSourceSelector {
    admin: Arc<dyn StoreAdminTrait>,
    decision: OnceCell<LiveFeedProbe>,
}

impl TriggerSourceSelector {
    pub fn new(admin: Arc<dyn StoreAdminTrait>) -> Self {
        Self {
            admin,
            decision: OnceCell::new(),
        }
    }

    /// Probes on first call; later calls return the cached result.
    pub async fn probe(&self) -> &LiveFeedProbe {
        self.decision
            .get_or_init(|| probe_live_feed(self.admin.as_ref()))
            .await
    }

    pub async fn supports_live_feed(&self) -> bool {
        self.probe().await.is_available()
    }

    pub fn decided(&self) -> Option<&LiveFeedProbe> {
        self.decision.get()
    }
}
