use std::collections::HashMap;
use std::sync::RwLock;

use log::warn;

use super::store_model::{Collection, HookKind, HookPayload};
use super::store_traits::{LifecycleHook, LifecycleHookRegistry};
use crate::errors::{AutomationError, Result};

/// Hook table shared by store implementations.
///
/// Stores call [`HookRegistry::fire`] once a write has committed; hooks run
/// synchronously on the writer's task and are expected to hand real work off
/// to a spawned task.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<(Collection, HookKind), Vec<LifecycleHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every hook registered for `(collection, kind)`.
    pub fn fire(&self, collection: Collection, kind: HookKind, payload: HookPayload) {
        let hooks = match self.hooks.read() {
            Ok(table) => table.get(&(collection, kind)).cloned().unwrap_or_default(),
            Err(e) => {
                warn!("Hook table poisoned, skipping {:?} hooks for {}: {}", kind, collection, e);
                return;
            }
        };
        for hook in hooks {
            hook(payload.clone());
        }
    }

    pub fn count(&self, collection: Collection, kind: HookKind) -> usize {
        self.hooks
            .read()
            .map(|table| table.get(&(collection, kind)).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl LifecycleHookRegistry for HookRegistry {
    fn register_hook(
        &self,
        collection: Collection,
        kind: HookKind,
        hook: LifecycleHook,
    ) -> Result<()> {
        let mut table = self
            .hooks
            .write()
            .map_err(|e| AutomationError::HookInstallFailed {
                collection: collection.to_string(),
                reason: e.to_string(),
            })?;
        table.entry((collection, kind)).or_default().push(hook);
        Ok(())
    }
}
