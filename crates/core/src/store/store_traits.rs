//! Store capability traits used by the automation engine.
//!
//! A concrete store implements the repository traits of each entity module
//! plus whichever of these capabilities it supports.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use super::store_model::{ChangeEvent, Collection, HookKind, HookPayload, StoreTopology, WatchOptions};
use crate::errors::Result;

/// Administrative view of the store.
#[async_trait]
pub trait StoreAdminTrait: Send + Sync {
    /// Queries the store's deployment topology.
    async fn topology(&self) -> Result<StoreTopology>;
}

/// Stream of change notifications for one collection.
///
/// An `Err` item is terminal for the subscription; end of stream means the
/// feed was closed.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent>> + Send>>;

/// Live change notifications, available on replicated topologies only.
pub trait ChangeFeedTrait: Send + Sync {
    /// Opens one continuous subscription on `collection`, filtered
    /// server-side according to `options`.
    fn watch(&self, collection: Collection, options: WatchOptions) -> Result<ChangeStream>;
}

/// Callback fired by the store after a committed write.
pub type LifecycleHook = Arc<dyn Fn(HookPayload) + Send + Sync>;

/// Registration point for post-write lifecycle hooks.
pub trait LifecycleHookRegistry: Send + Sync {
    fn register_hook(&self, collection: Collection, kind: HookKind, hook: LifecycleHook)
        -> Result<()>;
}
