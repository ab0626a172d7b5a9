//! Automation seams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::automation_model::TriggerSourceKind;
use crate::errors::Result;
use crate::store::{Collection, PipelineDocument};

/// Entry point into the cascade rules for one entity write.
///
/// Implementations never fail: anything that goes wrong is logged and
/// recorded behind this boundary.
#[async_trait]
pub trait CascadeTrigger: Send + Sync {
    async fn trigger(&self, document: PipelineDocument);
}

/// Cascade trigger that ignores every document.
#[derive(Clone, Default)]
pub struct NoOpCascadeTrigger;

#[async_trait]
impl CascadeTrigger for NoOpCascadeTrigger {
    async fn trigger(&self, _document: PipelineDocument) {}
}

/// Mock trigger for testing - collects every document it receives.
#[derive(Clone, Default)]
pub struct MockCascadeTrigger {
    documents: Arc<Mutex<Vec<PipelineDocument>>>,
}

impl MockCascadeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> Vec<PipelineDocument> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CascadeTrigger for MockCascadeTrigger {
    async fn trigger(&self, document: PipelineDocument) {
        if let Ok(mut docs) = self.documents.lock() {
            docs.push(document);
        }
    }
}

/// A mechanism that observes entity writes and hands the resulting
/// documents to a [`CascadeTrigger`].
#[async_trait]
pub trait TriggerSource: Send + Sync {
    fn kind(&self) -> TriggerSourceKind;

    /// Attaches to the store. Attachment is best-effort per collection; the
    /// returned list names the collections that were attached. An error
    /// means nothing was attached.
    async fn start(&self, dispatcher: Arc<dyn CascadeTrigger>) -> Result<Vec<Collection>>;
}
