//! Types describing the entity store boundary: collections, documents,
//! topology, change events and lifecycle hook payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::collections;
use crate::leads::{Lead, LeadStatus};
use crate::opportunities::{Opportunity, SalesPhase};
use crate::orders::Order;
use crate::quotes::{Quote, QuoteStatus};

/// The four watched pipeline collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Leads,
    Opportunities,
    Quotes,
    Orders,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Leads,
        Collection::Opportunities,
        Collection::Quotes,
        Collection::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Leads => collections::LEADS,
            Collection::Opportunities => collections::OPPORTUNITIES,
            Collection::Quotes => collections::QUOTES,
            Collection::Orders => collections::ORDERS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full current state of one pipeline entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "document", rename_all = "snake_case")]
pub enum PipelineDocument {
    Lead(Lead),
    Opportunity(Opportunity),
    Quote(Quote),
    Order(Order),
}

impl PipelineDocument {
    pub fn collection(&self) -> Collection {
        match self {
            PipelineDocument::Lead(_) => Collection::Leads,
            PipelineDocument::Opportunity(_) => Collection::Opportunities,
            PipelineDocument::Quote(_) => Collection::Quotes,
            PipelineDocument::Order(_) => Collection::Orders,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PipelineDocument::Lead(lead) => &lead.id,
            PipelineDocument::Opportunity(opportunity) => &opportunity.id,
            PipelineDocument::Quote(quote) => &quote.id,
            PipelineDocument::Order(order) => &order.id,
        }
    }

    /// Returns true if the document's current state satisfies the
    /// precondition of at least one cascade rule.
    pub fn meets_cascade_precondition(&self) -> bool {
        match self {
            PipelineDocument::Lead(lead) => lead.status == LeadStatus::Qualified,
            PipelineDocument::Opportunity(opportunity) => {
                opportunity.sales_phase == SalesPhase::Quotation
            }
            PipelineDocument::Quote(quote) => {
                matches!(quote.status, QuoteStatus::Order | QuoteStatus::NoOrder)
            }
            PipelineDocument::Order(order) => order.status.is_terminal(),
        }
    }

    pub fn query(&self) -> DocumentQuery {
        DocumentQuery::new(self.collection(), self.id())
    }
}

/// Deployment topology reported by the store's administrative interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreTopology {
    Standalone,
    ReplicaSet { set_name: String },
    Sharded,
}

impl StoreTopology {
    /// Only replicated topologies emit change notifications.
    pub fn supports_change_feed(&self) -> bool {
        matches!(
            self,
            StoreTopology::ReplicaSet { .. } | StoreTopology::Sharded
        )
    }
}

/// Write operation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert,
    Update,
    Replace,
    Delete,
}

/// Whether update events carry the post-operation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullDocument {
    /// Only inserts and replaces carry a document.
    #[default]
    Default,
    /// Updates look up the current document at delivery time.
    UpdateLookup,
}

/// Server-side filter for a change feed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub operations: Vec<ChangeOperation>,
    pub full_document: FullDocument,
}

impl WatchOptions {
    /// Insert/update/replace with full post-operation documents.
    pub fn for_cascades() -> Self {
        Self {
            operations: vec![
                ChangeOperation::Insert,
                ChangeOperation::Update,
                ChangeOperation::Replace,
            ],
            full_document: FullDocument::UpdateLookup,
        }
    }

    pub fn accepts(&self, operation: ChangeOperation) -> bool {
        self.operations.contains(&operation)
    }
}

/// One notification delivered by a change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub operation: ChangeOperation,
    pub collection: Collection,
    pub document_id: String,
    pub full_document: Option<PipelineDocument>,
}

/// Lifecycle hook variants a store can fire after a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PostCreate,
    PostUpdate,
}

/// Query identifying a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentQuery {
    pub collection: Collection,
    pub id: String,
}

impl DocumentQuery {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

/// What a lifecycle hook receives.
///
/// Post-create hooks see the created document; post-update hooks only see
/// the query that matched, so consumers must re-fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    Created(PipelineDocument),
    Updated(DocumentQuery),
}

impl HookPayload {
    pub fn query(&self) -> DocumentQuery {
        match self {
            HookPayload::Created(document) => document.query(),
            HookPayload::Updated(query) => query.clone(),
        }
    }
}
