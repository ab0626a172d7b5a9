//! In-memory entity store.
//!
//! Used by tests and by the server's `memory` store mode. It can emulate
//! either topology: as a replica set it serves a live change feed, and in
//! both modes it fires post-write lifecycle hooks. Origin-link uniqueness is
//! enforced the same way the SQLite indexes enforce it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use log::debug;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use super::hooks::HookRegistry;
use super::repositories::PipelineRepositories;
use super::store_model::{
    ChangeEvent, ChangeOperation, Collection, DocumentQuery, FullDocument, HookKind, HookPayload,
    PipelineDocument, StoreTopology, WatchOptions,
};
use super::store_traits::{
    ChangeFeedTrait, ChangeStream, LifecycleHook, LifecycleHookRegistry, StoreAdminTrait,
};
use crate::audit::{AutomationLogEntry, AutomationLogRepositoryTrait, NewAutomationLogEntry};
use crate::errors::{AutomationError, DatabaseError, Error, Result};
use crate::leads::{Lead, LeadLinks, LeadRepositoryTrait, LeadUpdate, NewLead};
use crate::opportunities::{
    NewOpportunity, Opportunity, OpportunityLinks, OpportunityRepositoryTrait, OpportunityStatus,
    OpportunityUpdate,
};
use crate::orders::{NewOrder, Order, OrderRepositoryTrait, OrderUpdate};
use crate::quotes::{NewQuote, Quote, QuoteLinks, QuoteRepositoryTrait, QuoteUpdate};

const FEED_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum FeedMessage {
    Change(ChangeEvent),
    Fault(String),
}

struct MemoryState {
    topology: StoreTopology,
    topology_probe_fails: bool,
    leads: HashMap<String, Lead>,
    opportunities: HashMap<String, Opportunity>,
    quotes: HashMap<String, Quote>,
    orders: HashMap<String, Order>,
    logs: Vec<AutomationLogEntry>,
    failing_writes: HashSet<Collection>,
    failing_audit: bool,
}

impl MemoryState {
    fn new(topology: StoreTopology) -> Self {
        Self {
            topology,
            topology_probe_fails: false,
            leads: HashMap::new(),
            opportunities: HashMap::new(),
            quotes: HashMap::new(),
            orders: HashMap::new(),
            logs: Vec::new(),
            failing_writes: HashSet::new(),
            failing_audit: false,
        }
    }

    fn ensure_writable(&self, collection: Collection) -> Result<()> {
        if self.failing_writes.contains(&collection) {
            return Err(Error::Database(DatabaseError::QueryFailed(format!(
                "simulated write failure on {}",
                collection
            ))));
        }
        Ok(())
    }

    fn document(&self, query: &DocumentQuery) -> Option<PipelineDocument> {
        match query.collection {
            Collection::Leads => self.leads.get(&query.id).cloned().map(PipelineDocument::Lead),
            Collection::Opportunities => self
                .opportunities
                .get(&query.id)
                .cloned()
                .map(PipelineDocument::Opportunity),
            Collection::Quotes => self.quotes.get(&query.id).cloned().map(PipelineDocument::Quote),
            Collection::Orders => self.orders.get(&query.id).cloned().map(PipelineDocument::Order),
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn new_id(requested: Option<String>) -> String {
    requested
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn not_found(kind: &str, id: &str) -> Error {
    Error::Database(DatabaseError::NotFound(format!("{} {}", kind, id)))
}

fn duplicate(what: String) -> Error {
    Error::Database(DatabaseError::UniqueViolation(what))
}

fn sorted_by_creation<T: Clone>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (NaiveDateTime, String),
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

/// Thread-safe in-memory pipeline store.
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    feeds: Mutex<HashMap<Collection, broadcast::Sender<FeedMessage>>>,
    hooks: HookRegistry,
}

impl InMemoryStore {
    pub fn new(topology: StoreTopology) -> Self {
        let feeds = Collection::ALL
            .iter()
            .map(|collection| {
                let (sender, _receiver) = broadcast::channel(FEED_CAPACITY);
                (*collection, sender)
            })
            .collect();
        Self {
            state: Arc::new(Mutex::new(MemoryState::new(topology))),
            feeds: Mutex::new(feeds),
            hooks: HookRegistry::new(),
        }
    }

    /// A store that reports a single-node topology and serves no feed.
    pub fn standalone() -> Self {
        Self::new(StoreTopology::Standalone)
    }

    /// A store that reports a replica set and serves a live feed.
    pub fn replica_set() -> Self {
        Self::new(StoreTopology::ReplicaSet {
            set_name: "rs0".to_string(),
        })
    }

    /// Bundles this store behind the repository traits.
    pub fn repositories(self: &Arc<Self>) -> PipelineRepositories {
        PipelineRepositories {
            leads: self.clone(),
            opportunities: self.clone(),
            quotes: self.clone(),
            orders: self.clone(),
        }
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Makes every subsequent write to `collection` fail (or succeed again).
    pub fn fail_writes(&self, collection: Collection, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            if failing {
                state.failing_writes.insert(collection);
            } else {
                state.failing_writes.remove(&collection);
            }
        }
    }

    /// Makes every subsequent audit insert fail.
    pub fn fail_audit_writes(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_audit = failing;
        }
    }

    /// Makes the topology probe fail.
    pub fn fail_topology_probe(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.topology_probe_fails = true;
        }
    }

    /// Pushes a fault into the live feed of `collection`.
    pub fn inject_feed_fault(&self, collection: Collection, reason: &str) {
        if let Ok(feeds) = self.feeds.lock() {
            if let Some(sender) = feeds.get(&collection) {
                let _ = sender.send(FeedMessage::Fault(reason.to_string()));
            }
        }
    }

    /// Closes the live feed of `collection`; open subscriptions end.
    pub fn close_feed(&self, collection: Collection) {
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.remove(&collection);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| Error::Database(DatabaseError::Internal(e.to_string())))
    }

    /// Publishes a committed write to the feed and fires lifecycle hooks.
    fn commit(&self, operation: ChangeOperation, document: PipelineDocument) {
        let collection = document.collection();
        let event = ChangeEvent {
            operation,
            collection,
            document_id: document.id().to_string(),
            full_document: Some(document.clone()),
        };
        if let Ok(feeds) = self.feeds.lock() {
            if let Some(sender) = feeds.get(&collection) {
                // No receivers is fine: nobody is watching this collection.
                let _ = sender.send(FeedMessage::Change(event));
            }
        }

        match operation {
            ChangeOperation::Insert => {
                self.hooks
                    .fire(collection, HookKind::PostCreate, HookPayload::Created(document))
            }
            ChangeOperation::Update | ChangeOperation::Replace => self.hooks.fire(
                collection,
                HookKind::PostUpdate,
                HookPayload::Updated(document.query()),
            ),
            ChangeOperation::Delete => {}
        }
    }
}

#[async_trait]
impl StoreAdminTrait for InMemoryStore {
    async fn topology(&self) -> Result<StoreTopology> {
        let state = self.lock()?;
        if state.topology_probe_fails {
            return Err(Error::Database(DatabaseError::ConnectionFailed(
                "administrative command refused".to_string(),
            )));
        }
        Ok(state.topology.clone())
    }
}

impl ChangeFeedTrait for InMemoryStore {
    fn watch(&self, collection: Collection, options: WatchOptions) -> Result<ChangeStream> {
        if !self.lock()?.topology.supports_change_feed() {
            return Err(AutomationError::SubscriptionFailed {
                collection: collection.to_string(),
                reason: "change feeds require a replicated topology".to_string(),
            }
            .into());
        }

        let receiver = {
            let feeds = self
                .feeds
                .lock()
                .map_err(|e| Error::Database(DatabaseError::Internal(e.to_string())))?;
            feeds
                .get(&collection)
                .map(broadcast::Sender::subscribe)
                .ok_or_else(|| AutomationError::SubscriptionFailed {
                    collection: collection.to_string(),
                    reason: "feed is closed".to_string(),
                })?
        };

        let state = self.state.clone();
        let stream = BroadcastStream::new(receiver).filter_map(move |message| match message {
            Ok(FeedMessage::Change(mut event)) => {
                if !options.accepts(event.operation) {
                    return None;
                }
                if event.operation == ChangeOperation::Update {
                    event.full_document = match options.full_document {
                        FullDocument::UpdateLookup => {
                            let query = DocumentQuery::new(event.collection, &event.document_id);
                            state.lock().ok().and_then(|s| s.document(&query))
                        }
                        FullDocument::Default => None,
                    };
                }
                Some(Ok(event))
            }
            Ok(FeedMessage::Fault(reason)) => Some(Err(AutomationError::SubscriptionFailed {
                collection: collection.to_string(),
                reason,
            }
            .into())),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                Some(Err(AutomationError::SubscriptionFailed {
                    collection: collection.to_string(),
                    reason: format!("subscriber lagged by {} events", skipped),
                }
                .into()))
            }
        });

        debug!("Opened in-memory change feed on {}", collection);
        Ok(Box::pin(stream))
    }
}

impl LifecycleHookRegistry for InMemoryStore {
    fn register_hook(
        &self,
        collection: Collection,
        kind: HookKind,
        hook: LifecycleHook,
    ) -> Result<()> {
        self.hooks.register_hook(collection, kind, hook)
    }
}

#[async_trait]
impl LeadRepositoryTrait for InMemoryStore {
    async fn create(&self, new_lead: NewLead) -> Result<Lead> {
        let lead = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Leads)?;
            let id = new_id(new_lead.id);
            if state.leads.contains_key(&id) {
                return Err(duplicate(format!("lead {}", id)));
            }
            let timestamp = now();
            let lead = Lead {
                id: id.clone(),
                name: new_lead.name,
                contact: new_lead.contact,
                status: new_lead.status,
                linked_opportunity_id: None,
                linked_quote_id: None,
                linked_order_id: None,
                created_at: timestamp,
                updated_at: timestamp,
            };
            state.leads.insert(id, lead.clone());
            lead
        };
        self.commit(ChangeOperation::Insert, PipelineDocument::Lead(lead.clone()));
        Ok(lead)
    }

    async fn update(&self, lead_update: LeadUpdate) -> Result<Lead> {
        let lead = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Leads)?;
            let lead = state
                .leads
                .get_mut(&lead_update.id)
                .ok_or_else(|| not_found("Lead", &lead_update.id))?;
            lead.name = lead_update.name;
            lead.contact = lead_update.contact;
            lead.status = lead_update.status;
            lead.updated_at = now();
            lead.clone()
        };
        self.commit(ChangeOperation::Update, PipelineDocument::Lead(lead.clone()));
        Ok(lead)
    }

    async fn set_links(&self, lead_id: &str, links: LeadLinks) -> Result<Lead> {
        let (lead, changed) = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Leads)?;
            let lead = state
                .leads
                .get_mut(lead_id)
                .ok_or_else(|| not_found("Lead", lead_id))?;
            let changed = links.apply_to(lead);
            if changed {
                lead.updated_at = now();
            }
            (lead.clone(), changed)
        };
        if changed {
            self.commit(ChangeOperation::Update, PipelineDocument::Lead(lead.clone()));
        }
        Ok(lead)
    }

    fn find_by_id(&self, lead_id: &str) -> Result<Option<Lead>> {
        Ok(self.lock()?.leads.get(lead_id).cloned())
    }

    fn list(&self) -> Result<Vec<Lead>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(state.leads.values().cloned(), |l| {
            (l.created_at, l.id.clone())
        }))
    }
}

#[async_trait]
impl OpportunityRepositoryTrait for InMemoryStore {
    async fn create(&self, new_opportunity: NewOpportunity) -> Result<Opportunity> {
        let opportunity = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Opportunities)?;
            let id = new_id(new_opportunity.id);
            if state.opportunities.contains_key(&id) {
                return Err(duplicate(format!("opportunity {}", id)));
            }
            if let Some(lead_id) = &new_opportunity.lead_id {
                if state
                    .opportunities
                    .values()
                    .any(|o| o.lead_id.as_ref() == Some(lead_id))
                {
                    return Err(duplicate(format!("opportunities.lead_id {}", lead_id)));
                }
            }
            let timestamp = now();
            let opportunity = Opportunity {
                id: id.clone(),
                name: new_opportunity.name,
                contact: new_opportunity.contact,
                sales_phase: new_opportunity.sales_phase,
                status: new_opportunity.status,
                expected_value: new_opportunity.expected_value,
                lead_id: new_opportunity.lead_id,
                linked_quote_id: None,
                linked_order_id: None,
                created_at: timestamp,
                updated_at: timestamp,
            };
            state.opportunities.insert(id, opportunity.clone());
            opportunity
        };
        self.commit(
            ChangeOperation::Insert,
            PipelineDocument::Opportunity(opportunity.clone()),
        );
        Ok(opportunity)
    }

    async fn update(&self, opportunity_update: OpportunityUpdate) -> Result<Opportunity> {
        let opportunity = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Opportunities)?;
            let opportunity = state
                .opportunities
                .get_mut(&opportunity_update.id)
                .ok_or_else(|| not_found("Opportunity", &opportunity_update.id))?;
            opportunity.name = opportunity_update.name;
            opportunity.contact = opportunity_update.contact;
            opportunity.sales_phase = opportunity_update.sales_phase;
            opportunity.status = opportunity_update.status;
            opportunity.expected_value = opportunity_update.expected_value;
            opportunity.updated_at = now();
            opportunity.clone()
        };
        self.commit(
            ChangeOperation::Update,
            PipelineDocument::Opportunity(opportunity.clone()),
        );
        Ok(opportunity)
    }

    async fn set_links(
        &self,
        opportunity_id: &str,
        links: OpportunityLinks,
    ) -> Result<Opportunity> {
        let (opportunity, changed) = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Opportunities)?;
            let opportunity = state
                .opportunities
                .get_mut(opportunity_id)
                .ok_or_else(|| not_found("Opportunity", opportunity_id))?;
            let changed = links.apply_to(opportunity);
            if changed {
                opportunity.updated_at = now();
            }
            (opportunity.clone(), changed)
        };
        if changed {
            self.commit(
                ChangeOperation::Update,
                PipelineDocument::Opportunity(opportunity.clone()),
            );
        }
        Ok(opportunity)
    }

    async fn set_status(
        &self,
        opportunity_id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity> {
        let (opportunity, changed) = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Opportunities)?;
            let opportunity = state
                .opportunities
                .get_mut(opportunity_id)
                .ok_or_else(|| not_found("Opportunity", opportunity_id))?;
            let changed = opportunity.status != status;
            if changed {
                opportunity.status = status;
                opportunity.updated_at = now();
            }
            (opportunity.clone(), changed)
        };
        if changed {
            self.commit(
                ChangeOperation::Update,
                PipelineDocument::Opportunity(opportunity.clone()),
            );
        }
        Ok(opportunity)
    }

    fn find_by_id(&self, opportunity_id: &str) -> Result<Option<Opportunity>> {
        Ok(self.lock()?.opportunities.get(opportunity_id).cloned())
    }

    fn find_by_lead_id(&self, lead_id: &str) -> Result<Option<Opportunity>> {
        Ok(self
            .lock()?
            .opportunities
            .values()
            .find(|o| o.lead_id.as_deref() == Some(lead_id))
            .cloned())
    }

    fn find_by_linked_quote_id(&self, quote_id: &str) -> Result<Option<Opportunity>> {
        Ok(self
            .lock()?
            .opportunities
            .values()
            .find(|o| o.linked_quote_id.as_deref() == Some(quote_id))
            .cloned())
    }

    fn find_by_linked_order_id(&self, order_id: &str) -> Result<Option<Opportunity>> {
        Ok(self
            .lock()?
            .opportunities
            .values()
            .find(|o| o.linked_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Opportunity>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(state.opportunities.values().cloned(), |o| {
            (o.created_at, o.id.clone())
        }))
    }
}

#[async_trait]
impl QuoteRepositoryTrait for InMemoryStore {
    async fn create(&self, new_quote: NewQuote) -> Result<Quote> {
        let quote = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Quotes)?;
            let id = new_id(new_quote.id);
            if state.quotes.contains_key(&id) {
                return Err(duplicate(format!("quote {}", id)));
            }
            if let Some(opportunity_id) = &new_quote.opportunity_id {
                if state
                    .quotes
                    .values()
                    .any(|q| q.opportunity_id.as_ref() == Some(opportunity_id))
                {
                    return Err(duplicate(format!(
                        "quotes.opportunity_id {}",
                        opportunity_id
                    )));
                }
            }
            let timestamp = now();
            let quote = Quote {
                id: id.clone(),
                name: new_quote.name,
                contact: new_quote.contact,
                amount: new_quote.amount,
                status: new_quote.status,
                opportunity_id: new_quote.opportunity_id,
                lead_id: new_quote.lead_id,
                linked_order_id: None,
                created_at: timestamp,
                updated_at: timestamp,
            };
            state.quotes.insert(id, quote.clone());
            quote
        };
        self.commit(ChangeOperation::Insert, PipelineDocument::Quote(quote.clone()));
        Ok(quote)
    }

    async fn update(&self, quote_update: QuoteUpdate) -> Result<Quote> {
        let quote = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Quotes)?;
            let quote = state
                .quotes
                .get_mut(&quote_update.id)
                .ok_or_else(|| not_found("Quote", &quote_update.id))?;
            quote.name = quote_update.name;
            quote.contact = quote_update.contact;
            quote.amount = quote_update.amount;
            quote.status = quote_update.status;
            quote.updated_at = now();
            quote.clone()
        };
        self.commit(ChangeOperation::Update, PipelineDocument::Quote(quote.clone()));
        Ok(quote)
    }

    async fn set_links(&self, quote_id: &str, links: QuoteLinks) -> Result<Quote> {
        let (quote, changed) = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Quotes)?;
            let quote = state
                .quotes
                .get_mut(quote_id)
                .ok_or_else(|| not_found("Quote", quote_id))?;
            let changed = links.apply_to(quote);
            if changed {
                quote.updated_at = now();
            }
            (quote.clone(), changed)
        };
        if changed {
            self.commit(ChangeOperation::Update, PipelineDocument::Quote(quote.clone()));
        }
        Ok(quote)
    }

    fn find_by_id(&self, quote_id: &str) -> Result<Option<Quote>> {
        Ok(self.lock()?.quotes.get(quote_id).cloned())
    }

    fn find_by_opportunity_id(&self, opportunity_id: &str) -> Result<Option<Quote>> {
        Ok(self
            .lock()?
            .quotes
            .values()
            .find(|q| q.opportunity_id.as_deref() == Some(opportunity_id))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Quote>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(state.quotes.values().cloned(), |q| {
            (q.created_at, q.id.clone())
        }))
    }
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryStore {
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let order = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Orders)?;
            let id = new_id(new_order.id);
            if state.orders.contains_key(&id) {
                return Err(duplicate(format!("order {}", id)));
            }
            if let Some(quote_id) = &new_order.quote_id {
                if state
                    .orders
                    .values()
                    .any(|o| o.quote_id.as_ref() == Some(quote_id))
                {
                    return Err(duplicate(format!("orders.quote_id {}", quote_id)));
                }
            }
            let timestamp = now();
            let order = Order {
                id: id.clone(),
                name: new_order.name,
                contact: new_order.contact,
                amount: new_order.amount,
                status: new_order.status,
                quote_id: new_order.quote_id,
                opportunity_id: new_order.opportunity_id,
                lead_id: new_order.lead_id,
                created_at: timestamp,
                updated_at: timestamp,
            };
            state.orders.insert(id, order.clone());
            order
        };
        self.commit(ChangeOperation::Insert, PipelineDocument::Order(order.clone()));
        Ok(order)
    }

    async fn update(&self, order_update: OrderUpdate) -> Result<Order> {
        let order = {
            let mut state = self.lock()?;
            state.ensure_writable(Collection::Orders)?;
            let order = state
                .orders
                .get_mut(&order_update.id)
                .ok_or_else(|| not_found("Order", &order_update.id))?;
            order.name = order_update.name;
            order.contact = order_update.contact;
            order.amount = order_update.amount;
            order.status = order_update.status;
            order.updated_at = now();
            order.clone()
        };
        self.commit(ChangeOperation::Update, PipelineDocument::Order(order.clone()));
        Ok(order)
    }

    fn find_by_id(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.lock()?.orders.get(order_id).cloned())
    }

    fn find_by_quote_id(&self, quote_id: &str) -> Result<Option<Order>> {
        Ok(self
            .lock()?
            .orders
            .values()
            .find(|o| o.quote_id.as_deref() == Some(quote_id))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Order>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(state.orders.values().cloned(), |o| {
            (o.created_at, o.id.clone())
        }))
    }
}

#[async_trait]
impl AutomationLogRepositoryTrait for InMemoryStore {
    async fn insert(&self, entry: NewAutomationLogEntry) -> Result<AutomationLogEntry> {
        let mut state = self.lock()?;
        if state.failing_audit {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "simulated audit write failure".to_string(),
            )));
        }
        let record = AutomationLogEntry {
            id: Uuid::new_v4().to_string(),
            action: entry.action,
            source_collection: entry.source_collection,
            source_id: entry.source_id,
            target_collection: entry.target_collection,
            target_id: entry.target_id,
            details: entry.details,
            created_at: now(),
        };
        state.logs.push(record.clone());
        Ok(record)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<AutomationLogEntry>> {
        let state = self.lock()?;
        Ok(state.logs.iter().rev().take(limit).cloned().collect())
    }
}
