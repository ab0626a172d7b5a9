//! The five pipeline cascade rules.
//!
//! Each rule runs precondition, idempotency guard, effect, audit and notify,
//! in that order. Audit and notification failures are logged and dropped;
//! everything else is returned to the dispatcher.

use std::sync::Arc;

use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::automation_model::{CascadeRecord, RuleOutcome, SkipReason};
use super::creation_locks::{edges, CreationLocks};
use super::resolver::OpportunityResolver;
use crate::audit::{AuditLogger, NewAutomationLogEntry};
use crate::constants::actions;
use crate::errors::Result;
use crate::events::{RealtimeNotifier, Severity};
use crate::leads::{Lead, LeadLinks, LeadStatus};
use crate::opportunities::{
    NewOpportunity, Opportunity, OpportunityLinks, OpportunityStatus, SalesPhase,
};
use crate::orders::{NewOrder, Order, OrderStatus};
use crate::quotes::{NewQuote, Quote, QuoteLinks, QuoteStatus};
use crate::store::{Collection, PipelineRepositories};

pub struct CascadeRules {
    repositories: PipelineRepositories,
    resolver: OpportunityResolver,
    locks: CreationLocks,
    audit: AuditLogger,
    notifier: Arc<RealtimeNotifier>,
}

impl CascadeRules {
    pub fn new(
        repositories: PipelineRepositories,
        audit: AuditLogger,
        notifier: Arc<RealtimeNotifier>,
    ) -> Self {
        let resolver = OpportunityResolver::new(
            repositories.opportunities.clone(),
            repositories.quotes.clone(),
        );
        Self {
            repositories,
            resolver,
            locks: CreationLocks::new(),
            audit,
            notifier,
        }
    }

    /// Lead qualified: create the opportunity and back-link the lead.
    pub async fn qualify_lead(&self, lead: &Lead) -> Result<RuleOutcome> {
        if lead.status != LeadStatus::Qualified {
            return Ok(RuleOutcome::Skipped(SkipReason::PreconditionUnmet));
        }

        let _guard = self.locks.acquire(edges::LEAD_OPPORTUNITY, &lead.id).await;

        let current = self.repositories.leads.find_by_id(&lead.id)?;
        let current = current.as_ref().unwrap_or(lead);
        if current.linked_opportunity_id.is_some() {
            return Ok(RuleOutcome::Skipped(SkipReason::AlreadyLinked));
        }
        if self
            .repositories
            .opportunities
            .find_by_lead_id(&lead.id)?
            .is_some()
        {
            return Ok(RuleOutcome::Skipped(SkipReason::TargetExists));
        }

        let created = self
            .repositories
            .opportunities
            .create(NewOpportunity {
                id: None,
                name: current.name.clone(),
                contact: current.contact.clone(),
                sales_phase: SalesPhase::Qualification,
                status: OpportunityStatus::Open,
                expected_value: Decimal::ZERO,
                lead_id: Some(lead.id.clone()),
            })
            .await;
        let opportunity = match created {
            Ok(opportunity) => opportunity,
            Err(e) if e.is_unique_violation() => {
                return Ok(RuleOutcome::Skipped(SkipReason::TargetExists))
            }
            Err(e) => return Err(e),
        };

        self.repositories
            .leads
            .set_links(&lead.id, LeadLinks::opportunity(&opportunity.id))
            .await?;

        let record = CascadeRecord {
            action: actions::LEAD_TO_OPPORTUNITY,
            source_collection: Collection::Leads,
            source_id: lead.id.clone(),
            target_collection: Collection::Opportunities,
            target_id: opportunity.id.clone(),
        };
        self.finish(
            &record,
            Severity::Success,
            format!("Lead '{}' qualified: opportunity created", current.name),
            json!({ "leadId": lead.id, "opportunityId": opportunity.id }),
        )
        .await;
        Ok(RuleOutcome::Fired(record))
    }

    /// Opportunity reached quotation: create the quote and back-link.
    pub async fn advance_opportunity(&self, opportunity: &Opportunity) -> Result<RuleOutcome> {
        if opportunity.sales_phase != SalesPhase::Quotation {
            return Ok(RuleOutcome::Skipped(SkipReason::PreconditionUnmet));
        }

        let _guard = self
            .locks
            .acquire(edges::OPPORTUNITY_QUOTE, &opportunity.id)
            .await;

        let current = self.repositories.opportunities.find_by_id(&opportunity.id)?;
        let current = current.as_ref().unwrap_or(opportunity);
        if current.linked_quote_id.is_some() {
            return Ok(RuleOutcome::Skipped(SkipReason::AlreadyLinked));
        }
        if self
            .repositories
            .quotes
            .find_by_opportunity_id(&opportunity.id)?
            .is_some()
        {
            return Ok(RuleOutcome::Skipped(SkipReason::TargetExists));
        }

        let created = self
            .repositories
            .quotes
            .create(NewQuote {
                id: None,
                name: current.name.clone(),
                contact: current.contact.clone(),
                amount: current.expected_value,
                status: QuoteStatus::Open,
                opportunity_id: Some(opportunity.id.clone()),
                lead_id: current.lead_id.clone(),
            })
            .await;
        let quote = match created {
            Ok(quote) => quote,
            Err(e) if e.is_unique_violation() => {
                return Ok(RuleOutcome::Skipped(SkipReason::TargetExists))
            }
            Err(e) => return Err(e),
        };

        self.repositories
            .opportunities
            .set_links(&opportunity.id, OpportunityLinks::quote(&quote.id))
            .await?;
        if let Some(lead_id) = &current.lead_id {
            self.link_lead(lead_id, LeadLinks::quote(&quote.id)).await;
        }

        let record = CascadeRecord {
            action: actions::OPPORTUNITY_TO_QUOTE,
            source_collection: Collection::Opportunities,
            source_id: opportunity.id.clone(),
            target_collection: Collection::Quotes,
            target_id: quote.id.clone(),
        };
        self.finish(
            &record,
            Severity::Info,
            format!("Opportunity '{}' moved to quotation: quote created", current.name),
            json!({
                "opportunityId": opportunity.id,
                "quoteId": quote.id,
                "amount": quote.amount,
            }),
        )
        .await;
        Ok(RuleOutcome::Fired(record))
    }

    /// Quote accepted: create the order, link it everywhere and mark the
    /// owning opportunity won.
    pub async fn convert_quote_to_order(&self, quote: &Quote) -> Result<RuleOutcome> {
        if quote.status != QuoteStatus::Order {
            return Ok(RuleOutcome::Skipped(SkipReason::PreconditionUnmet));
        }

        let _guard = self.locks.acquire(edges::QUOTE_ORDER, &quote.id).await;

        let current = self.repositories.quotes.find_by_id(&quote.id)?;
        let current = current.as_ref().unwrap_or(quote);
        if current.linked_order_id.is_some() {
            return Ok(RuleOutcome::Skipped(SkipReason::AlreadyLinked));
        }
        if self
            .repositories
            .orders
            .find_by_quote_id(&quote.id)?
            .is_some()
        {
            return Ok(RuleOutcome::Skipped(SkipReason::TargetExists));
        }

        let owner = self.resolver.for_quote(current)?;
        let opportunity_id = current
            .opportunity_id
            .clone()
            .or_else(|| owner.as_ref().map(|o| o.id.clone()));
        let lead_id = current
            .lead_id
            .clone()
            .or_else(|| owner.as_ref().and_then(|o| o.lead_id.clone()));

        let created = self
            .repositories
            .orders
            .create(NewOrder {
                id: None,
                name: current.name.clone(),
                contact: current.contact.clone(),
                amount: current.amount,
                status: OrderStatus::Active,
                quote_id: Some(quote.id.clone()),
                opportunity_id,
                lead_id: lead_id.clone(),
            })
            .await;
        let order = match created {
            Ok(order) => order,
            Err(e) if e.is_unique_violation() => {
                return Ok(RuleOutcome::Skipped(SkipReason::TargetExists))
            }
            Err(e) => return Err(e),
        };

        self.repositories
            .quotes
            .set_links(&quote.id, QuoteLinks::order(&order.id))
            .await?;
        if let Some(owner) = &owner {
            self.repositories
                .opportunities
                .set_links(&owner.id, OpportunityLinks::order(&order.id))
                .await?;
            self.repositories
                .opportunities
                .set_status(&owner.id, OpportunityStatus::Won)
                .await?;
        } else {
            debug!("Quote {} has no owning opportunity to mark won", quote.id);
        }
        if let Some(lead_id) = &lead_id {
            self.link_lead(lead_id, LeadLinks::order(&order.id)).await;
        }

        let record = CascadeRecord {
            action: actions::QUOTE_TO_ORDER,
            source_collection: Collection::Quotes,
            source_id: quote.id.clone(),
            target_collection: Collection::Orders,
            target_id: order.id.clone(),
        };
        self.finish(
            &record,
            Severity::Success,
            format!("Quote '{}' accepted: order created", current.name),
            json!({
                "quoteId": quote.id,
                "orderId": order.id,
                "opportunityId": owner.as_ref().map(|o| o.id.clone()),
                "amount": order.amount,
            }),
        )
        .await;
        Ok(RuleOutcome::Fired(record))
    }

    /// Quote declined: the owning opportunity is lost.
    pub async fn mark_opportunity_lost(&self, quote: &Quote) -> Result<RuleOutcome> {
        if quote.status != QuoteStatus::NoOrder {
            return Ok(RuleOutcome::Skipped(SkipReason::PreconditionUnmet));
        }
        let Some(owner) = self.resolver.for_quote(quote)? else {
            return Ok(RuleOutcome::Skipped(SkipReason::NoOwningOpportunity));
        };
        let _guard = self.locks.acquire(edges::OPPORTUNITY_STATUS, &owner.id).await;
        let owner = self.reload_opportunity(owner)?;
        if owner.status == OpportunityStatus::Lost {
            return Ok(RuleOutcome::Skipped(SkipReason::AlreadyInState));
        }

        self.repositories
            .opportunities
            .set_status(&owner.id, OpportunityStatus::Lost)
            .await?;

        let record = CascadeRecord {
            action: actions::QUOTE_TO_OPPORTUNITY_LOST,
            source_collection: Collection::Quotes,
            source_id: quote.id.clone(),
            target_collection: Collection::Opportunities,
            target_id: owner.id.clone(),
        };
        self.finish(
            &record,
            Severity::Warning,
            format!("Quote '{}' declined: opportunity '{}' lost", quote.name, owner.name),
            json!({ "quoteId": quote.id, "opportunityId": owner.id }),
        )
        .await;
        Ok(RuleOutcome::Fired(record))
    }

    /// Order reached a terminal status: close out the owning opportunity.
    pub async fn propagate_order_status(&self, order: &Order) -> Result<RuleOutcome> {
        let (target, action, severity) = match order.status {
            OrderStatus::Completed => (
                OpportunityStatus::ClosedWon,
                actions::ORDER_TO_OPPORTUNITY_CLOSED_WON,
                Severity::Success,
            ),
            OrderStatus::Cancelled => (
                OpportunityStatus::Lost,
                actions::ORDER_TO_OPPORTUNITY_LOST,
                Severity::Warning,
            ),
            OrderStatus::Active => return Ok(RuleOutcome::Skipped(SkipReason::PreconditionUnmet)),
        };
        let Some(owner) = self.resolver.for_order(order)? else {
            return Ok(RuleOutcome::Skipped(SkipReason::NoOwningOpportunity));
        };
        let _guard = self.locks.acquire(edges::OPPORTUNITY_STATUS, &owner.id).await;
        let owner = self.reload_opportunity(owner)?;
        if owner.status == target {
            return Ok(RuleOutcome::Skipped(SkipReason::AlreadyInState));
        }

        self.repositories
            .opportunities
            .set_status(&owner.id, target)
            .await?;

        let record = CascadeRecord {
            action,
            source_collection: Collection::Orders,
            source_id: order.id.clone(),
            target_collection: Collection::Opportunities,
            target_id: owner.id.clone(),
        };
        self.finish(
            &record,
            severity,
            format!(
                "Order '{}' {}: opportunity '{}' set to {}",
                order.name,
                order.status.as_str().to_lowercase(),
                owner.name,
                target
            ),
            json!({
                "orderId": order.id,
                "opportunityId": owner.id,
                "status": target,
            }),
        )
        .await;
        Ok(RuleOutcome::Fired(record))
    }

    fn reload_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity> {
        Ok(self
            .repositories
            .opportunities
            .find_by_id(&opportunity.id)?
            .unwrap_or(opportunity))
    }

    /// Back-links onto the origin lead. The lead is a secondary target, so
    /// failure here does not undo the cascade.
    async fn link_lead(&self, lead_id: &str, links: LeadLinks) {
        if let Err(e) = self.repositories.leads.set_links(lead_id, links).await {
            warn!("Failed to back-link lead {}: {}", lead_id, e);
        }
    }

    async fn finish(&self, record: &CascadeRecord, severity: Severity, message: String, meta: Value) {
        let entry = NewAutomationLogEntry::new(
            record.action,
            record.source_collection.as_str(),
            record.source_id.as_str(),
        )
        .with_target(record.target_collection.as_str(), record.target_id.as_str())
        .with_details(meta.clone());
        if let Err(e) = self.audit.record(entry).await {
            debug!("Audit write for '{}' dropped: {}", record.action, e);
        }

        match self.notifier.emit(severity, &message, meta) {
            Ok(reached) => debug!("'{}' broadcast to {} observer(s)", record.action, reached),
            Err(e) => debug!("Broadcast for '{}' dropped: {}", record.action, e),
        }
    }
}
