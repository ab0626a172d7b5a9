//! Opportunity repository and service traits.

use async_trait::async_trait;

use super::opportunities_model::{
    NewOpportunity, Opportunity, OpportunityLinks, OpportunityStatus, OpportunityUpdate,
};
use crate::errors::Result;

/// Trait defining the contract for Opportunity repository operations.
#[async_trait]
pub trait OpportunityRepositoryTrait: Send + Sync {
    /// Creates a new opportunity.
    ///
    /// Fails with `DatabaseError::UniqueViolation` if another opportunity
    /// already references the same origin lead.
    async fn create(&self, new_opportunity: NewOpportunity) -> Result<Opportunity>;

    async fn update(&self, opportunity_update: OpportunityUpdate) -> Result<Opportunity>;

    /// Writes engine-owned link fields with set-if-unset semantics.
    async fn set_links(&self, opportunity_id: &str, links: OpportunityLinks)
        -> Result<Opportunity>;

    async fn set_status(
        &self,
        opportunity_id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity>;

    fn find_by_id(&self, opportunity_id: &str) -> Result<Option<Opportunity>>;

    /// Finds the opportunity originating from the given lead.
    fn find_by_lead_id(&self, lead_id: &str) -> Result<Option<Opportunity>>;

    /// Reverse lookup on `linked_quote_id`.
    fn find_by_linked_quote_id(&self, quote_id: &str) -> Result<Option<Opportunity>>;

    /// Reverse lookup on `linked_order_id`.
    fn find_by_linked_order_id(&self, order_id: &str) -> Result<Option<Opportunity>>;

    fn list(&self) -> Result<Vec<Opportunity>>;
}

/// Trait defining the contract for Opportunity service operations.
#[async_trait]
pub trait OpportunityServiceTrait: Send + Sync {
    async fn create_opportunity(&self, new_opportunity: NewOpportunity) -> Result<Opportunity>;

    async fn update_opportunity(&self, opportunity_update: OpportunityUpdate)
        -> Result<Opportunity>;

    fn get_opportunity(&self, opportunity_id: &str) -> Result<Opportunity>;

    fn list_opportunities(&self) -> Result<Vec<Opportunity>>;
}
