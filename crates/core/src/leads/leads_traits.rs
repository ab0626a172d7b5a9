//! Lead repository and service traits.

use async_trait::async_trait;

use super::leads_model::{Lead, LeadLinks, LeadUpdate, NewLead};
use crate::errors::Result;

/// Trait defining the contract for Lead repository operations.
///
/// Implementations must fire the post-create and post-update lifecycle hooks
/// (when the store supports them) only after the write has committed.
#[async_trait]
pub trait LeadRepositoryTrait: Send + Sync {
    async fn create(&self, new_lead: NewLead) -> Result<Lead>;

    async fn update(&self, lead_update: LeadUpdate) -> Result<Lead>;

    /// Writes engine-owned link fields. Fields that are already set keep
    /// their current value.
    async fn set_links(&self, lead_id: &str, links: LeadLinks) -> Result<Lead>;

    fn find_by_id(&self, lead_id: &str) -> Result<Option<Lead>>;

    fn list(&self) -> Result<Vec<Lead>>;
}

/// Trait defining the contract for Lead service operations.
#[async_trait]
pub trait LeadServiceTrait: Send + Sync {
    async fn create_lead(&self, new_lead: NewLead) -> Result<Lead>;

    async fn update_lead(&self, lead_update: LeadUpdate) -> Result<Lead>;

    fn get_lead(&self, lead_id: &str) -> Result<Lead>;

    fn list_leads(&self) -> Result<Vec<Lead>>;
}
