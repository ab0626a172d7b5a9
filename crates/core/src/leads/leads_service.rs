use log::debug;
use std::sync::Arc;

use super::leads_model::{Lead, LeadUpdate, NewLead};
use super::leads_traits::{LeadRepositoryTrait, LeadServiceTrait};
use crate::automation::CascadeTrigger;
use crate::errors::{DatabaseError, Error, Result};
use crate::store::PipelineDocument;

/// Service for managing leads.
///
/// After a successful write whose resulting status already qualifies for a
/// cascade, the service invokes the cascade directly so a status set at
/// creation time is never missed by the active trigger source.
pub struct LeadService {
    repository: Arc<dyn LeadRepositoryTrait>,
    cascade: Arc<dyn CascadeTrigger>,
}

impl LeadService {
    pub fn new(repository: Arc<dyn LeadRepositoryTrait>, cascade: Arc<dyn CascadeTrigger>) -> Self {
        Self {
            repository,
            cascade,
        }
    }

    async fn cascade_if_qualifying(&self, lead: &Lead) {
        let document = PipelineDocument::Lead(lead.clone());
        if document.meets_cascade_precondition() {
            debug!("Lead {} is {}, invoking cascade directly", lead.id, lead.status);
            self.cascade.trigger(document).await;
        }
    }
}

#[async_trait::async_trait]
impl LeadServiceTrait for LeadService {
    async fn create_lead(&self, new_lead: NewLead) -> Result<Lead> {
        new_lead.validate()?;
        let lead = self.repository.create(new_lead).await?;
        self.cascade_if_qualifying(&lead).await;
        Ok(lead)
    }

    async fn update_lead(&self, lead_update: LeadUpdate) -> Result<Lead> {
        lead_update.validate()?;
        let lead = self.repository.update(lead_update).await?;
        self.cascade_if_qualifying(&lead).await;
        Ok(lead)
    }

    fn get_lead(&self, lead_id: &str) -> Result<Lead> {
        self.repository.find_by_id(lead_id)?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!("Lead {}", lead_id)))
        })
    }

    fn list_leads(&self) -> Result<Vec<Lead>> {
        self.repository.list()
    }
}
