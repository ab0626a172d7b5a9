use log::debug;
use std::sync::Arc;

use super::opportunities_model::{NewOpportunity, Opportunity, OpportunityUpdate};
use super::opportunities_traits::{OpportunityRepositoryTrait, OpportunityServiceTrait};
use crate::automation::CascadeTrigger;
use crate::errors::{DatabaseError, Error, Result};
use crate::store::PipelineDocument;

/// Service for managing opportunities.
pub struct OpportunityService {
    repository: Arc<dyn OpportunityRepositoryTrait>,
    cascade: Arc<dyn CascadeTrigger>,
}

impl OpportunityService {
    pub fn new(
        repository: Arc<dyn OpportunityRepositoryTrait>,
        cascade: Arc<dyn CascadeTrigger>,
    ) -> Self {
        Self {
            repository,
            cascade,
        }
    }

    async fn cascade_if_qualifying(&self, opportunity: &Opportunity) {
        let document = PipelineDocument::Opportunity(opportunity.clone());
        if document.meets_cascade_precondition() {
            debug!(
                "Opportunity {} reached {}, invoking cascade directly",
                opportunity.id, opportunity.sales_phase
            );
            self.cascade.trigger(document).await;
        }
    }
}

#[async_trait::async_trait]
impl OpportunityServiceTrait for OpportunityService {
    async fn create_opportunity(&self, new_opportunity: NewOpportunity) -> Result<Opportunity> {
        new_opportunity.validate()?;
        let opportunity = self.repository.create(new_opportunity).await?;
        self.cascade_if_qualifying(&opportunity).await;
        Ok(opportunity)
    }

    async fn update_opportunity(
        &self,
        opportunity_update: OpportunityUpdate,
    ) -> Result<Opportunity> {
        opportunity_update.validate()?;
        let opportunity = self.repository.update(opportunity_update).await?;
        self.cascade_if_qualifying(&opportunity).await;
        Ok(opportunity)
    }

    fn get_opportunity(&self, opportunity_id: &str) -> Result<Opportunity> {
        self.repository.find_by_id(opportunity_id)?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!(
                "Opportunity {}",
                opportunity_id
            )))
        })
    }

    fn list_opportunities(&self) -> Result<Vec<Opportunity>> {
        self.repository.list()
    }
}
