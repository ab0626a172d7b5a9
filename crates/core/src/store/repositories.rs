use std::sync::Arc;

use super::store_model::{Collection, DocumentQuery, PipelineDocument};
use crate::errors::Result;
use crate::leads::LeadRepositoryTrait;
use crate::opportunities::OpportunityRepositoryTrait;
use crate::orders::OrderRepositoryTrait;
use crate::quotes::QuoteRepositoryTrait;

/// The four pipeline repositories, bundled for the automation engine.
#[derive(Clone)]
pub struct PipelineRepositories {
    pub leads: Arc<dyn LeadRepositoryTrait>,
    pub opportunities: Arc<dyn OpportunityRepositoryTrait>,
    pub quotes: Arc<dyn QuoteRepositoryTrait>,
    pub orders: Arc<dyn OrderRepositoryTrait>,
}

impl PipelineRepositories {
    /// Resolves the canonical current document for `query`.
    pub fn load(&self, query: &DocumentQuery) -> Result<Option<PipelineDocument>> {
        let document = match query.collection {
            Collection::Leads => self
                .leads
                .find_by_id(&query.id)?
                .map(PipelineDocument::Lead),
            Collection::Opportunities => self
                .opportunities
                .find_by_id(&query.id)?
                .map(PipelineDocument::Opportunity),
            Collection::Quotes => self
                .quotes
                .find_by_id(&query.id)?
                .map(PipelineDocument::Quote),
            Collection::Orders => self
                .orders
                .find_by_id(&query.id)?
                .map(PipelineDocument::Order),
        };
        Ok(document)
    }
}
