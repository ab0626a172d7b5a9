use log::debug;
use std::sync::Arc;

use super::quotes_model::{NewQuote, Quote, QuoteUpdate};
use super::quotes_traits::{QuoteRepositoryTrait, QuoteServiceTrait};
use crate::automation::CascadeTrigger;
use crate::errors::{DatabaseError, Error, Result};
use crate::store::PipelineDocument;

/// Service for managing quotes.
pub struct QuoteService {
    repository: Arc<dyn QuoteRepositoryTrait>,
    cascade: Arc<dyn CascadeTrigger>,
}

impl QuoteService {
    pub fn new(repository: Arc<dyn QuoteRepositoryTrait>, cascade: Arc<dyn CascadeTrigger>) -> Self {
        Self {
            repository,
            cascade,
        }
    }

    async fn cascade_if_qualifying(&self, quote: &Quote) {
        let document = PipelineDocument::Quote(quote.clone());
        if document.meets_cascade_precondition() {
            debug!("Quote {} marked {}, invoking cascade directly", quote.id, quote.status);
            self.cascade.trigger(document).await;
        }
    }
}

#[async_trait::async_trait]
impl QuoteServiceTrait for QuoteService {
    async fn create_quote(&self, new_quote: NewQuote) -> Result<Quote> {
        new_quote.validate()?;
        let quote = self.repository.create(new_quote).await?;
        self.cascade_if_qualifying(&quote).await;
        Ok(quote)
    }

    async fn update_quote(&self, quote_update: QuoteUpdate) -> Result<Quote> {
        quote_update.validate()?;
        let quote = self.repository.update(quote_update).await?;
        self.cascade_if_qualifying(&quote).await;
        Ok(quote)
    }

    fn get_quote(&self, quote_id: &str) -> Result<Quote> {
        self.repository.find_by_id(quote_id)?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!("Quote {}", quote_id)))
        })
    }

    fn list_quotes(&self) -> Result<Vec<Quote>> {
        self.repository.list()
    }
}
