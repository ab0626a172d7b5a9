//! Quote repository and service traits.

use async_trait::async_trait;

use super::quotes_model::{NewQuote, Quote, QuoteLinks, QuoteUpdate};
use crate::errors::Result;

/// Trait defining the contract for Quote repository operations.
#[async_trait]
pub trait QuoteRepositoryTrait: Send + Sync {
    /// Creates a new quote.
    ///
    /// Fails with `DatabaseError::UniqueViolation` if another quote already
    /// references the same origin opportunity.
    async fn create(&self, new_quote: NewQuote) -> Result<Quote>;

    async fn update(&self, quote_update: QuoteUpdate) -> Result<Quote>;

    async fn set_links(&self, quote_id: &str, links: QuoteLinks) -> Result<Quote>;

    fn find_by_id(&self, quote_id: &str) -> Result<Option<Quote>>;

    fn find_by_opportunity_id(&self, opportunity_id: &str) -> Result<Option<Quote>>;

    fn list(&self) -> Result<Vec<Quote>>;
}

/// Trait defining the contract for Quote service operations.
#[async_trait]
pub trait QuoteServiceTrait: Send + Sync {
    async fn create_quote(&self, new_quote: NewQuote) -> Result<Quote>;

    async fn update_quote(&self, quote_update: QuoteUpdate) -> Result<Quote>;

    fn get_quote(&self, quote_id: &str) -> Result<Quote>;

    fn list_quotes(&self) -> Result<Vec<Quote>>;
}
