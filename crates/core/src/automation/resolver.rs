use std::sync::Arc;

use log::debug;

use crate::errors::Result;
use crate::opportunities::{Opportunity, OpportunityRepositoryTrait};
use crate::orders::Order;
use crate::quotes::{Quote, QuoteRepositoryTrait};

/// Finds the opportunity that owns a quote or an order.
///
/// Lookups are tried in order and the first hit wins.
///
/// For a quote:
/// 1. `quote.opportunity_id`
/// 2. the opportunity whose `linked_quote_id` is the quote
///
/// For an order:
/// 1. `order.opportunity_id`
/// 2. the opportunity whose `linked_order_id` is the order
/// 3. the order's quote, resolved as above (falling back to the reverse
///    `linked_quote_id` lookup when the quote itself is gone)
#[derive(Clone)]
pub struct OpportunityResolver {
    opportunities: Arc<dyn OpportunityRepositoryTrait>,
    quotes: Arc<dyn QuoteRepositoryTrait>,
}

impl OpportunityResolver {
    pub fn new(
        opportunities: Arc<dyn OpportunityRepositoryTrait>,
        quotes: Arc<dyn QuoteRepositoryTrait>,
    ) -> Self {
        Self {
            opportunities,
            quotes,
        }
    }

    pub fn for_quote(&self, quote: &Quote) -> Result<Option<Opportunity>> {
        if let Some(opportunity_id) = &quote.opportunity_id {
            if let Some(opportunity) = self.opportunities.find_by_id(opportunity_id)? {
                return Ok(Some(opportunity));
            }
            debug!(
                "Quote {} references missing opportunity {}",
                quote.id, opportunity_id
            );
        }
        self.opportunities.find_by_linked_quote_id(&quote.id)
    }

    pub fn for_order(&self, order: &Order) -> Result<Option<Opportunity>> {
        if let Some(opportunity_id) = &order.opportunity_id {
            if let Some(opportunity) = self.opportunities.find_by_id(opportunity_id)? {
                return Ok(Some(opportunity));
            }
        }
        if let Some(opportunity) = self.opportunities.find_by_linked_order_id(&order.id)? {
            return Ok(Some(opportunity));
        }
        let Some(quote_id) = &order.quote_id else {
            return Ok(None);
        };
        match self.quotes.find_by_id(quote_id)? {
            Some(quote) => self.for_quote(&quote),
            None => self.opportunities.find_by_linked_quote_id(quote_id),
        }
    }
}
