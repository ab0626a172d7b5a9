//! Opportunities module - domain models, services, and traits.

mod opportunities_model;
mod opportunities_service;
mod opportunities_traits;

pub use opportunities_model::{
    NewOpportunity, Opportunity, OpportunityLinks, OpportunityStatus, OpportunityUpdate,
    SalesPhase,
};
pub use opportunities_service::OpportunityService;
pub use opportunities_traits::{OpportunityRepositoryTrait, OpportunityServiceTrait};
