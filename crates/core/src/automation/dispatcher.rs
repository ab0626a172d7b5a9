use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use serde_json::json;

use super::automation_model::RuleOutcome;
use super::automation_traits::CascadeTrigger;
use super::rules::CascadeRules;
use crate::audit::{AuditLogger, NewAutomationLogEntry};
use crate::constants::actions;
use crate::errors::{AutomationError, Result};
use crate::store::PipelineDocument;

/// Routes a document to the rules that apply to its collection.
///
/// This is the supervisor for every trigger source: a rule error is logged,
/// recorded as an `Error` audit entry against the source document, and
/// swallowed. Other rules for the same document still run.
pub struct CascadeDispatcher {
    rules: Arc<CascadeRules>,
    audit: AuditLogger,
}

impl CascadeDispatcher {
    pub fn new(rules: Arc<CascadeRules>, audit: AuditLogger) -> Self {
        Self { rules, audit }
    }

    /// Runs every rule for `document` and returns the outcomes of those that
    /// did not fail.
    pub async fn dispatch(&self, document: &PipelineDocument) -> Vec<RuleOutcome> {
        let evaluations: Vec<(&'static str, Result<RuleOutcome>)> = match document {
            PipelineDocument::Lead(lead) => {
                vec![("qualify_lead", self.rules.qualify_lead(lead).await)]
            }
            PipelineDocument::Opportunity(opportunity) => vec![(
                "advance_opportunity",
                self.rules.advance_opportunity(opportunity).await,
            )],
            PipelineDocument::Quote(quote) => vec![
                (
                    "convert_quote_to_order",
                    self.rules.convert_quote_to_order(quote).await,
                ),
                (
                    "mark_opportunity_lost",
                    self.rules.mark_opportunity_lost(quote).await,
                ),
            ],
            PipelineDocument::Order(order) => vec![(
                "propagate_order_status",
                self.rules.propagate_order_status(order).await,
            )],
        };

        let mut outcomes = Vec::with_capacity(evaluations.len());
        for (rule, result) in evaluations {
            match result {
                Ok(outcome) => {
                    debug!(
                        "{} on {} {}: {:?}",
                        rule,
                        document.collection(),
                        document.id(),
                        outcome
                    );
                    outcomes.push(outcome);
                }
                Err(e) => {
                    let failure = AutomationError::RuleFailed {
                        rule,
                        reason: e.to_string(),
                    };
                    self.record_failure(document, failure).await;
                }
            }
        }
        outcomes
    }

    async fn record_failure(&self, document: &PipelineDocument, failure: AutomationError) {
        error!(
            "Cascade failed for {} {}: {}",
            document.collection(),
            document.id(),
            failure
        );
        let entry = NewAutomationLogEntry::new(
            actions::ERROR,
            document.collection().as_str(),
            document.id(),
        )
        .with_details(json!({ "error": failure.to_string() }));
        if let Err(e) = self.audit.record(entry).await {
            debug!("Error audit entry dropped: {}", e);
        }
    }
}

#[async_trait]
impl CascadeTrigger for CascadeDispatcher {
    async fn trigger(&self, document: PipelineDocument) {
        self.dispatch(&document).await;
    }
}
