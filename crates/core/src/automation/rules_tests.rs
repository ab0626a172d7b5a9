#[cfg(test)]
mod tests {
    use crate::audit::AuditLogger;
    use crate::automation::{CascadeRules, RuleOutcome, SkipReason};
    use crate::constants::actions;
    use crate::events::{MockNotificationTransport, RealtimeNotifier, Severity};
    use crate::leads::{Lead, LeadRepositoryTrait, LeadStatus, NewLead};
    use crate::opportunities::{
        NewOpportunity, Opportunity, OpportunityLinks, OpportunityRepositoryTrait,
        OpportunityStatus, OpportunityUpdate, SalesPhase,
    };
    use crate::orders::{NewOrder, Order, OrderRepositoryTrait, OrderStatus};
    use crate::quotes::{NewQuote, Quote, QuoteRepositoryTrait, QuoteStatus};
    use crate::store::{Collection, InMemoryStore};
    use crate::contacts::ContactDetails;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<InMemoryStore>,
        transport: MockNotificationTransport,
        audit: AuditLogger,
        rules: Arc<CascadeRules>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryStore::standalone());
            let transport = MockNotificationTransport::new();
            let notifier = Arc::new(RealtimeNotifier::new());
            notifier.attach(Arc::new(transport.clone())).unwrap();
            let audit = AuditLogger::new(store.clone());
            let rules = Arc::new(CascadeRules::new(
                store.repositories(),
                audit.clone(),
                notifier,
            ));
            Self {
                store,
                transport,
                audit,
                rules,
            }
        }

        fn actions(&self) -> Vec<String> {
            self.audit
                .recent(100)
                .unwrap()
                .into_iter()
                .rev()
                .map(|e| e.action)
                .collect()
        }

        async fn lead(&self, status: LeadStatus) -> Lead {
            LeadRepositoryTrait::create(
                self.store.as_ref(),
                NewLead {
                    id: None,
                    name: "Ada Lovelace".to_string(),
                    contact: ContactDetails {
                        company: Some("Analytical Engines Ltd".to_string()),
                        contact_name: Some("Ada".to_string()),
                        email: Some("ada@example.com".to_string()),
                        phone: None,
                    },
                    status,
                },
            )
            .await
            .unwrap()
        }

        async fn opportunity(&self, new_opportunity: NewOpportunity) -> Opportunity {
            OpportunityRepositoryTrait::create(self.store.as_ref(), new_opportunity)
                .await
                .unwrap()
        }

        async fn quote(&self, new_quote: NewQuote) -> Quote {
            QuoteRepositoryTrait::create(self.store.as_ref(), new_quote)
                .await
                .unwrap()
        }

        async fn order(&self, new_order: NewOrder) -> Order {
            OrderRepositoryTrait::create(self.store.as_ref(), new_order)
                .await
                .unwrap()
        }

        fn reload_opportunity(&self, id: &str) -> Opportunity {
            OpportunityRepositoryTrait::find_by_id(self.store.as_ref(), id)
                .unwrap()
                .unwrap()
        }

        fn reload_lead(&self, id: &str) -> Lead {
            LeadRepositoryTrait::find_by_id(self.store.as_ref(), id)
                .unwrap()
                .unwrap()
        }
    }

    // --- Rule 1 ---

    #[tokio::test]
    async fn test_qualified_lead_creates_linked_opportunity() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;

        let outcome = fx.rules.qualify_lead(&lead).await.unwrap();

        let RuleOutcome::Fired(record) = outcome else {
            panic!("expected rule to fire, got {:?}", outcome);
        };
        assert_eq!(record.action, actions::LEAD_TO_OPPORTUNITY);
        assert_eq!(record.target_collection, Collection::Opportunities);

        let opportunity = fx.reload_opportunity(&record.target_id);
        assert_eq!(opportunity.lead_id.as_deref(), Some(lead.id.as_str()));
        assert_eq!(opportunity.sales_phase, SalesPhase::Qualification);
        assert_eq!(opportunity.status, OpportunityStatus::Open);
        assert_eq!(opportunity.expected_value, Decimal::ZERO);
        assert_eq!(opportunity.contact, lead.contact);
        assert_eq!(opportunity.name, lead.name);

        let lead = fx.reload_lead(&lead.id);
        assert_eq!(lead.linked_opportunity_id, Some(opportunity.id));

        assert_eq!(fx.actions(), vec![actions::LEAD_TO_OPPORTUNITY]);
        let events = fx.transport.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Success);
        assert_eq!(fx.transport.topics(), vec!["automation".to_string()]);
    }

    #[tokio::test]
    async fn test_unqualified_lead_is_skipped() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::InProcess).await;

        let outcome = fx.rules.qualify_lead(&lead).await.unwrap();

        assert_eq!(outcome, RuleOutcome::Skipped(SkipReason::PreconditionUnmet));
        assert!(fx.actions().is_empty());
        assert!(fx.transport.is_empty());
    }

    #[tokio::test]
    async fn test_qualify_is_idempotent() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;

        assert!(fx.rules.qualify_lead(&lead).await.unwrap().is_fired());
        // A stale copy of the lead still carries no link; the guard re-reads.
        let second = fx.rules.qualify_lead(&lead).await.unwrap();

        assert_eq!(second, RuleOutcome::Skipped(SkipReason::AlreadyLinked));
        assert_eq!(OpportunityRepositoryTrait::list(fx.store.as_ref()).unwrap().len(), 1);
        assert_eq!(fx.actions().len(), 1);
        assert_eq!(fx.transport.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_opportunity_blocks_creation() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;
        fx.opportunity(NewOpportunity {
            name: "Manual".to_string(),
            lead_id: Some(lead.id.clone()),
            ..Default::default()
        })
        .await;

        let outcome = fx.rules.qualify_lead(&lead).await.unwrap();

        assert_eq!(outcome, RuleOutcome::Skipped(SkipReason::TargetExists));
        assert!(fx.actions().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_qualification_creates_one_opportunity() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let rules = fx.rules.clone();
            let lead = lead.clone();
            handles.push(tokio::spawn(async move { rules.qualify_lead(&lead).await }));
        }
        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_fired() {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(OpportunityRepositoryTrait::list(fx.store.as_ref()).unwrap().len(), 1);
        assert_eq!(fx.actions().len(), 1);
    }

    // --- Rule 2 ---

    #[tokio::test]
    async fn test_quotation_creates_quote_and_links_lead() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;
        fx.rules.qualify_lead(&lead).await.unwrap();
        let opportunity_id = fx.reload_lead(&lead.id).linked_opportunity_id.unwrap();

        let stored = fx.reload_opportunity(&opportunity_id);
        let opportunity = OpportunityRepositoryTrait::update(
            fx.store.as_ref(),
            OpportunityUpdate {
                id: stored.id.clone(),
                name: stored.name.clone(),
                contact: stored.contact.clone(),
                sales_phase: SalesPhase::Quotation,
                status: stored.status,
                expected_value: dec!(1250.50),
            },
        )
        .await
        .unwrap();

        let outcome = fx.rules.advance_opportunity(&opportunity).await.unwrap();
        let RuleOutcome::Fired(record) = outcome else {
            panic!("expected rule to fire");
        };

        let quote = QuoteRepositoryTrait::find_by_id(fx.store.as_ref(), &record.target_id)
            .unwrap()
            .unwrap();
        assert_eq!(quote.amount, dec!(1250.50));
        assert_eq!(quote.status, QuoteStatus::Open);
        assert_eq!(quote.opportunity_id.as_deref(), Some(opportunity_id.as_str()));
        assert_eq!(quote.lead_id.as_deref(), Some(lead.id.as_str()));

        assert_eq!(
            fx.reload_opportunity(&opportunity_id).linked_quote_id,
            Some(quote.id.clone())
        );
        assert_eq!(fx.reload_lead(&lead.id).linked_quote_id, Some(quote.id));
        assert_eq!(fx.transport.events()[1].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_quote_amount_copies_expected_value() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Big deal".to_string(),
                sales_phase: SalesPhase::Quotation,
                expected_value: dec!(9800),
                ..Default::default()
            })
            .await;

        let RuleOutcome::Fired(record) = fx.rules.advance_opportunity(&opportunity).await.unwrap()
        else {
            panic!("expected rule to fire");
        };

        let quote = QuoteRepositoryTrait::find_by_id(fx.store.as_ref(), &record.target_id)
            .unwrap()
            .unwrap();
        assert_eq!(quote.amount, dec!(9800));
        assert!(quote.lead_id.is_none());
    }

    #[tokio::test]
    async fn test_advance_skips_other_phases() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Early".to_string(),
                sales_phase: SalesPhase::Proposal,
                ..Default::default()
            })
            .await;

        assert_eq!(
            fx.rules.advance_opportunity(&opportunity).await.unwrap(),
            RuleOutcome::Skipped(SkipReason::PreconditionUnmet)
        );
    }

    // --- Rule 3 ---

    #[tokio::test]
    async fn test_order_status_creates_order_and_wins_opportunity() {
        let fx = Fixture::new();
        let lead = fx.lead(LeadStatus::Qualified).await;
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Deal".to_string(),
                sales_phase: SalesPhase::Quotation,
                expected_value: dec!(500),
                lead_id: Some(lead.id.clone()),
                ..Default::default()
            })
            .await;
        let quote = fx
            .quote(NewQuote {
                name: "Deal".to_string(),
                amount: dec!(480),
                status: QuoteStatus::Order,
                opportunity_id: Some(opportunity.id.clone()),
                lead_id: Some(lead.id.clone()),
                ..Default::default()
            })
            .await;

        let RuleOutcome::Fired(record) = fx.rules.convert_quote_to_order(&quote).await.unwrap()
        else {
            panic!("expected rule to fire");
        };

        let order = OrderRepositoryTrait::find_by_id(fx.store.as_ref(), &record.target_id)
            .unwrap()
            .unwrap();
        assert_eq!(order.amount, dec!(480));
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.quote_id.as_deref(), Some(quote.id.as_str()));
        assert_eq!(order.opportunity_id.as_deref(), Some(opportunity.id.as_str()));
        assert_eq!(order.lead_id.as_deref(), Some(lead.id.as_str()));

        let opportunity = fx.reload_opportunity(&opportunity.id);
        assert_eq!(opportunity.status, OpportunityStatus::Won);
        assert_eq!(opportunity.linked_order_id, Some(order.id.clone()));
        assert_eq!(fx.reload_lead(&lead.id).linked_order_id, Some(order.id.clone()));
        assert_eq!(
            QuoteRepositoryTrait::find_by_id(fx.store.as_ref(), &quote.id)
                .unwrap()
                .unwrap()
                .linked_order_id,
            Some(order.id)
        );
    }

    #[tokio::test]
    async fn test_order_owner_found_by_reverse_link() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Deal".to_string(),
                ..Default::default()
            })
            .await;
        let quote = fx
            .quote(NewQuote {
                name: "Orphan quote".to_string(),
                status: QuoteStatus::Order,
                ..Default::default()
            })
            .await;
        OpportunityRepositoryTrait::set_links(
            fx.store.as_ref(),
            &opportunity.id,
            OpportunityLinks::quote(&quote.id),
        )
        .await
        .unwrap();

        assert!(fx.rules.convert_quote_to_order(&quote).await.unwrap().is_fired());

        let opportunity = fx.reload_opportunity(&opportunity.id);
        assert_eq!(opportunity.status, OpportunityStatus::Won);
        assert!(opportunity.linked_order_id.is_some());
    }

    #[tokio::test]
    async fn test_order_creation_failure_surfaces_error() {
        let fx = Fixture::new();
        let quote = fx
            .quote(NewQuote {
                name: "Doomed".to_string(),
                status: QuoteStatus::Order,
                ..Default::default()
            })
            .await;
        fx.store.fail_writes(Collection::Orders, true);

        assert!(fx.rules.convert_quote_to_order(&quote).await.is_err());
        assert!(fx.actions().is_empty());
        assert!(fx.transport.is_empty());
    }

    // --- Rule 4 ---

    #[tokio::test]
    async fn test_no_order_marks_opportunity_lost_once() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Deal".to_string(),
                ..Default::default()
            })
            .await;
        let quote = fx
            .quote(NewQuote {
                name: "Deal".to_string(),
                status: QuoteStatus::NoOrder,
                opportunity_id: Some(opportunity.id.clone()),
                ..Default::default()
            })
            .await;

        assert!(fx.rules.mark_opportunity_lost(&quote).await.unwrap().is_fired());
        assert_eq!(
            fx.rules.mark_opportunity_lost(&quote).await.unwrap(),
            RuleOutcome::Skipped(SkipReason::AlreadyInState)
        );

        assert_eq!(
            fx.reload_opportunity(&opportunity.id).status,
            OpportunityStatus::Lost
        );
        assert_eq!(fx.actions(), vec![actions::QUOTE_TO_OPPORTUNITY_LOST]);
        assert_eq!(fx.transport.events()[0].severity, Severity::Warning);
        assert!(OrderRepositoryTrait::list(fx.store.as_ref()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_order_without_owner_is_noop() {
        let fx = Fixture::new();
        let quote = fx
            .quote(NewQuote {
                name: "Loose".to_string(),
                status: QuoteStatus::NoOrder,
                ..Default::default()
            })
            .await;

        assert_eq!(
            fx.rules.mark_opportunity_lost(&quote).await.unwrap(),
            RuleOutcome::Skipped(SkipReason::NoOwningOpportunity)
        );
        assert!(fx.actions().is_empty());
    }

    // --- Rule 5 ---

    #[tokio::test]
    async fn test_completed_order_closes_opportunity_won() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Deal".to_string(),
                status: OpportunityStatus::Won,
                ..Default::default()
            })
            .await;
        let order = fx
            .order(NewOrder {
                name: "Deal".to_string(),
                status: OrderStatus::Completed,
                opportunity_id: Some(opportunity.id.clone()),
                ..Default::default()
            })
            .await;

        let RuleOutcome::Fired(record) = fx.rules.propagate_order_status(&order).await.unwrap()
        else {
            panic!("expected rule to fire");
        };

        assert_eq!(record.action, actions::ORDER_TO_OPPORTUNITY_CLOSED_WON);
        assert_eq!(
            fx.reload_opportunity(&opportunity.id).status,
            OpportunityStatus::ClosedWon
        );
        assert_eq!(fx.transport.events()[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_cancelled_order_resolves_owner_through_quote() {
        let fx = Fixture::new();
        let opportunity = fx
            .opportunity(NewOpportunity {
                name: "Deal".to_string(),
                ..Default::default()
            })
            .await;
        let quote = fx
            .quote(NewQuote {
                name: "Deal".to_string(),
                opportunity_id: Some(opportunity.id.clone()),
                ..Default::default()
            })
            .await;
        let order = fx
            .order(NewOrder {
                name: "Deal".to_string(),
                status: OrderStatus::Cancelled,
                quote_id: Some(quote.id.clone()),
                ..Default::default()
            })
            .await;

        let RuleOutcome::Fired(record) = fx.rules.propagate_order_status(&order).await.unwrap()
        else {
            panic!("expected rule to fire");
        };

        assert_eq!(record.action, actions::ORDER_TO_OPPORTUNITY_LOST);
        assert_eq!(
            fx.reload_opportunity(&opportunity.id).status,
            OpportunityStatus::Lost
        );
    }

    #[tokio::test]
    async fn test_active_or_unowned_order_is_noop() {
        let fx = Fixture::new();
        let active = fx
            .order(NewOrder {
                name: "Active".to_string(),
                ..Default::default()
            })
            .await;
        let unowned = fx
            .order(NewOrder {
                name: "Unowned".to_string(),
                status: OrderStatus::Completed,
                ..Default::default()
            })
            .await;

        assert_eq!(
            fx.rules.propagate_order_status(&active).await.unwrap(),
            RuleOutcome::Skipped(SkipReason::PreconditionUnmet)
        );
        assert_eq!(
            fx.rules.propagate_order_status(&unowned).await.unwrap(),
            RuleOutcome::Skipped(SkipReason::NoOwningOpportunity)
        );
        assert!(fx.actions().is_empty());
    }

    // --- Side effects ---

    #[tokio::test]
    async fn test_audit_and_broadcast_failures_do_not_abort_rule() {
        let fx = Fixture::new();
        fx.store.fail_audit_writes(true);
        fx.transport.fail_broadcasts(true);
        let lead = fx.lead(LeadStatus::Qualified).await;

        assert!(fx.rules.qualify_lead(&lead).await.unwrap().is_fired());
        assert!(fx.reload_lead(&lead.id).linked_opportunity_id.is_some());
    }

    #[tokio::test]
    async fn test_rules_work_without_transport() {
        let store = Arc::new(InMemoryStore::standalone());
        let audit = AuditLogger::new(store.clone());
        let rules = CascadeRules::new(
            store.repositories(),
            audit.clone(),
            Arc::new(RealtimeNotifier::new()),
        );
        let opportunity = OpportunityRepositoryTrait::create(
            store.as_ref(),
            NewOpportunity {
                name: "Deal".to_string(),
                sales_phase: SalesPhase::Quotation,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(rules.advance_opportunity(&opportunity).await.unwrap().is_fired());
        assert_eq!(audit.recent(10).unwrap().len(), 1);
    }
}
