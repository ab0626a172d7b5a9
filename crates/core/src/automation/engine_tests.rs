#[cfg(test)]
mod tests {
    use crate::automation::{
        AutomationConfig, AutomationDeps, AutomationEngine, SubscriptionState, TriggerPreference,
        TriggerSourceKind,
    };
    use crate::constants::actions;
    use crate::events::{MockNotificationTransport, RealtimeNotifier};
    use crate::leads::{
        Lead, LeadRepositoryTrait, LeadService, LeadServiceTrait, LeadStatus, LeadUpdate, NewLead,
    };
    use crate::opportunities::{
        OpportunityRepositoryTrait, OpportunityService, OpportunityServiceTrait, OpportunityStatus,
        OpportunityUpdate, SalesPhase,
    };
    use crate::orders::{OrderRepositoryTrait, OrderService, OrderServiceTrait, OrderStatus, OrderUpdate};
    use crate::quotes::{QuoteRepositoryTrait, QuoteService, QuoteServiceTrait, QuoteStatus, QuoteUpdate};
    use crate::store::{Collection, InMemoryStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        store: Arc<InMemoryStore>,
        engine: Arc<AutomationEngine>,
        transport: MockNotificationTransport,
        leads: LeadService,
        opportunities: OpportunityService,
        quotes: QuoteService,
        orders: OrderService,
    }

    impl Harness {
        fn new(store: InMemoryStore, config: AutomationConfig) -> Self {
            let store = Arc::new(store);
            let transport = MockNotificationTransport::new();
            let notifier = Arc::new(RealtimeNotifier::new());
            notifier.attach(Arc::new(transport.clone())).unwrap();

            let engine = Arc::new(AutomationEngine::new(
                AutomationDeps {
                    repositories: store.repositories(),
                    audit_log: store.clone(),
                    admin: store.clone(),
                    change_feed: Some(store.clone()),
                    hooks: Some(store.clone()),
                    notifier,
                },
                config,
            ));
            let trigger = engine.cascade_trigger();
            Self {
                leads: LeadService::new(store.clone(), trigger.clone()),
                opportunities: OpportunityService::new(store.clone(), trigger.clone()),
                quotes: QuoteService::new(store.clone(), trigger.clone()),
                orders: OrderService::new(store.clone(), trigger),
                store,
                engine,
                transport,
            }
        }

        fn cascade_actions(&self) -> Vec<String> {
            self.engine
                .recent_logs(100)
                .unwrap()
                .into_iter()
                .rev()
                .map(|e| e.action)
                .filter(|a| a != actions::WATCHER_FALLBACK_ENABLED)
                .collect()
        }

        fn lead(&self, id: &str) -> Lead {
            self.leads.get_lead(id).unwrap()
        }

        async fn create_lead(&self, name: &str) -> Lead {
            self.leads
                .create_lead(NewLead {
                    name: name.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap()
        }

        async fn set_lead_status(&self, lead: &Lead, status: LeadStatus) -> Lead {
            self.leads
                .update_lead(LeadUpdate {
                    id: lead.id.clone(),
                    name: lead.name.clone(),
                    contact: lead.contact.clone(),
                    status,
                })
                .await
                .unwrap()
        }
    }

    async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {}", what);
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    fn config(trigger: TriggerPreference) -> AutomationConfig {
        AutomationConfig {
            enabled: true,
            trigger,
        }
    }

    /// Walks one lead through the whole pipeline with only the trigger
    /// source (no direct invocation) and returns the audit trail.
    async fn run_full_pipeline_through_store(harness: &Harness) -> Vec<String> {
        let store = harness.store.as_ref();
        let lead = LeadRepositoryTrait::create(
            store,
            NewLead {
                name: "Grace Hopper".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        LeadRepositoryTrait::update(
            store,
            LeadUpdate {
                id: lead.id.clone(),
                name: lead.name.clone(),
                contact: lead.contact.clone(),
                status: LeadStatus::Qualified,
            },
        )
        .await
        .unwrap();
        eventually("opportunity", || harness.lead(&lead.id).linked_opportunity_id.is_some()).await;

        let opportunity_id = harness.lead(&lead.id).linked_opportunity_id.unwrap();
        let opportunity = OpportunityRepositoryTrait::find_by_id(store, &opportunity_id)
            .unwrap()
            .unwrap();
        OpportunityRepositoryTrait::update(
            store,
            OpportunityUpdate {
                id: opportunity.id.clone(),
                name: opportunity.name.clone(),
                contact: opportunity.contact.clone(),
                sales_phase: SalesPhase::Quotation,
                status: opportunity.status,
                expected_value: dec!(1000),
            },
        )
        .await
        .unwrap();
        eventually("quote", || harness.lead(&lead.id).linked_quote_id.is_some()).await;

        let quote_id = harness.lead(&lead.id).linked_quote_id.unwrap();
        let quote = QuoteRepositoryTrait::find_by_id(store, &quote_id).unwrap().unwrap();
        assert_eq!(quote.amount, dec!(1000));
        QuoteRepositoryTrait::update(
            store,
            QuoteUpdate {
                id: quote.id.clone(),
                name: quote.name.clone(),
                contact: quote.contact.clone(),
                amount: quote.amount,
                status: QuoteStatus::Order,
            },
        )
        .await
        .unwrap();
        eventually("order", || harness.lead(&lead.id).linked_order_id.is_some()).await;

        let order_id = harness.lead(&lead.id).linked_order_id.unwrap();
        let order = OrderRepositoryTrait::find_by_id(store, &order_id).unwrap().unwrap();
        assert_eq!(order.amount, dec!(1000));
        assert_eq!(
            OpportunityRepositoryTrait::find_by_id(store, &opportunity_id)
                .unwrap()
                .unwrap()
                .status,
            OpportunityStatus::Won
        );
        OrderRepositoryTrait::update(
            store,
            OrderUpdate {
                id: order.id.clone(),
                name: order.name.clone(),
                contact: order.contact.clone(),
                amount: order.amount,
                status: OrderStatus::Completed,
            },
        )
        .await
        .unwrap();
        eventually("closed won", || {
            OpportunityRepositoryTrait::find_by_id(store, &opportunity_id)
                .unwrap()
                .map(|o| o.status == OpportunityStatus::ClosedWon)
                .unwrap_or(false)
        })
        .await;

        settle().await;
        harness.cascade_actions()
    }

    fn expected_trail() -> Vec<String> {
        [
            actions::LEAD_TO_OPPORTUNITY,
            actions::OPPORTUNITY_TO_QUOTE,
            actions::QUOTE_TO_ORDER,
            actions::ORDER_TO_OPPORTUNITY_CLOSED_WON,
        ]
        .iter()
        .map(|a| a.to_string())
        .collect()
    }

    #[tokio::test]
    async fn test_feed_and_hooks_reach_the_same_end_state() {
        let feed = Harness::new(InMemoryStore::replica_set(), AutomationConfig::default());
        assert_eq!(feed.engine.start().await, Some(TriggerSourceKind::ChangeFeed));

        let hooks = Harness::new(InMemoryStore::standalone(), AutomationConfig::default());
        assert_eq!(
            hooks.engine.start().await,
            Some(TriggerSourceKind::LifecycleHooks)
        );

        assert_eq!(run_full_pipeline_through_store(&feed).await, expected_trail());
        assert_eq!(run_full_pipeline_through_store(&hooks).await, expected_trail());
        assert_eq!(feed.transport.len(), 4);
        assert_eq!(hooks.transport.len(), 4);
    }

    #[tokio::test]
    async fn test_direct_invocation_and_trigger_source_fire_once() {
        let harness = Harness::new(InMemoryStore::replica_set(), AutomationConfig::default());
        harness.engine.start().await;

        let lead = harness.create_lead("Ada").await;
        let lead = harness.set_lead_status(&lead, LeadStatus::Qualified).await;
        // Duplicate deliveries of the same transition.
        harness.set_lead_status(&lead, LeadStatus::Qualified).await;
        settle().await;

        assert!(harness.lead(&lead.id).linked_opportunity_id.is_some());
        assert_eq!(
            OpportunityRepositoryTrait::list(harness.store.as_ref())
                .unwrap()
                .len(),
            1
        );
        assert_eq!(harness.cascade_actions(), vec![actions::LEAD_TO_OPPORTUNITY]);
        assert_eq!(harness.transport.len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_qualifying_status_cascades_directly() {
        // Automation attached to nothing: only direct invocation runs.
        let harness = Harness::new(InMemoryStore::standalone(), AutomationConfig::default());

        let lead = harness
            .leads
            .create_lead(NewLead {
                name: "Born qualified".to_string(),
                status: LeadStatus::Qualified,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(harness.lead(&lead.id).linked_opportunity_id.is_some());
    }

    #[tokio::test]
    async fn test_quote_no_order_marks_opportunity_lost() {
        let harness = Harness::new(InMemoryStore::standalone(), AutomationConfig::default());
        harness.engine.start().await;

        let lead = harness.create_lead("Lost cause").await;
        harness.set_lead_status(&lead, LeadStatus::Qualified).await;
        let opportunity_id = harness.lead(&lead.id).linked_opportunity_id.unwrap();
        let opportunity = harness.opportunities.get_opportunity(&opportunity_id).unwrap();
        harness
            .opportunities
            .update_opportunity(OpportunityUpdate {
                id: opportunity.id.clone(),
                name: opportunity.name.clone(),
                contact: opportunity.contact.clone(),
                sales_phase: SalesPhase::Quotation,
                status: opportunity.status,
                expected_value: dec!(300),
            })
            .await
            .unwrap();
        let quote_id = harness.lead(&lead.id).linked_quote_id.unwrap();
        let quote = harness.quotes.get_quote(&quote_id).unwrap();

        harness
            .quotes
            .update_quote(QuoteUpdate {
                id: quote.id.clone(),
                name: quote.name.clone(),
                contact: quote.contact.clone(),
                amount: quote.amount,
                status: QuoteStatus::NoOrder,
            })
            .await
            .unwrap();
        settle().await;

        assert_eq!(
            harness.opportunities.get_opportunity(&opportunity_id).unwrap().status,
            OpportunityStatus::Lost
        );
        assert!(harness.orders.list_orders().unwrap().is_empty());
        assert_eq!(
            harness.cascade_actions(),
            vec![
                actions::LEAD_TO_OPPORTUNITY,
                actions::OPPORTUNITY_TO_QUOTE,
                actions::QUOTE_TO_OPPORTUNITY_LOST,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_cascade_leaves_primary_write_intact() {
        let harness = Harness::new(InMemoryStore::replica_set(), AutomationConfig::default());
        harness.engine.start().await;
        harness.store.fail_writes(Collection::Opportunities, true);

        let lead = harness.create_lead("Isolated").await;
        let updated = harness.set_lead_status(&lead, LeadStatus::Qualified).await;
        settle().await;

        assert_eq!(updated.status, LeadStatus::Qualified);
        assert_eq!(harness.lead(&lead.id).status, LeadStatus::Qualified);
        assert!(harness.lead(&lead.id).linked_opportunity_id.is_none());

        let entries = harness.engine.recent_logs(100).unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.action == actions::ERROR));
        assert!(entries.iter().all(|e| e.source_id == lead.id));
        assert!(harness.transport.is_empty());
    }

    #[tokio::test]
    async fn test_feed_keeps_delivering_after_a_rule_fails() {
        let harness = Harness::new(InMemoryStore::replica_set(), AutomationConfig::default());
        assert_eq!(harness.engine.start().await, Some(TriggerSourceKind::ChangeFeed));
        let store = harness.store.as_ref();

        harness.store.fail_writes(Collection::Opportunities, true);
        let first = LeadRepositoryTrait::create(
            store,
            NewLead {
                name: "First".to_string(),
                status: LeadStatus::Qualified,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        eventually("error entry", || {
            harness
                .engine
                .recent_logs(10)
                .unwrap()
                .iter()
                .any(|e| e.action == actions::ERROR && e.source_id == first.id)
        })
        .await;

        harness.store.fail_writes(Collection::Opportunities, false);
        let second = LeadRepositoryTrait::create(
            store,
            NewLead {
                name: "Second".to_string(),
                status: LeadStatus::Qualified,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        eventually("second lead linked", || {
            harness.lead(&second.id).linked_opportunity_id.is_some()
        })
        .await;

        assert!(harness.lead(&first.id).linked_opportunity_id.is_none());
        assert_eq!(
            harness.engine.status().subscriptions.get("leads"),
            Some(&SubscriptionState::Subscribed)
        );
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back_to_hooks() {
        let store = InMemoryStore::replica_set();
        store.fail_topology_probe();
        let harness = Harness::new(store, AutomationConfig::default());

        assert_eq!(
            harness.engine.start().await,
            Some(TriggerSourceKind::LifecycleHooks)
        );

        let actions: Vec<String> = harness
            .engine
            .recent_logs(10)
            .unwrap()
            .into_iter()
            .rev()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![actions::WATCHER_INIT_ERROR, actions::WATCHER_FALLBACK_ENABLED]
        );
    }

    #[tokio::test]
    async fn test_start_is_decided_once() {
        let harness = Harness::new(InMemoryStore::replica_set(), AutomationConfig::default());
        assert_eq!(harness.engine.start().await, Some(TriggerSourceKind::ChangeFeed));
        assert_eq!(harness.engine.start().await, Some(TriggerSourceKind::ChangeFeed));

        let status = harness.engine.status();
        assert_eq!(status.trigger_source, Some(TriggerSourceKind::ChangeFeed));
        assert_eq!(status.subscriptions.len(), 4);
        assert!(status
            .subscriptions
            .values()
            .all(|s| *s == SubscriptionState::Subscribed));
        assert!(status.hooked_collections.is_empty());
    }

    #[tokio::test]
    async fn test_forced_hooks_on_replica_set() {
        let harness = Harness::new(
            InMemoryStore::replica_set(),
            config(TriggerPreference::Hooks),
        );

        assert_eq!(
            harness.engine.start().await,
            Some(TriggerSourceKind::LifecycleHooks)
        );
        assert_eq!(harness.engine.status().hooked_collections.len(), 4);
        assert!(harness.engine.status().subscriptions.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_engine_does_nothing() {
        let harness = Harness::new(
            InMemoryStore::replica_set(),
            AutomationConfig {
                enabled: false,
                trigger: TriggerPreference::Auto,
            },
        );
        assert_eq!(harness.engine.start().await, None);

        let lead = harness.create_lead("Ignored").await;
        harness.set_lead_status(&lead, LeadStatus::Qualified).await;
        settle().await;

        assert!(harness.lead(&lead.id).linked_opportunity_id.is_none());
        assert!(harness.engine.recent_logs(10).unwrap().is_empty());
        assert!(!harness.engine.status().enabled);
    }
}
