//! End-to-end cascade over a real SQLite file, driven by lifecycle hooks.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use salesflow_core::audit::AutomationLogRepositoryTrait;
use salesflow_core::automation::{
    AutomationConfig, AutomationDeps, AutomationEngine, CascadeTrigger, TriggerSourceKind,
};
use salesflow_core::constants::actions;
use salesflow_core::events::{MockNotificationTransport, RealtimeNotifier};
use salesflow_core::leads::{LeadRepositoryTrait, LeadStatus, LeadUpdate, NewLead};
use salesflow_core::opportunities::{OpportunityRepositoryTrait, OpportunityStatus};
use salesflow_core::orders::{OrderRepositoryTrait, OrderStatus, OrderUpdate};
use salesflow_core::quotes::{QuoteRepositoryTrait, QuoteStatus, QuoteUpdate};
use salesflow_core::store::PipelineDocument;
use salesflow_storage_sqlite::SqliteStore;
use tempfile::{tempdir, TempDir};

struct Setup {
    _dir: TempDir,
    store: Arc<SqliteStore>,
    engine: AutomationEngine,
    transport: MockNotificationTransport,
}

fn setup() -> Setup {
    let dir = tempdir().unwrap();
    let store = Arc::new(
        SqliteStore::open(dir.path().join("salesflow.db").to_str().unwrap()).unwrap(),
    );
    let transport = MockNotificationTransport::new();
    let notifier = Arc::new(RealtimeNotifier::new());
    notifier.attach(Arc::new(transport.clone())).unwrap();
    let engine = AutomationEngine::new(
        AutomationDeps {
            repositories: store.repositories(),
            audit_log: store.automation_logs.clone(),
            admin: store.admin.clone(),
            change_feed: None,
            hooks: Some(store.hooks.clone()),
            notifier,
        },
        AutomationConfig::default(),
    );
    Setup {
        _dir: dir,
        store,
        engine,
        transport,
    }
}

async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..150 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn actions_oldest_first(store: &SqliteStore) -> Vec<String> {
    store
        .automation_logs
        .list_recent(100)
        .unwrap()
        .into_iter()
        .rev()
        .map(|entry| entry.action)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_store_cascades_through_lifecycle_hooks() {
    let Setup {
        _dir,
        store,
        engine,
        transport,
    } = setup();

    assert_eq!(engine.start().await, Some(TriggerSourceKind::LifecycleHooks));

    let lead = store
        .leads
        .create(NewLead {
            name: "Grace Hopper".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .leads
        .update(LeadUpdate {
            id: lead.id.clone(),
            name: lead.name.clone(),
            contact: lead.contact.clone(),
            status: LeadStatus::Qualified,
        })
        .await
        .unwrap();

    eventually("opportunity", || {
        store.opportunities.find_by_lead_id(&lead.id).unwrap().is_some()
    })
    .await;
    let opportunity = store.opportunities.find_by_lead_id(&lead.id).unwrap().unwrap();
    assert_eq!(opportunity.name, "Grace Hopper");

    // Moving the opportunity into quotation creates the quote.
    store
        .opportunities
        .update(salesflow_core::opportunities::OpportunityUpdate {
            id: opportunity.id.clone(),
            name: opportunity.name.clone(),
            contact: opportunity.contact.clone(),
            sales_phase: salesflow_core::opportunities::SalesPhase::Quotation,
            status: opportunity.status,
            expected_value: dec!(4200),
        })
        .await
        .unwrap();
    eventually("quote", || {
        store
            .quotes
            .find_by_opportunity_id(&opportunity.id)
            .unwrap()
            .is_some()
    })
    .await;
    let quote = store
        .quotes
        .find_by_opportunity_id(&opportunity.id)
        .unwrap()
        .unwrap();
    assert_eq!(quote.amount, dec!(4200));

    store
        .quotes
        .update(QuoteUpdate {
            id: quote.id.clone(),
            name: quote.name.clone(),
            contact: quote.contact.clone(),
            amount: quote.amount,
            status: QuoteStatus::Order,
        })
        .await
        .unwrap();
    eventually("order", || {
        store.orders.find_by_quote_id(&quote.id).unwrap().is_some()
    })
    .await;
    let order = store.orders.find_by_quote_id(&quote.id).unwrap().unwrap();

    eventually("opportunity won", || {
        store
            .opportunities
            .find_by_id(&opportunity.id)
            .unwrap()
            .map(|o| o.status == OpportunityStatus::Won)
            .unwrap_or(false)
    })
    .await;

    store
        .orders
        .update(OrderUpdate {
            id: order.id.clone(),
            name: order.name.clone(),
            contact: order.contact.clone(),
            amount: order.amount,
            status: OrderStatus::Completed,
        })
        .await
        .unwrap();
    eventually("opportunity closed won", || {
        store
            .opportunities
            .find_by_id(&opportunity.id)
            .unwrap()
            .map(|o| o.status == OpportunityStatus::ClosedWon)
            .unwrap_or(false)
    })
    .await;

    // Let any stray hook tasks finish before reading the trail.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let lead = store.leads.find_by_id(&lead.id).unwrap().unwrap();
    assert_eq!(lead.linked_opportunity_id.as_deref(), Some(opportunity.id.as_str()));
    assert_eq!(lead.linked_quote_id.as_deref(), Some(quote.id.as_str()));
    assert_eq!(lead.linked_order_id.as_deref(), Some(order.id.as_str()));

    assert_eq!(
        actions_oldest_first(&store),
        vec![
            actions::WATCHER_FALLBACK_ENABLED,
            actions::LEAD_TO_OPPORTUNITY,
            actions::OPPORTUNITY_TO_QUOTE,
            actions::QUOTE_TO_ORDER,
            actions::ORDER_TO_OPPORTUNITY_CLOSED_WON,
        ]
    );
    assert_eq!(transport.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_creates_one_opportunity() {
    let Setup { _dir, store, engine, .. } = setup();

    let lead = store
        .leads
        .create(NewLead {
            name: "Ada".to_string(),
            status: LeadStatus::Qualified,
            ..Default::default()
        })
        .await
        .unwrap();

    let dispatcher = engine.dispatcher();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let dispatcher = dispatcher.clone();
        let document = PipelineDocument::Lead(lead.clone());
        tasks.push(tokio::spawn(async move {
            dispatcher.trigger(document).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.opportunities.list().unwrap().len(), 1);
    assert_eq!(
        actions_oldest_first(&store),
        vec![actions::LEAD_TO_OPPORTUNITY]
    );
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("salesflow.db");
    let lead_id = {
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store
            .leads
            .create(NewLead {
                name: "Persistent".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    };

    let reopened = SqliteStore::open(path.to_str().unwrap()).unwrap();
    let lead = reopened.leads.find_by_id(&lead_id).unwrap().unwrap();
    assert_eq!(lead.name, "Persistent");
}
