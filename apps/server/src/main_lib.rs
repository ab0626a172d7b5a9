use std::sync::Arc;

use salesflow_core::{
    audit::AutomationLogRepositoryTrait,
    automation::{AutomationDeps, AutomationEngine},
    events::RealtimeNotifier,
    leads::{LeadService, LeadServiceTrait},
    opportunities::{OpportunityService, OpportunityServiceTrait},
    orders::{OrderService, OrderServiceTrait},
    quotes::{QuoteService, QuoteServiceTrait},
    store::{InMemoryStore, PipelineRepositories},
};
use salesflow_storage_sqlite::SqliteStore;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::{Config, StoreKind},
    events::EventBus,
};

pub struct AppState {
    pub lead_service: Arc<dyn LeadServiceTrait + Send + Sync>,
    pub opportunity_service: Arc<dyn OpportunityServiceTrait + Send + Sync>,
    pub quote_service: Arc<dyn QuoteServiceTrait + Send + Sync>,
    pub order_service: Arc<dyn OrderServiceTrait + Send + Sync>,
    pub automation: Arc<AutomationEngine>,
    pub event_bus: EventBus,
}

pub fn init_tracing() {
    let log_format = std::env::var("SF_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// What the engine needs from whichever store was configured.
struct StoreHandles {
    repositories: PipelineRepositories,
    deps: AutomationDeps,
}

fn open_store(config: &Config, notifier: Arc<RealtimeNotifier>) -> anyhow::Result<StoreHandles> {
    match config.store {
        StoreKind::Sqlite => {
            let store = SqliteStore::open(&config.db_path)?;
            tracing::info!("Database path in use: {}", config.db_path);
            let repositories = store.repositories();
            let audit_log: Arc<dyn AutomationLogRepositoryTrait> = store.automation_logs.clone();
            Ok(StoreHandles {
                deps: AutomationDeps {
                    repositories: repositories.clone(),
                    audit_log,
                    admin: store.admin.clone(),
                    change_feed: None,
                    hooks: Some(store.hooks.clone()),
                    notifier,
                },
                repositories,
            })
        }
        StoreKind::Memory { replicated } => {
            let store = Arc::new(if replicated {
                InMemoryStore::replica_set()
            } else {
                InMemoryStore::standalone()
            });
            tracing::warn!(
                "Using the in-memory store ({}); data is lost on restart",
                if replicated { "replica set" } else { "standalone" }
            );
            let repositories = store.repositories();
            Ok(StoreHandles {
                deps: AutomationDeps {
                    repositories: repositories.clone(),
                    audit_log: store.clone(),
                    admin: store.clone(),
                    change_feed: Some(store.clone()),
                    hooks: Some(store),
                    notifier,
                },
                repositories,
            })
        }
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let event_bus = EventBus::new(config.event_bus_capacity);
    let notifier = Arc::new(RealtimeNotifier::new());
    notifier.attach(Arc::new(event_bus.clone()))?;

    let StoreHandles { repositories, deps } = open_store(config, notifier)?;
    let automation = Arc::new(AutomationEngine::new(deps, config.automation));
    match automation.start().await {
        Some(kind) => tracing::info!("Cascade automation running via {}", kind),
        None if config.automation.enabled => {
            tracing::warn!("No trigger source attached; cascades run on API writes only")
        }
        None => tracing::info!("Cascade automation disabled"),
    }

    let cascade = automation.cascade_trigger();
    Ok(Arc::new(AppState {
        lead_service: Arc::new(LeadService::new(repositories.leads, cascade.clone())),
        opportunity_service: Arc::new(OpportunityService::new(
            repositories.opportunities,
            cascade.clone(),
        )),
        quote_service: Arc::new(QuoteService::new(repositories.quotes, cascade.clone())),
        order_service: Arc::new(OrderService::new(repositories.orders, cascade)),
        automation,
        event_bus,
    }))
}
