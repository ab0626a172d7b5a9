//! One-call construction of every SQLite-backed pipeline component.

use std::sync::Arc;

use log::info;
use salesflow_core::store::{HookRegistry, PipelineRepositories};
use salesflow_core::Result;

use crate::admin::SqliteStoreAdmin;
use crate::automation_logs::AutomationLogRepository;
use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::leads::LeadRepository;
use crate::opportunities::OpportunityRepository;
use crate::orders::OrderRepository;
use crate::quotes::QuoteRepository;

/// A migrated SQLite database with its repositories, writer actor and hook
/// table. Repositories fire the shared hooks after each committed write.
pub struct SqliteStore {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    pub hooks: Arc<HookRegistry>,
    pub admin: Arc<SqliteStoreAdmin>,
    pub leads: Arc<LeadRepository>,
    pub opportunities: Arc<OpportunityRepository>,
    pub quotes: Arc<QuoteRepository>,
    pub orders: Arc<OrderRepository>,
    pub automation_logs: Arc<AutomationLogRepository>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `db_path`, applies pending
    /// migrations and starts the writer actor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(db_path: &str) -> Result<Self> {
        let db_path = init(db_path)?;
        let pool = create_pool(&db_path)?;
        run_migrations(&pool)?;
        let writer = spawn_writer(pool.as_ref().clone());
        let hooks = Arc::new(HookRegistry::new());
        info!("SQLite store ready at {}", db_path);

        Ok(Self {
            admin: Arc::new(SqliteStoreAdmin::new(pool.clone())),
            leads: Arc::new(LeadRepository::new(pool.clone(), writer.clone(), hooks.clone())),
            opportunities: Arc::new(OpportunityRepository::new(
                pool.clone(),
                writer.clone(),
                hooks.clone(),
            )),
            quotes: Arc::new(QuoteRepository::new(pool.clone(), writer.clone(), hooks.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone(), writer.clone(), hooks.clone())),
            automation_logs: Arc::new(AutomationLogRepository::new(pool.clone(), writer.clone())),
            pool,
            writer,
            hooks,
        })
    }

    pub fn repositories(&self) -> PipelineRepositories {
        PipelineRepositories {
            leads: self.leads.clone(),
            opportunities: self.opportunities.clone(),
            quotes: self.quotes.clone(),
            orders: self.orders.clone(),
        }
    }
}
