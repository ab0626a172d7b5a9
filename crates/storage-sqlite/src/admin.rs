//! Store administration for SQLite.

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Text;
use log::debug;
use salesflow_core::store::{StoreAdminTrait, StoreTopology};
use salesflow_core::Result;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;

/// A SQLite file is always a standalone deployment: it has no replication
/// and no change feed. The probe still touches the database so that an
/// unreachable file surfaces as a probe failure.
pub struct SqliteStoreAdmin {
    pool: Arc<DbPool>,
}

impl SqliteStoreAdmin {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreAdminTrait for SqliteStoreAdmin {
    async fn topology(&self) -> Result<StoreTopology> {
        let mut conn = get_connection(&self.pool)?;
        let version: String = diesel::select(sql::<Text>("sqlite_version()"))
            .get_result(&mut conn)
            .map_err(StorageError::from)?;
        debug!("SQLite {} reports a standalone topology", version);
        Ok(StoreTopology::Standalone)
    }
}
