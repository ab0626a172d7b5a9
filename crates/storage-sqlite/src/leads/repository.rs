use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use salesflow_core::leads::{Lead, LeadLinks, LeadRepositoryTrait, LeadUpdate, NewLead};
use salesflow_core::store::{Collection, HookRegistry, PipelineDocument};
use salesflow_core::Result;
use std::sync::Arc;

use super::model::{LeadChangesDB, LeadDB, LeadLinksDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::leads;
use crate::utils::{fire_created, fire_updated, not_found, now};

pub struct LeadRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    hooks: Arc<HookRegistry>,
}

impl LeadRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, hooks: Arc<HookRegistry>) -> Self {
        Self {
            pool,
            writer,
            hooks,
        }
    }
}

fn load_lead(conn: &mut SqliteConnection, lead_id: &str) -> Result<Option<Lead>> {
    leads::table
        .find(lead_id)
        .select(LeadDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Lead::try_from)
        .transpose()
}

#[async_trait]
impl LeadRepositoryTrait for LeadRepository {
    async fn create(&self, new_lead: NewLead) -> Result<Lead> {
        let lead = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Lead> {
                let row = LeadDB::from(new_lead);
                let inserted = diesel::insert_into(leads::table)
                    .values(&row)
                    .returning(LeadDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Lead::try_from(inserted)
            })
            .await?;
        fire_created(&self.hooks, Collection::Leads, PipelineDocument::Lead(lead.clone()));
        Ok(lead)
    }

    async fn update(&self, lead_update: LeadUpdate) -> Result<Lead> {
        let lead = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Lead> {
                let lead_id = lead_update.id.clone();
                let changes = LeadChangesDB::from(lead_update);
                let updated = diesel::update(leads::table.find(&lead_id))
                    .set(&changes)
                    .returning(LeadDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found("Lead", &lead_id))?;
                Lead::try_from(updated)
            })
            .await?;
        fire_updated(&self.hooks, Collection::Leads, &lead.id);
        Ok(lead)
    }

    async fn set_links(&self, lead_id: &str, links: LeadLinks) -> Result<Lead> {
        let lead_id = lead_id.to_string();
        let (lead, changed) = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<(Lead, bool)> {
                let mut lead =
                    load_lead(conn, &lead_id)?.ok_or_else(|| not_found("Lead", &lead_id))?;
                if !links.apply_to(&mut lead) {
                    return Ok((lead, false));
                }
                lead.updated_at = now();
                diesel::update(leads::table.find(&lead_id))
                    .set(&LeadLinksDB::from(&lead))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok((lead, true))
            })
            .await?;
        if changed {
            fire_updated(&self.hooks, Collection::Leads, &lead.id);
        }
        Ok(lead)
    }

    fn find_by_id(&self, lead_id: &str) -> Result<Option<Lead>> {
        let mut conn = get_connection(&self.pool)?;
        load_lead(&mut conn, lead_id)
    }

    fn list(&self) -> Result<Vec<Lead>> {
        let mut conn = get_connection(&self.pool)?;
        leads::table
            .select(LeadDB::as_select())
            .order((leads::created_at.asc(), leads::id.asc()))
            .load::<LeadDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Lead::try_from)
            .collect()
    }
}
