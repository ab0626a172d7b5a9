use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use salesflow_core::opportunities::{
    NewOpportunity, Opportunity, OpportunityLinks, OpportunityRepositoryTrait, OpportunityStatus,
    OpportunityUpdate,
};
use salesflow_core::store::{Collection, HookRegistry, PipelineDocument};
use salesflow_core::Result;
use std::sync::Arc;

use super::model::{OpportunityChangesDB, OpportunityDB, OpportunityEngineDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::opportunities;
use crate::utils::{fire_created, fire_updated, not_found, now};

pub struct OpportunityRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    hooks: Arc<HookRegistry>,
}

impl OpportunityRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, hooks: Arc<HookRegistry>) -> Self {
        Self {
            pool,
            writer,
            hooks,
        }
    }

    fn first_of(
        &self,
        query: opportunities::BoxedQuery<'static, Sqlite>,
    ) -> Result<Option<Opportunity>> {
        let mut conn = get_connection(&self.pool)?;
        query
            .order((opportunities::created_at.asc(), opportunities::id.asc()))
            .select(OpportunityDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(Opportunity::try_from)
            .transpose()
    }

    /// Loads, mutates and writes back an opportunity inside one writer job.
    /// The closure returns false when nothing changed; no hook fires then.
    async fn modify<F>(&self, opportunity_id: &str, mutate: F) -> Result<Opportunity>
    where
        F: FnOnce(&mut Opportunity) -> bool + Send + 'static,
    {
        let opportunity_id = opportunity_id.to_string();
        let (opportunity, changed) = self
            .writer
            .exec(
                move |conn: &mut SqliteConnection| -> Result<(Opportunity, bool)> {
                    let mut opportunity = load_opportunity(conn, &opportunity_id)?
                        .ok_or_else(|| not_found("Opportunity", &opportunity_id))?;
                    if !mutate(&mut opportunity) {
                        return Ok((opportunity, false));
                    }
                    opportunity.updated_at = now();
                    diesel::update(opportunities::table.find(&opportunity_id))
                        .set(&OpportunityEngineDB::from(&opportunity))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    Ok((opportunity, true))
                },
            )
            .await?;
        if changed {
            fire_updated(&self.hooks, Collection::Opportunities, &opportunity.id);
        }
        Ok(opportunity)
    }
}

fn load_opportunity(
    conn: &mut SqliteConnection,
    opportunity_id: &str,
) -> Result<Option<Opportunity>> {
    opportunities::table
        .find(opportunity_id)
        .select(OpportunityDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Opportunity::try_from)
        .transpose()
}

#[async_trait]
impl OpportunityRepositoryTrait for OpportunityRepository {
    async fn create(&self, new_opportunity: NewOpportunity) -> Result<Opportunity> {
        let opportunity = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Opportunity> {
                let row = OpportunityDB::from(new_opportunity);
                let inserted = diesel::insert_into(opportunities::table)
                    .values(&row)
                    .returning(OpportunityDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Opportunity::try_from(inserted)
            })
            .await?;
        fire_created(
            &self.hooks,
            Collection::Opportunities,
            PipelineDocument::Opportunity(opportunity.clone()),
        );
        Ok(opportunity)
    }

    async fn update(&self, opportunity_update: OpportunityUpdate) -> Result<Opportunity> {
        let opportunity = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Opportunity> {
                let opportunity_id = opportunity_update.id.clone();
                let changes = OpportunityChangesDB::from(opportunity_update);
                let updated = diesel::update(opportunities::table.find(&opportunity_id))
                    .set(&changes)
                    .returning(OpportunityDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found("Opportunity", &opportunity_id))?;
                Opportunity::try_from(updated)
            })
            .await?;
        fire_updated(&self.hooks, Collection::Opportunities, &opportunity.id);
        Ok(opportunity)
    }

    async fn set_links(
        &self,
        opportunity_id: &str,
        links: OpportunityLinks,
    ) -> Result<Opportunity> {
        self.modify(opportunity_id, move |opportunity| {
            links.apply_to(opportunity)
        })
        .await
    }

    async fn set_status(
        &self,
        opportunity_id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity> {
        self.modify(opportunity_id, move |opportunity| {
            if opportunity.status == status {
                return false;
            }
            opportunity.status = status;
            true
        })
        .await
    }

    fn find_by_id(&self, opportunity_id: &str) -> Result<Option<Opportunity>> {
        let mut conn = get_connection(&self.pool)?;
        load_opportunity(&mut conn, opportunity_id)
    }

    fn find_by_lead_id(&self, lead_id: &str) -> Result<Option<Opportunity>> {
        self.first_of(
            opportunities::table
                .filter(opportunities::lead_id.eq(lead_id.to_string()))
                .into_boxed(),
        )
    }

    fn find_by_linked_quote_id(&self, quote_id: &str) -> Result<Option<Opportunity>> {
        self.first_of(
            opportunities::table
                .filter(opportunities::linked_quote_id.eq(quote_id.to_string()))
                .into_boxed(),
        )
    }

    fn find_by_linked_order_id(&self, order_id: &str) -> Result<Option<Opportunity>> {
        self.first_of(
            opportunities::table
                .filter(opportunities::linked_order_id.eq(order_id.to_string()))
                .into_boxed(),
        )
    }

    fn list(&self) -> Result<Vec<Opportunity>> {
        let mut conn = get_connection(&self.pool)?;
        opportunities::table
            .select(OpportunityDB::as_select())
            .order((opportunities::created_at.asc(), opportunities::id.asc()))
            .load::<OpportunityDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Opportunity::try_from)
            .collect()
    }
}
