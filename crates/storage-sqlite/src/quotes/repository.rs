use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use salesflow_core::quotes::{NewQuote, Quote, QuoteLinks, QuoteRepositoryTrait, QuoteUpdate};
use salesflow_core::store::{Collection, HookRegistry, PipelineDocument};
use salesflow_core::Result;
use std::sync::Arc;

use super::model::{QuoteChangesDB, QuoteDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::quotes;
use crate::utils::{fire_created, fire_updated, not_found, now};

pub struct QuoteRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    hooks: Arc<HookRegistry>,
}

impl QuoteRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, hooks: Arc<HookRegistry>) -> Self {
        Self {
            pool,
            writer,
            hooks,
        }
    }
}

fn load_quote(conn: &mut SqliteConnection, quote_id: &str) -> Result<Option<Quote>> {
    quotes::table
        .find(quote_id)
        .select(QuoteDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Quote::try_from)
        .transpose()
}

#[async_trait]
impl QuoteRepositoryTrait for QuoteRepository {
    async fn create(&self, new_quote: NewQuote) -> Result<Quote> {
        let quote = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Quote> {
                let row = QuoteDB::from(new_quote);
                let inserted = diesel::insert_into(quotes::table)
                    .values(&row)
                    .returning(QuoteDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Quote::try_from(inserted)
            })
            .await?;
        fire_created(&self.hooks, Collection::Quotes, PipelineDocument::Quote(quote.clone()));
        Ok(quote)
    }

    async fn update(&self, quote_update: QuoteUpdate) -> Result<Quote> {
        let quote = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Quote> {
                let quote_id = quote_update.id.clone();
                let changes = QuoteChangesDB::from(quote_update);
                let updated = diesel::update(quotes::table.find(&quote_id))
                    .set(&changes)
                    .returning(QuoteDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found("Quote", &quote_id))?;
                Quote::try_from(updated)
            })
            .await?;
        fire_updated(&self.hooks, Collection::Quotes, &quote.id);
        Ok(quote)
    }

    async fn set_links(&self, quote_id: &str, links: QuoteLinks) -> Result<Quote> {
        let quote_id = quote_id.to_string();
        let (quote, changed) = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<(Quote, bool)> {
                let mut quote =
                    load_quote(conn, &quote_id)?.ok_or_else(|| not_found("Quote", &quote_id))?;
                if !links.apply_to(&mut quote) {
                    return Ok((quote, false));
                }
                quote.updated_at = now();
                diesel::update(quotes::table.find(&quote_id))
                    .set((
                        quotes::linked_order_id.eq(quote.linked_order_id.clone()),
                        quotes::updated_at.eq(quote.updated_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok((quote, true))
            })
            .await?;
        if changed {
            fire_updated(&self.hooks, Collection::Quotes, &quote.id);
        }
        Ok(quote)
    }

    fn find_by_id(&self, quote_id: &str) -> Result<Option<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        load_quote(&mut conn, quote_id)
    }

    fn find_by_opportunity_id(&self, opportunity_id: &str) -> Result<Option<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        quotes::table
            .filter(quotes::opportunity_id.eq(opportunity_id))
            .select(QuoteDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(Quote::try_from)
            .transpose()
    }

    fn list(&self) -> Result<Vec<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        quotes::table
            .select(QuoteDB::as_select())
            .order((quotes::created_at.asc(), quotes::id.asc()))
            .load::<QuoteDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Quote::try_from)
            .collect()
    }
}
