use std::sync::Arc;

use diesel::prelude::*;

use shopkeeper_core::events::{ListingEvent, ListingEventRepositoryTrait};
use shopkeeper_core::Result;

use super::model::ListingEventDB;
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::listing_events;

/// Read side of the event log. Rows are appended by [`ListingRepository`]
/// inside the owning mutation's transaction.
///
/// [`ListingRepository`]: crate::listings::ListingRepository
pub struct ListingEventRepository {
    pool: Arc<DbPool>,
}

impl ListingEventRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        ListingEventRepository { pool }
    }
}

impl ListingEventRepositoryTrait for ListingEventRepository {
    fn list_for_listing(&self, listing_id: i64) -> Result<Vec<ListingEvent>> {
        let mut conn = get_connection(&self.pool)?;
        listing_events::table
            .filter(listing_events::listing_id.eq(listing_id))
            .order(listing_events::id.asc())
            .select(ListingEventDB::as_select())
            .load::<ListingEventDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(ListingEventDB::into_domain)
            .collect()
    }

    fn list_all(&self) -> Result<Vec<ListingEvent>> {
        let mut conn = get_connection(&self.pool)?;
        listing_events::table
            .order(listing_events::id.asc())
            .select(ListingEventDB::as_select())
            .load::<ListingEventDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(ListingEventDB::into_domain)
            .collect()
    }
}
