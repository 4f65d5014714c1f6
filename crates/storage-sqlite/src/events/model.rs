//! Database models for the listing event log.

use std::str::FromStr;

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shopkeeper_core::errors::{DatabaseError, Result};
use shopkeeper_core::events::{EventType, ListingEvent, NewListingEvent};

use crate::listings::model::ListingDB;

/// Database model for recorded listing events.
#[derive(
    Queryable,
    Identifiable,
    Associations,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(ListingDB, foreign_key = listing_id))]
#[diesel(table_name = crate::schema::listing_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ListingEventDB {
    pub id: i64,
    pub event_type: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub time: NaiveDateTime,
    pub listing_id: i64,
}

/// Database model for appending a new event row.
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::listing_events)]
#[serde(rename_all = "camelCase")]
pub struct NewListingEventDB {
    pub event_type: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub time: NaiveDateTime,
    pub listing_id: i64,
}

impl ListingEventDB {
    pub fn into_domain(self) -> Result<ListingEvent> {
        Ok(ListingEvent {
            id: self.id,
            event_type: EventType::from_str(&self.event_type).map_err(DatabaseError::Internal)?,
            from_value: self.from_value,
            to_value: self.to_value,
            time: Utc.from_utc_datetime(&self.time),
            listing_id: self.listing_id,
        })
    }
}

impl From<NewListingEvent> for NewListingEventDB {
    fn from(domain: NewListingEvent) -> Self {
        Self {
            event_type: domain.event_type.as_str().to_string(),
            from_value: domain.from_value,
            to_value: domain.to_value,
            time: domain.time.naive_utc(),
            listing_id: domain.listing_id,
        }
    }
}
