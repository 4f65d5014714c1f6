//! Listing change events.
//!
//! Events are an append-only audit log: rows are built here, appended by
//! the listings repository inside the transaction of the mutation they
//! describe, and never updated or deleted afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::EMPTY_VALUE_PLACEHOLDER;
use crate::listings::{FieldChange, ListingField};

/// Kinds of recorded listing changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ListingCreated,
    TitleChanged,
    DescriptionChanged,
    PriceChanged,
    StatusChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ListingCreated => "listing_created",
            EventType::TitleChanged => "title_changed",
            EventType::DescriptionChanged => "description_changed",
            EventType::PriceChanged => "price_changed",
            EventType::StatusChanged => "status_changed",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "listing_created" => Ok(EventType::ListingCreated),
            "title_changed" => Ok(EventType::TitleChanged),
            "description_changed" => Ok(EventType::DescriptionChanged),
            "price_changed" => Ok(EventType::PriceChanged),
            "status_changed" => Ok(EventType::StatusChanged),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded change. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEvent {
    pub id: i64,
    pub event_type: EventType,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    /// Set once, at insertion.
    pub time: DateTime<Utc>,
    pub listing_id: i64,
}

/// Builder for new event rows.
///
/// These constructors are the only way event rows come into existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListingEvent {
    pub event_type: EventType,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub time: DateTime<Utc>,
    pub listing_id: i64,
}

impl NewListingEvent {
    /// Creation event; `to_value` carries the initial title.
    pub fn created(listing_id: i64, title: &str) -> Self {
        Self {
            event_type: EventType::ListingCreated,
            from_value: None,
            to_value: Some(title.to_string()),
            time: Utc::now(),
            listing_id,
        }
    }

    /// One event per actually-changed field of an edit.
    pub fn field_change(listing_id: i64, change: &FieldChange) -> Self {
        let event_type = match change.field {
            ListingField::Title => EventType::TitleChanged,
            ListingField::Description => EventType::DescriptionChanged,
            ListingField::Price => EventType::PriceChanged,
            ListingField::Status => EventType::StatusChanged,
        };
        Self {
            event_type,
            from_value: Some(change.from_value.clone()),
            to_value: Some(change.to_value.clone()),
            time: Utc::now(),
            listing_id,
        }
    }
}

/// Wraps a recorded value for display; empty values become an explicit
/// placeholder instead of a blank.
pub fn stringify_event_value(value: Option<&str>) -> String {
    match value {
        None | Some("") => EMPTY_VALUE_PLACEHOLDER.to_string(),
        Some(v) => format!("`{}`", v),
    }
}

impl ListingEvent {
    /// Title line for history and feed views.
    pub fn render_title(&self, listing_title: &str) -> String {
        match self.event_type {
            EventType::ListingCreated => {
                format!("New Listing: {}", self.to_value.as_deref().unwrap_or_default())
            }
            EventType::TitleChanged => format!("{}: Title Changed", listing_title),
            EventType::DescriptionChanged => format!("{}: Description Changed", listing_title),
            EventType::PriceChanged => format!("{}: Price Changed", listing_title),
            EventType::StatusChanged => format!("{}: Status Changed", listing_title),
        }
    }

    /// Description line for history and feed views.
    pub fn render_description(&self) -> String {
        let changed = |field: &str| {
            format!(
                "{} changed from {} to {}",
                field,
                stringify_event_value(self.from_value.as_deref()),
                stringify_event_value(self.to_value.as_deref()),
            )
        };
        match self.event_type {
            EventType::ListingCreated => "Listing created".to_string(),
            EventType::TitleChanged => changed("Title"),
            EventType::DescriptionChanged => changed("Description"),
            EventType::PriceChanged => changed("Price"),
            EventType::StatusChanged => changed("Status"),
        }
    }
}
