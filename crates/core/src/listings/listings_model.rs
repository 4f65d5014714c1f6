//! Listing domain models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};

/// Whether a listing offers an item for sale or asks to buy one.
///
/// Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Buy,
    Sell,
}

impl ListingType {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Buy => "buy",
            ListingType::Sell => "sell",
        }
    }

    /// Display label used in cards and change records.
    pub fn label(&self) -> &'static str {
        match self {
            ListingType::Buy => "Buy",
            ListingType::Sell => "Sell",
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "buy" => Ok(ListingType::Buy),
            "sell" => Ok(ListingType::Sell),
            _ => Err(format!("Unknown listing type: {}", s)),
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a listing.
///
/// Transitions are deliberately unconstrained: an authorized actor may
/// assign any status at any time. The only terminal behaviour is that a
/// Closed listing rejects content edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Open,
    Pending,
    Closed,
}

impl ListingStatus {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Open => "open",
            ListingStatus::Pending => "pending",
            ListingStatus::Closed => "closed",
        }
    }

    /// Display label used in cards and change records.
    pub fn label(&self) -> &'static str {
        match self {
            ListingStatus::Open => "Open",
            ListingStatus::Pending => "Pending",
            ListingStatus::Closed => "Closed",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(ListingStatus::Open),
            "pending" => Ok(ListingStatus::Pending),
            "closed" => Ok(ListingStatus::Closed),
            _ => Err(format!("Unknown listing status: {}", s)),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image attached to a listing.
///
/// The hidden flag is a moderation control independent of the listing's
/// own; a hidden image stays in storage but is invisible to the UI and to
/// issue evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingImage {
    pub id: i64,
    /// Path relative to the image store root.
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub is_hidden: bool,
    pub listing_id: i64,
}

/// Input model for attaching an image to a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListingImage {
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub listing_id: i64,
}

/// External message/thread identifiers tying a listing to its mirrored
/// representation. Assigned exactly once, at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAnchors {
    pub message_id: i64,
    pub thread_id: i64,
}

/// The central marketplace aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i64,
    pub title: String,
    /// Empty string means "no description".
    pub description: String,
    /// Free-form currency text; empty string means "unset".
    pub price: String,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub status: ListingStatus,
    pub is_hidden: bool,
    pub owner_id: i64,
    pub message_id: i64,
    pub thread_id: i64,
    /// Non-hidden images only; hidden ones never leave the storage layer.
    pub images: Vec<ListingImage>,
}

impl Listing {
    /// Deep link to the mirrored channel message.
    pub fn message_url(&self, guild_id: i64, channel_id: i64) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild_id, channel_id, self.message_id
        )
    }

    /// Applies a partial edit, returning the fields that actually changed
    /// value (old and new), in field order.
    ///
    /// Rejections, in checking order:
    /// - `Forbidden` unless the requester owns the listing or is an admin;
    /// - `Validation` when a provided title is empty;
    /// - `ListingClosed` when the listing is Closed and a content field
    ///   (title, description, price) would change value. Status-only
    ///   changes pass the guard, so a closed listing can be reopened.
    ///
    /// Setting a field to its current value is a no-op and produces no
    /// change entry.
    pub fn apply_edit(
        &mut self,
        update: &ListingUpdate,
        requesting_user_id: i64,
        is_admin: bool,
    ) -> Result<Vec<FieldChange>> {
        if self.owner_id != requesting_user_id && !is_admin {
            return Err(Error::Forbidden("you do not own this listing".to_string()));
        }

        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(ValidationError::MissingField("title".to_string()).into());
            }
        }

        let new_description = update.description.as_deref().map(canonical_value);
        let new_price = update.price.as_deref().map(canonical_value);

        let mut changes = Vec::new();
        if let Some(title) = &update.title {
            if *title != self.title {
                changes.push(FieldChange {
                    field: ListingField::Title,
                    from_value: self.title.clone(),
                    to_value: title.clone(),
                });
            }
        }
        if let Some(description) = &new_description {
            if *description != self.description {
                changes.push(FieldChange {
                    field: ListingField::Description,
                    from_value: self.description.clone(),
                    to_value: description.clone(),
                });
            }
        }
        if let Some(price) = &new_price {
            if *price != self.price {
                changes.push(FieldChange {
                    field: ListingField::Price,
                    from_value: self.price.clone(),
                    to_value: price.clone(),
                });
            }
        }
        if let Some(status) = update.status {
            if status != self.status {
                changes.push(FieldChange {
                    field: ListingField::Status,
                    from_value: self.status.label().to_string(),
                    to_value: status.label().to_string(),
                });
            }
        }

        if self.status == ListingStatus::Closed && changes.iter().any(|c| c.field.is_content()) {
            return Err(Error::ListingClosed(self.id));
        }

        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = new_description {
            self.description = description;
        }
        if let Some(price) = new_price {
            self.price = price;
        }
        if let Some(status) = update.status {
            self.status = status;
        }

        Ok(changes)
    }
}

/// Collapses whitespace-only values to the canonical "unset" form.
fn canonical_value(value: &str) -> String {
    if value.trim().is_empty() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Input model for creating a new listing.
///
/// Carries no identity and no external anchors; both are assigned by the
/// create workflow once the external message and thread exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub title: String,
    pub description: String,
    pub price: String,
    pub owner_id: i64,
}

impl NewListing {
    /// Canonicalizes unset fields: whitespace-only description or price
    /// collapse to the empty string.
    pub fn normalized(mut self) -> Self {
        self.description = canonical_value(&self.description);
        self.price = canonical_value(&self.price);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()).into());
        }
        Ok(())
    }
}

/// A partial edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub status: Option<ListingStatus>,
}

/// Fields that participate in change tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingField {
    Title,
    Description,
    Price,
    Status,
}

impl ListingField {
    /// Content fields are frozen once a listing is Closed; status is not.
    pub fn is_content(&self) -> bool {
        !matches!(self, ListingField::Status)
    }
}

/// One field's transition inside an edit. Status values are recorded as
/// display labels ("Open", "Closed", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: ListingField,
    pub from_value: String,
    pub to_value: String,
}

/// Result of a committed edit: the updated listing and its change set.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub listing: Listing,
    pub changes: Vec<FieldChange>,
}

/// Filters for bulk listing queries.
///
/// `has_issues` is evaluated with the issue rule set's bulk predicate so it
/// always agrees with per-listing issue display. Hidden listings are
/// excluded unless `include_hidden` is set; the public search surface never
/// sets it (the reminder sweep does).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilters {
    pub statuses: Option<Vec<ListingStatus>>,
    pub owners: Option<Vec<i64>>,
    pub listing_types: Option<Vec<ListingType>>,
    pub has_issues: Option<bool>,
    #[serde(skip)]
    pub include_hidden: bool,
}
