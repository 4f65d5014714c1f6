//! Rendered listing representation handed to the messenger.

use serde::{Deserialize, Serialize};

use crate::listings::{Listing, ListingStatus, ListingType, NewListing};

/// Channel wiring for the marketplace guild.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub guild_id: i64,
    /// Channel where listing cards are posted.
    pub listings_channel_id: i64,
    /// Optional channel receiving create/edit notifications.
    pub events_channel_id: Option<i64>,
}

/// Accent colour per (type, status), matching the web UI legend.
fn card_colour(listing_type: ListingType, status: ListingStatus) -> u32 {
    match (listing_type, status) {
        (ListingType::Buy, ListingStatus::Open) => 0x3498DB,
        (ListingType::Sell, ListingStatus::Open) => 0x2ECC71,
        (_, ListingStatus::Pending) => 0xF1C40F,
        (_, ListingStatus::Closed) => 0xE74C3C,
    }
}

/// One name/value field on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Summary embed mirrored into the listings channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCard {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<CardField>,
}

impl ListingCard {
    pub fn for_listing(listing: &Listing) -> Self {
        Self::compose(
            &listing.title,
            &listing.description,
            &listing.price,
            listing.listing_type,
            listing.status,
            listing.owner_id,
        )
    }

    /// Card for a draft that has not been persisted yet; drafts always
    /// render as Open.
    pub fn for_draft(draft: &NewListing) -> Self {
        Self::compose(
            &draft.title,
            &draft.description,
            &draft.price,
            draft.listing_type,
            ListingStatus::Open,
            draft.owner_id,
        )
    }

    fn compose(
        title: &str,
        description: &str,
        price: &str,
        listing_type: ListingType,
        status: ListingStatus,
        owner_id: i64,
    ) -> Self {
        let mut fields = vec![
            CardField {
                name: "Type".to_string(),
                value: listing_type.label().to_string(),
                inline: true,
            },
            CardField {
                name: "Status".to_string(),
                value: status.label().to_string(),
                inline: true,
            },
            CardField {
                name: "Owner".to_string(),
                value: format!("<@{}>", owner_id),
                inline: true,
            },
        ];
        if !price.is_empty() {
            fields.push(CardField {
                name: "Price".to_string(),
                value: price.to_string(),
                inline: true,
            });
        }

        Self {
            title: title.to_string(),
            description: if description.is_empty() {
                "No description.".to_string()
            } else {
                description.to_string()
            },
            colour: card_colour(listing_type, status),
            fields,
        }
    }
}
