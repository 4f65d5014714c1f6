//! Database models for listings and their images.

use std::str::FromStr;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shopkeeper_core::errors::{DatabaseError, Result};
use shopkeeper_core::listings::{
    ExternalAnchors, Listing, ListingImage, ListingStatus, ListingType, NewListing,
    NewListingImage,
};

/// Database model for listings.
#[derive(
    Queryable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::listings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ListingDB {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: String,
    pub listing_type: String,
    pub status: String,
    pub is_hidden: bool,
    pub owner_id: i64,
    pub message_id: i64,
    pub thread_id: i64,
}

/// Database model for creating a new listing.
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::listings)]
#[serde(rename_all = "camelCase")]
pub struct NewListingDB {
    pub title: String,
    pub description: String,
    pub price: String,
    pub listing_type: String,
    pub status: String,
    pub is_hidden: bool,
    pub owner_id: i64,
    pub message_id: i64,
    pub thread_id: i64,
}

/// Database model for listing images.
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
#[diesel(table_name = crate::schema::listing_images)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ListingImageDB {
    pub id: i64,
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub is_hidden: bool,
    pub listing_id: i64,
}

/// Database model for attaching a new image.
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::listing_images)]
#[serde(rename_all = "camelCase")]
pub struct NewListingImageDB {
    pub path: String,
    pub width: i32,
    pub height: i32,
    pub is_hidden: bool,
    pub listing_id: i64,
}

// Conversion to and from domain models

impl ListingDB {
    /// Builds the domain aggregate; `images` must be the listing's visible
    /// images.
    pub fn into_domain(self, images: Vec<ListingImageDB>) -> Result<Listing> {
        Ok(Listing {
            id: self.id,
            title: self.title,
            description: self.description,
            price: self.price,
            listing_type: ListingType::from_str(&self.listing_type)
                .map_err(DatabaseError::Internal)?,
            status: ListingStatus::from_str(&self.status).map_err(DatabaseError::Internal)?,
            is_hidden: self.is_hidden,
            owner_id: self.owner_id,
            message_id: self.message_id,
            thread_id: self.thread_id,
            images: images.into_iter().map(ListingImage::from).collect(),
        })
    }

    pub fn from_domain(listing: &Listing) -> Self {
        Self {
            id: listing.id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price.clone(),
            listing_type: listing.listing_type.as_str().to_string(),
            status: listing.status.as_str().to_string(),
            is_hidden: listing.is_hidden,
            owner_id: listing.owner_id,
            message_id: listing.message_id,
            thread_id: listing.thread_id,
        }
    }
}

impl NewListingDB {
    /// New listings are always born Open and visible.
    pub fn from_draft(draft: NewListing, anchors: ExternalAnchors) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            price: draft.price,
            listing_type: draft.listing_type.as_str().to_string(),
            status: ListingStatus::Open.as_str().to_string(),
            is_hidden: false,
            owner_id: draft.owner_id,
            message_id: anchors.message_id,
            thread_id: anchors.thread_id,
        }
    }
}

impl From<ListingImageDB> for ListingImage {
    fn from(db: ListingImageDB) -> Self {
        Self {
            id: db.id,
            path: db.path,
            width: db.width,
            height: db.height,
            is_hidden: db.is_hidden,
            listing_id: db.listing_id,
        }
    }
}

impl From<NewListingImage> for NewListingImageDB {
    fn from(domain: NewListingImage) -> Self {
        Self {
            path: domain.path,
            width: domain.width,
            height: domain.height,
            is_hidden: false,
            listing_id: domain.listing_id,
        }
    }
}
