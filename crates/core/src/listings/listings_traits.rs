use async_trait::async_trait;

use crate::errors::Result;
use crate::issues::IssueDetails;
use crate::listings::listings_model::{
    EditOutcome, ExternalAnchors, Listing, ListingFilters, ListingImage, ListingUpdate, NewListing,
    NewListingImage,
};

/// Trait for listing storage operations.
///
/// Every mutating method runs inside a single storage transaction.
/// `apply_edit` performs the whole load-validate-modify-commit sequence in
/// that transaction, so two concurrent edits to the same listing cannot
/// interleave their field updates; a rejection aborts the transaction.
/// Change events are appended in the same transaction as the mutation they
/// record.
#[async_trait]
pub trait ListingRepositoryTrait: Send + Sync {
    /// Loads a listing (with its visible images) by id.
    fn get(&self, listing_id: i64) -> Result<Listing>;

    /// Bulk filtered query; see [`ListingFilters`].
    fn list(&self, filters: &ListingFilters) -> Result<Vec<Listing>>;

    /// Persists a new listing in Open status with its external anchors,
    /// recording the creation event.
    async fn insert(&self, draft: NewListing, anchors: ExternalAnchors) -> Result<Listing>;

    /// Loads, edits, and saves a listing in one transaction, recording one
    /// event per changed field.
    async fn apply_edit(
        &self,
        listing_id: i64,
        update: ListingUpdate,
        requesting_user_id: i64,
        is_admin: bool,
    ) -> Result<EditOutcome>;

    /// Moderation visibility toggle. Fails with `NotFound` when the listing
    /// is absent or already in the requested state.
    async fn set_hidden(&self, listing_id: i64, hidden: bool) -> Result<Listing>;

    /// Attaches an image (visible by default).
    async fn add_image(&self, image: NewListingImage) -> Result<ListingImage>;

    /// Moderation visibility toggle for a single image.
    async fn set_image_hidden(&self, image_id: i64, hidden: bool) -> Result<ListingImage>;
}

/// Trait for listing service operations.
#[async_trait]
pub trait ListingServiceTrait: Send + Sync {
    /// Creates a listing: external message and thread first, then one
    /// storage transaction, then a best-effort notification.
    async fn create_listing(&self, draft: NewListing) -> Result<Listing>;

    /// Edits a listing: storage commit first, then best-effort external
    /// mirror updates and notifications.
    async fn edit_listing(
        &self,
        listing_id: i64,
        update: ListingUpdate,
        requesting_user_id: i64,
        is_admin: bool,
    ) -> Result<Listing>;

    /// Filtered search; hidden listings are always excluded here.
    fn search_listings(&self, filters: &ListingFilters) -> Result<Vec<Listing>>;

    /// Open issues on a listing, for UI display.
    fn listing_issues(&self, listing: &Listing) -> Vec<IssueDetails>;

    /// Moderation-only visibility toggle, independent of status.
    async fn hide_listing(
        &self,
        listing_id: i64,
        hidden: bool,
        requesting_is_admin: bool,
    ) -> Result<Listing>;
}
