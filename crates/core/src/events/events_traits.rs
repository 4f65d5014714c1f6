use crate::errors::Result;
use crate::events::events_model::ListingEvent;

/// Read access to the append-only event log.
///
/// Rows are appended by the listings repository inside the transaction of
/// the mutation they describe; nothing updates or deletes them afterwards.
pub trait ListingEventRepositoryTrait: Send + Sync {
    /// Events for one listing, oldest first.
    fn list_for_listing(&self, listing_id: i64) -> Result<Vec<ListingEvent>>;

    /// The whole log, oldest first. Feeds the change-history surfaces.
    fn list_all(&self) -> Result<Vec<ListingEvent>>;
}
