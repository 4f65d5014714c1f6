//! Listing change history: event rows, rendering, and diff summaries.

mod diff;
mod events_model;
mod events_traits;

pub use diff::{describe_change, unified_description_diff};
pub use events_model::{stringify_event_value, EventType, ListingEvent, NewListingEvent};
pub use events_traits::ListingEventRepositoryTrait;
