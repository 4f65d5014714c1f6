//! Event log storage.

pub mod model;
pub mod repository;

pub use model::{ListingEventDB, NewListingEventDB};
pub use repository::ListingEventRepository;
