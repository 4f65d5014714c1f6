//! Listing storage: models, repository, and the issue-rule SQL lowering.

pub mod model;
pub mod repository;

pub use model::{ListingDB, ListingImageDB, NewListingDB, NewListingImageDB};
pub use repository::ListingRepository;
