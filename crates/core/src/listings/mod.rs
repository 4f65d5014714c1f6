//! Listings module - the aggregate, its services, and storage traits.

mod listings_model;
mod listings_service;
mod listings_traits;


// Re-export the public interface
pub use listings_model::{
    EditOutcome, ExternalAnchors, FieldChange, Listing, ListingField, ListingFilters,
    ListingImage, ListingStatus, ListingType, ListingUpdate, NewListing, NewListingImage,
};
pub use listings_service::ListingService;
pub use listings_traits::{ListingRepositoryTrait, ListingServiceTrait};
