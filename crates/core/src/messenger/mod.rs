//! Messaging-platform ports and the rendered listing card.

mod messenger_model;
mod messenger_traits;
mod mock;

pub use messenger_model::{CardField, ChannelConfig, ListingCard};
pub use messenger_traits::{
    DeliveryError, DeliveryResult, MembershipProviderTrait, MessengerTrait,
};
pub use mock::{MessengerCall, MockMembershipProvider, MockMessenger};
