use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::messenger::messenger_model::ListingCard;

/// Result alias for messaging-port calls.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;

/// Errors surfaced by the external messaging connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("recipient {0} is unreachable")]
    RecipientUnreachable(i64),

    #[error("channel {0} is unavailable")]
    ChannelUnavailable(i64),

    #[error("thread {0} is unavailable")]
    ThreadUnavailable(i64),

    #[error("messaging API call failed: {0}")]
    Api(String),
}

/// Port onto the external messaging platform.
///
/// One long-lived connection backs all calls; independent calls are safe to
/// run concurrently, and there is no backpressure beyond the connection
/// itself. Implementations live outside this crate and are injected at
/// startup.
#[async_trait]
pub trait MessengerTrait: Send + Sync {
    /// Posts a rendered listing card to a channel, returning the message id.
    async fn post_message(&self, channel_id: i64, card: &ListingCard) -> DeliveryResult<i64>;

    /// Opens a discussion thread anchored to a message, returning the
    /// thread id.
    async fn create_thread(
        &self,
        channel_id: i64,
        message_id: i64,
        name: &str,
    ) -> DeliveryResult<i64>;

    /// Adds a user to a thread.
    async fn add_participant(&self, thread_id: i64, user_id: i64) -> DeliveryResult<()>;

    /// Replaces a previously posted card in place.
    async fn edit_message(
        &self,
        channel_id: i64,
        message_id: i64,
        card: &ListingCard,
    ) -> DeliveryResult<()>;

    async fn rename_thread(&self, thread_id: i64, name: &str) -> DeliveryResult<()>;

    /// Locks and archives a thread. Terminal; there is no reopen call.
    async fn close_thread(&self, thread_id: i64) -> DeliveryResult<()>;

    /// Direct-messages a user. Fails with `RecipientUnreachable` when the
    /// recipient cannot be reached.
    async fn send_direct(&self, user_id: i64, text: &str) -> DeliveryResult<()>;

    /// Posts plain text to a channel.
    async fn send_channel(&self, channel_id: i64, text: &str) -> DeliveryResult<()>;
}

/// Port onto guild membership.
#[async_trait]
pub trait MembershipProviderTrait: Send + Sync {
    /// The ids of everyone currently in the guild.
    async fn current_members(&self, guild_id: i64) -> DeliveryResult<HashSet<i64>>;
}
