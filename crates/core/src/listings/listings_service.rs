use std::sync::Arc;

use log::{error, warn};

use super::listings_model::{
    EditOutcome, ExternalAnchors, Listing, ListingField, ListingFilters, ListingStatus,
    ListingUpdate, NewListing,
};
use super::listings_traits::{ListingRepositoryTrait, ListingServiceTrait};
use crate::errors::{Error, Result};
use crate::events::describe_change;
use crate::issues::{issues_for, IssueDetails};
use crate::messenger::{ChannelConfig, ListingCard, MessengerTrait};

/// Orchestrates listing mutations across storage and the external
/// messaging surface.
///
/// Storage is authoritative. Edits commit before any messenger call, and a
/// messenger failure after the commit is logged, never surfaced: the caller
/// sees a successful edit and the mirror catches up on the next change.
/// Creation is the one place the external side goes first, because the
/// message and thread ids must exist before the row can be written; a
/// persistence failure there leaves an orphaned message behind, which is
/// logged and accepted.
pub struct ListingService {
    repository: Arc<dyn ListingRepositoryTrait>,
    messenger: Arc<dyn MessengerTrait>,
    channels: ChannelConfig,
}

impl ListingService {
    pub fn new(
        repository: Arc<dyn ListingRepositoryTrait>,
        messenger: Arc<dyn MessengerTrait>,
        channels: ChannelConfig,
    ) -> Self {
        Self {
            repository,
            messenger,
            channels,
        }
    }

    fn listing_url(&self, listing: &Listing) -> String {
        listing.message_url(self.channels.guild_id, self.channels.listings_channel_id)
    }

    /// Best-effort notification to the events channel, if one is configured.
    async fn notify_events_channel(&self, text: String) {
        let Some(events_channel_id) = self.channels.events_channel_id else {
            return;
        };
        if let Err(e) = self.messenger.send_channel(events_channel_id, &text).await {
            warn!("events channel notification failed: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl ListingServiceTrait for ListingService {
    async fn create_listing(&self, draft: NewListing) -> Result<Listing> {
        let draft = draft.normalized();
        draft.validate()?;

        let card = ListingCard::for_draft(&draft);
        let message_id = self
            .messenger
            .post_message(self.channels.listings_channel_id, &card)
            .await?;
        let thread_id = self
            .messenger
            .create_thread(self.channels.listings_channel_id, message_id, &draft.title)
            .await?;
        self.messenger
            .add_participant(thread_id, draft.owner_id)
            .await?;

        let anchors = ExternalAnchors {
            message_id,
            thread_id,
        };
        let listing = match self.repository.insert(draft, anchors).await {
            Ok(listing) => listing,
            Err(e) => {
                // No compensating delete on the external side; the orphaned
                // message and thread are an accepted, operator-visible
                // inconsistency.
                error!(
                    "listing persistence failed, orphaning message {} and thread {}: {}",
                    message_id, thread_id, e
                );
                return Err(e);
            }
        };

        self.notify_events_channel(format!(
            "## Listing **[{}]({})** created",
            listing.title,
            self.listing_url(&listing)
        ))
        .await;

        Ok(listing)
    }

    async fn edit_listing(
        &self,
        listing_id: i64,
        update: ListingUpdate,
        requesting_user_id: i64,
        is_admin: bool,
    ) -> Result<Listing> {
        let EditOutcome { listing, changes } = self
            .repository
            .apply_edit(listing_id, update, requesting_user_id, is_admin)
            .await?;

        if changes.is_empty() {
            return Ok(listing);
        }

        // The commit above is durable; everything below is mirror upkeep.
        let card = ListingCard::for_listing(&listing);
        if let Err(e) = self
            .messenger
            .edit_message(self.channels.listings_channel_id, listing.message_id, &card)
            .await
        {
            warn!("message update failed for listing {}: {}", listing.id, e);
        }

        if changes.iter().any(|c| c.field == ListingField::Title) {
            if let Err(e) = self
                .messenger
                .rename_thread(listing.thread_id, &listing.title)
                .await
            {
                warn!("thread rename failed for listing {}: {}", listing.id, e);
            }
        }

        let closed = listing.status == ListingStatus::Closed
            && changes.iter().any(|c| c.field == ListingField::Status);
        if closed {
            if let Err(e) = self.messenger.close_thread(listing.thread_id).await {
                warn!("thread close failed for listing {}: {}", listing.id, e);
            }
        }

        let sections: Vec<String> = changes.iter().map(describe_change).collect();
        self.notify_events_channel(format!(
            "## Listing **[{}]({})** edited\n{}",
            listing.title,
            self.listing_url(&listing),
            sections.join("\n")
        ))
        .await;

        Ok(listing)
    }

    fn search_listings(&self, filters: &ListingFilters) -> Result<Vec<Listing>> {
        // The public search surface never sees hidden listings, whatever
        // the caller put in the filter.
        let filters = ListingFilters {
            include_hidden: false,
            ..filters.clone()
        };
        self.repository.list(&filters)
    }

    fn listing_issues(&self, listing: &Listing) -> Vec<IssueDetails> {
        issues_for(listing)
    }

    async fn hide_listing(
        &self,
        listing_id: i64,
        hidden: bool,
        requesting_is_admin: bool,
    ) -> Result<Listing> {
        if !requesting_is_admin {
            return Err(Error::Forbidden("moderator rights required".to_string()));
        }
        self.repository.set_hidden(listing_id, hidden).await
    }
}
