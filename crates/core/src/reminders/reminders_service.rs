use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};
use tokio::time::{interval_at, Instant};

use crate::constants::DEFAULT_REMINDER_INTERVAL_SECS;
use crate::errors::Result;
use crate::listings::{ListingFilters, ListingRepositoryTrait, ListingStatus};
use crate::messenger::{MembershipProviderTrait, MessengerTrait};

/// Default sweep cadence: every two weeks.
pub fn default_reminder_interval() -> Duration {
    Duration::from_secs(DEFAULT_REMINDER_INTERVAL_SECS)
}

/// Outcome of one reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSweepSummary {
    pub owners_notified: usize,
    pub listings_flagged: usize,
    pub deliveries_failed: usize,
}

fn pluralise<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/// Periodically nudges owners about listings with open issues.
pub struct ReminderService {
    repository: Arc<dyn ListingRepositoryTrait>,
    messenger: Arc<dyn MessengerTrait>,
    membership: Arc<dyn MembershipProviderTrait>,
    guild_id: i64,
}

impl ReminderService {
    pub fn new(
        repository: Arc<dyn ListingRepositoryTrait>,
        messenger: Arc<dyn MessengerTrait>,
        membership: Arc<dyn MembershipProviderTrait>,
        guild_id: i64,
    ) -> Self {
        Self {
            repository,
            messenger,
            membership,
            guild_id,
        }
    }

    /// One sweep: one direct message per current guild member owning at
    /// least one non-closed listing with open issues. Owners who left the
    /// guild are never queried, let alone messaged. Deliveries run
    /// independently; a failed one is logged and does not stop the rest.
    pub async fn send_reminders(&self) -> Result<ReminderSweepSummary> {
        let members = self.membership.current_members(self.guild_id).await?;

        let filters = ListingFilters {
            owners: Some(members.into_iter().collect()),
            statuses: Some(vec![ListingStatus::Open, ListingStatus::Pending]),
            has_issues: Some(true),
            include_hidden: true,
            ..Default::default()
        };
        let flagged = self.repository.list(&filters)?;

        let mut per_owner: HashMap<i64, usize> = HashMap::new();
        for listing in &flagged {
            *per_owner.entry(listing.owner_id).or_insert(0) += 1;
        }

        let deliveries = per_owner.iter().map(|(&owner_id, &count)| {
            let messenger = self.messenger.clone();
            async move {
                let text = format!(
                    "You have {} active {} with issues that need your attention. \
                     Please check the Shopkeeper UI for more details.",
                    count,
                    pluralise(count, "listing", "listings"),
                );
                messenger
                    .send_direct(owner_id, &text)
                    .await
                    .map_err(|e| (owner_id, e))
            }
        });

        let mut summary = ReminderSweepSummary {
            listings_flagged: flagged.len(),
            ..Default::default()
        };
        for delivery in join_all(deliveries).await {
            match delivery {
                Ok(()) => summary.owners_notified += 1,
                Err((owner_id, e)) => {
                    warn!("reminder delivery to {} failed: {}", owner_id, e);
                    summary.deliveries_failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Starts the periodic reminder sweep.
///
/// The first sweep runs one full interval after startup, so a restart never
/// re-notifies immediately. A failed sweep is logged and the schedule keeps
/// going.
pub fn spawn_reminder_scheduler(
    service: Arc<ReminderService>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("reminder scheduler started ({}s interval)", every.as_secs());
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            ticker.tick().await;
            match service.send_reminders().await {
                Ok(summary) => info!(
                    "reminder sweep: {} owners notified, {} listings flagged, {} failed deliveries",
                    summary.owners_notified, summary.listings_flagged, summary.deliveries_failed
                ),
                Err(e) => warn!("reminder sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::{Error, Result};
    use crate::issues::has_open_issues;
    use crate::listings::{
        EditOutcome, ExternalAnchors, Listing, ListingImage, ListingType, ListingUpdate,
        NewListing, NewListingImage,
    };
    use crate::messenger::{MockMembershipProvider, MockMessenger};

    const GUILD: i64 = 1;

    /// Read-only repository double; only `list` is reachable from the sweep.
    struct FixedListingRepository {
        listings: Mutex<Vec<Listing>>,
    }

    impl FixedListingRepository {
        fn new(listings: Vec<Listing>) -> Arc<Self> {
            Arc::new(Self {
                listings: Mutex::new(listings),
            })
        }
    }

    #[async_trait]
    impl ListingRepositoryTrait for FixedListingRepository {
        fn get(&self, listing_id: i64) -> Result<Listing> {
            self.listings
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.id == listing_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Listing {}", listing_id)))
        }

        fn list(&self, filters: &ListingFilters) -> Result<Vec<Listing>> {
            Ok(self
                .listings
                .lock()
                .unwrap()
                .iter()
                .filter(|l| filters.include_hidden || !l.is_hidden)
                .filter(|l| {
                    filters
                        .statuses
                        .as_ref()
                        .is_none_or(|statuses| statuses.contains(&l.status))
                })
                .filter(|l| {
                    filters
                        .owners
                        .as_ref()
                        .is_none_or(|owners| owners.contains(&l.owner_id))
                })
                .filter(|l| {
                    filters
                        .has_issues
                        .is_none_or(|wanted| has_open_issues(l) == wanted)
                })
                .cloned()
                .collect())
        }

        async fn insert(&self, _draft: NewListing, _anchors: ExternalAnchors) -> Result<Listing> {
            unimplemented!()
        }

        async fn apply_edit(
            &self,
            _listing_id: i64,
            _update: ListingUpdate,
            _requesting_user_id: i64,
            _is_admin: bool,
        ) -> Result<EditOutcome> {
            unimplemented!()
        }

        async fn set_hidden(&self, _listing_id: i64, _hidden: bool) -> Result<Listing> {
            unimplemented!()
        }

        async fn add_image(&self, _image: NewListingImage) -> Result<ListingImage> {
            unimplemented!()
        }

        async fn set_image_hidden(&self, _image_id: i64, _hidden: bool) -> Result<ListingImage> {
            unimplemented!()
        }
    }

    fn sell_listing(id: i64, owner_id: i64) -> Listing {
        Listing {
            id,
            title: format!("Listing {}", id),
            description: "described".to_string(),
            // No price: open issue on a Sell listing.
            price: String::new(),
            listing_type: ListingType::Sell,
            status: ListingStatus::Open,
            is_hidden: false,
            owner_id,
            message_id: id * 10,
            thread_id: id * 100,
            images: vec![ListingImage {
                id,
                path: format!("{}/photo.png", id),
                width: 640,
                height: 480,
                is_hidden: false,
                listing_id: id,
            }],
        }
    }

    fn complete_listing(id: i64, owner_id: i64) -> Listing {
        let mut listing = sell_listing(id, owner_id);
        listing.price = "$10".to_string();
        listing
    }

    #[tokio::test]
    async fn test_sweep_notifies_only_members_with_deficient_listings() {
        // A owns two deficient listings, B owns a complete one, C owns a
        // deficient one but left the guild.
        let repository = FixedListingRepository::new(vec![
            sell_listing(1, 100),
            sell_listing(2, 100),
            complete_listing(3, 200),
            sell_listing(4, 300),
        ]);
        let messenger = MockMessenger::new();
        let membership = MockMembershipProvider::new([100, 200]);
        let service = ReminderService::new(
            repository,
            Arc::new(messenger.clone()),
            Arc::new(membership),
            GUILD,
        );

        let summary = service.send_reminders().await.unwrap();

        assert_eq!(summary.owners_notified, 1);
        assert_eq!(summary.listings_flagged, 2);
        assert_eq!(summary.deliveries_failed, 0);

        let to_a = messenger.direct_messages_to(100);
        assert_eq!(to_a.len(), 1);
        assert!(to_a[0].contains("2 active listings"));
        assert!(to_a[0].contains("Shopkeeper UI"));
        assert!(messenger.direct_messages_to(200).is_empty());
        assert!(messenger.direct_messages_to(300).is_empty());
    }

    #[tokio::test]
    async fn test_sweep_pluralises_single_listing() {
        let repository = FixedListingRepository::new(vec![sell_listing(1, 100)]);
        let messenger = MockMessenger::new();
        let service = ReminderService::new(
            repository,
            Arc::new(messenger.clone()),
            Arc::new(MockMembershipProvider::new([100])),
            GUILD,
        );

        service.send_reminders().await.unwrap();

        let to_a = messenger.direct_messages_to(100);
        assert!(to_a[0].contains("1 active listing with issues"));
    }

    #[tokio::test]
    async fn test_closed_listings_never_trigger_reminders() {
        let mut closed = sell_listing(1, 100);
        closed.status = ListingStatus::Closed;
        let repository = FixedListingRepository::new(vec![closed]);
        let messenger = MockMessenger::new();
        let service = ReminderService::new(
            repository,
            Arc::new(messenger.clone()),
            Arc::new(MockMembershipProvider::new([100])),
            GUILD,
        );

        let summary = service.send_reminders().await.unwrap();
        assert_eq!(summary, ReminderSweepSummary::default());
        assert!(messenger.direct_messages_to(100).is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_delivery_does_not_block_the_rest() {
        let repository =
            FixedListingRepository::new(vec![sell_listing(1, 100), sell_listing(2, 200)]);
        let messenger = MockMessenger::new();
        messenger.mark_unreachable(100);
        let service = ReminderService::new(
            repository,
            Arc::new(messenger.clone()),
            Arc::new(MockMembershipProvider::new([100, 200])),
            GUILD,
        );

        let summary = service.send_reminders().await.unwrap();

        assert_eq!(summary.owners_notified, 1);
        assert_eq!(summary.deliveries_failed, 1);
        assert_eq!(messenger.direct_messages_to(200).len(), 1);
    }

    #[test]
    fn test_pluralise() {
        assert_eq!(pluralise(1, "listing", "listings"), "listing");
        assert_eq!(pluralise(2, "listing", "listings"), "listings");
        assert_eq!(pluralise(0, "listing", "listings"), "listings");
    }

    #[test]
    fn test_default_interval_is_two_weeks() {
        assert_eq!(default_reminder_interval(), Duration::from_secs(14 * 24 * 60 * 60));
    }
}
