//! Integration tests for the SQLite-backed listing store: transactional
//! edits, event recording, filtered search, and the service workflow run
//! against a real database file.

use std::sync::Arc;

use tempfile::TempDir;

use shopkeeper_core::errors::Error;
use shopkeeper_core::events::{EventType, ListingEventRepositoryTrait};
use shopkeeper_core::listings::{
    ExternalAnchors, ListingFilters, ListingRepositoryTrait, ListingService, ListingServiceTrait,
    ListingStatus, ListingType, ListingUpdate, NewListing, NewListingImage,
};
use shopkeeper_core::messenger::{ChannelConfig, MessengerCall, MockMessenger};
use shopkeeper_storage_sqlite::events::ListingEventRepository;
use shopkeeper_storage_sqlite::listings::ListingRepository;
use shopkeeper_storage_sqlite::{create_pool, init, run_migrations, spawn_writer};

struct Store {
    _dir: TempDir,
    listings: Arc<ListingRepository>,
    events: ListingEventRepository,
}

fn store() -> Store {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("shopkeeper.db");
    let db_path = db_path.to_str().unwrap().to_string();
    init(&db_path).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer((*pool).clone());
    Store {
        _dir: dir,
        listings: Arc::new(ListingRepository::new(pool.clone(), writer)),
        events: ListingEventRepository::new(pool),
    }
}

fn draft(owner_id: i64, title: &str) -> NewListing {
    NewListing {
        listing_type: ListingType::Sell,
        title: title.to_string(),
        description: "A bike".to_string(),
        price: "$50".to_string(),
        owner_id,
    }
}

fn anchors(n: i64) -> ExternalAnchors {
    ExternalAnchors {
        message_id: n,
        thread_id: n + 1,
    }
}

// ==================== Insert / get ====================

#[tokio::test]
async fn insert_assigns_identity_and_records_creation() {
    let store = store();

    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();

    assert!(listing.id > 0);
    assert_eq!(listing.status, ListingStatus::Open);
    assert_eq!(listing.message_id, 100);
    assert_eq!(listing.thread_id, 101);
    assert!(!listing.is_hidden);

    let reloaded = store.listings.get(listing.id).unwrap();
    assert_eq!(reloaded, listing);

    let events = store.events.list_for_listing(listing.id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::ListingCreated);
    assert_eq!(events[0].from_value, None);
    assert_eq!(events[0].to_value.as_deref(), Some("Bike"));
}

#[tokio::test]
async fn get_unknown_listing_is_not_found() {
    let store = store();
    assert!(matches!(store.listings.get(404), Err(Error::NotFound(_))));
}

// ==================== Edit ====================

#[tokio::test]
async fn edit_commits_fields_and_appends_events() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Old"), anchors(100))
        .await
        .unwrap();

    let update = ListingUpdate {
        title: Some("New".to_string()),
        price: Some("$60".to_string()),
        ..Default::default()
    };
    let outcome = store
        .listings
        .apply_edit(listing.id, update, 10, false)
        .await
        .unwrap();
    assert_eq!(outcome.changes.len(), 2);

    let reloaded = store.listings.get(listing.id).unwrap();
    assert_eq!(reloaded.title, "New");
    assert_eq!(reloaded.price, "$60");

    let events = store.events.list_for_listing(listing.id).unwrap();
    let kinds: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::ListingCreated,
            EventType::TitleChanged,
            EventType::PriceChanged,
        ]
    );
    assert_eq!(events[1].from_value.as_deref(), Some("Old"));
    assert_eq!(events[1].to_value.as_deref(), Some("New"));
}

#[tokio::test]
async fn replaying_recorded_events_reconstructs_the_listing() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Old"), anchors(100))
        .await
        .unwrap();

    let edits = [
        ListingUpdate {
            title: Some("Newer".to_string()),
            description: Some("first line\nsecond line".to_string()),
            ..Default::default()
        },
        ListingUpdate {
            price: Some(String::new()),
            status: Some(ListingStatus::Pending),
            ..Default::default()
        },
        ListingUpdate {
            title: Some("Newest".to_string()),
            status: Some(ListingStatus::Closed),
            ..Default::default()
        },
    ];
    for update in edits {
        store
            .listings
            .apply_edit(listing.id, update, 10, false)
            .await
            .unwrap();
    }

    let final_state = store.listings.get(listing.id).unwrap();

    // Replay from/to values in insertion order on top of the initial state.
    let mut title = listing.title.clone();
    let mut description = listing.description.clone();
    let mut price = listing.price.clone();
    let mut status = "Open".to_string();
    for event in store.events.list_for_listing(listing.id).unwrap() {
        let to = event.to_value.clone().unwrap_or_default();
        match event.event_type {
            EventType::ListingCreated => {}
            EventType::TitleChanged => title = to,
            EventType::DescriptionChanged => description = to,
            EventType::PriceChanged => price = to,
            EventType::StatusChanged => status = to,
        }
    }

    assert_eq!(title, final_state.title);
    assert_eq!(description, final_state.description);
    assert_eq!(price, final_state.price);
    assert_eq!(status, final_state.status.label());
}

#[tokio::test]
async fn noop_edit_appends_no_events() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();

    let update = ListingUpdate {
        title: Some("Bike".to_string()),
        price: Some("$50".to_string()),
        ..Default::default()
    };
    let outcome = store
        .listings
        .apply_edit(listing.id, update, 10, false)
        .await
        .unwrap();

    assert!(outcome.changes.is_empty());
    assert_eq!(store.events.list_for_listing(listing.id).unwrap().len(), 1);
}

// ==================== Typed rejections through the writer ====================

#[tokio::test]
async fn rejections_cross_the_writer_boundary_typed() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();

    let update = ListingUpdate {
        title: Some("Stolen".to_string()),
        ..Default::default()
    };
    let err = store
        .listings
        .apply_edit(listing.id, update.clone(), 999, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    store
        .listings
        .apply_edit(
            listing.id,
            ListingUpdate {
                status: Some(ListingStatus::Closed),
                ..Default::default()
            },
            10,
            false,
        )
        .await
        .unwrap();
    let err = store
        .listings
        .apply_edit(listing.id, update, 10, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ListingClosed(_)));

    let err = store
        .listings
        .apply_edit(404, ListingUpdate::default(), 10, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Rejected edits left no trace.
    let reloaded = store.listings.get(listing.id).unwrap();
    assert_eq!(reloaded.title, "Bike");
}

// ==================== Search ====================

#[tokio::test]
async fn search_filters_compose() {
    let store = store();

    // Complete Sell listing.
    let complete = store
        .listings
        .insert(draft(10, "Complete"), anchors(100))
        .await
        .unwrap();
    store
        .listings
        .add_image(NewListingImage {
            path: "complete.png".to_string(),
            width: 640,
            height: 480,
            listing_id: complete.id,
        })
        .await
        .unwrap();

    // Sell listing with no price.
    let mut cheap = draft(20, "No price");
    cheap.price = String::new();
    let deficient = store.listings.insert(cheap, anchors(200)).await.unwrap();

    // Closed listing with every deficiency.
    let mut bare = draft(30, "Closed");
    bare.description = String::new();
    bare.price = String::new();
    let closed = store.listings.insert(bare, anchors(300)).await.unwrap();
    store
        .listings
        .apply_edit(
            closed.id,
            ListingUpdate {
                status: Some(ListingStatus::Closed),
                ..Default::default()
            },
            30,
            false,
        )
        .await
        .unwrap();

    let all = store.listings.list(&ListingFilters::default()).unwrap();
    assert_eq!(all.len(), 3);

    let open_only = store
        .listings
        .list(&ListingFilters {
            statuses: Some(vec![ListingStatus::Open]),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(open_only.len(), 2);

    let by_owner = store
        .listings
        .list(&ListingFilters {
            owners: Some(vec![20, 30]),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_owner.len(), 2);

    let sells = store
        .listings
        .list(&ListingFilters {
            listing_types: Some(vec![ListingType::Sell]),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(sells.len(), 3);

    // The closed listing is deficient but exempt.
    let with_issues = store
        .listings
        .list(&ListingFilters {
            has_issues: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_issues.len(), 1);
    assert_eq!(with_issues[0].id, deficient.id);

    let without_issues = store
        .listings
        .list(&ListingFilters {
            has_issues: Some(false),
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<i64> = without_issues.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![complete.id, closed.id]);
}

#[tokio::test]
async fn hidden_listings_are_excluded_unless_asked_for() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();
    store.listings.set_hidden(listing.id, true).await.unwrap();

    assert!(store
        .listings
        .list(&ListingFilters::default())
        .unwrap()
        .is_empty());

    let with_hidden = store
        .listings
        .list(&ListingFilters {
            include_hidden: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_hidden.len(), 1);
    assert!(with_hidden[0].is_hidden);
}

#[tokio::test]
async fn set_hidden_rejects_redundant_toggles() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();

    assert!(matches!(
        store.listings.set_hidden(listing.id, false).await,
        Err(Error::NotFound(_))
    ));
    store.listings.set_hidden(listing.id, true).await.unwrap();
    assert!(matches!(
        store.listings.set_hidden(listing.id, true).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        store.listings.set_hidden(404, true).await,
        Err(Error::NotFound(_))
    ));
}

// ==================== Images ====================

#[tokio::test]
async fn image_visibility_drives_the_no_images_rule() {
    let store = store();
    let listing = store
        .listings
        .insert(draft(10, "Bike"), anchors(100))
        .await
        .unwrap();

    let has_issues = ListingFilters {
        has_issues: Some(true),
        ..Default::default()
    };
    assert_eq!(store.listings.list(&has_issues).unwrap().len(), 1);

    let image = store
        .listings
        .add_image(NewListingImage {
            path: "bike.png".to_string(),
            width: 640,
            height: 480,
            listing_id: listing.id,
        })
        .await
        .unwrap();
    assert!(store.listings.list(&has_issues).unwrap().is_empty());
    assert_eq!(store.listings.get(listing.id).unwrap().images.len(), 1);

    // Hiding the only image re-opens the issue; the aggregate no longer
    // carries it.
    store
        .listings
        .set_image_hidden(image.id, true)
        .await
        .unwrap();
    assert_eq!(store.listings.list(&has_issues).unwrap().len(), 1);
    assert!(store.listings.get(listing.id).unwrap().images.is_empty());
}

#[tokio::test]
async fn image_for_unknown_listing_is_not_found() {
    let store = store();
    let err = store
        .listings
        .add_image(NewListingImage {
            path: "ghost.png".to_string(),
            width: 1,
            height: 1,
            listing_id: 404,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ==================== Service workflow over real storage ====================

#[tokio::test]
async fn service_workflow_end_to_end() {
    let store = store();
    let messenger = MockMessenger::new();
    let service = ListingService::new(
        store.listings.clone(),
        Arc::new(messenger.clone()),
        ChannelConfig {
            guild_id: 1,
            listings_channel_id: 50,
            events_channel_id: Some(99),
        },
    );

    let mut new = draft(10, "Bike");
    new.description = "  ".to_string();
    new.price = String::new();
    let listing = service.create_listing(new).await.unwrap();

    // Anchors come from the messenger, storage made them durable.
    assert_eq!(listing.message_id, 1001);
    assert_eq!(listing.thread_id, 5001);
    let stored = store.listings.get(listing.id).unwrap();
    assert_eq!(stored.description, "");
    assert_eq!(stored.price, "");

    let issues = service.listing_issues(&stored);
    let titles: Vec<&str> = issues.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["No images", "No price", "No description"]);

    service
        .edit_listing(
            listing.id,
            ListingUpdate {
                title: Some("Blue bike".to_string()),
                ..Default::default()
            },
            10,
            false,
        )
        .await
        .unwrap();

    let calls = messenger.calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, MessengerCall::RenameThread { thread_id: 5001, name } if name == "Blue bike")));

    let events = store.events.list_for_listing(listing.id).unwrap();
    assert_eq!(events.last().unwrap().event_type, EventType::TitleChanged);
    assert!(store
        .events
        .list_all()
        .unwrap()
        .iter()
        .any(|e| e.event_type == EventType::ListingCreated));
}
