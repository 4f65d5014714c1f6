use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::{exists, not};
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use diesel::{BoxableExpression, IntoSql, SqliteConnection};

use shopkeeper_core::errors::{Error, Result};
use shopkeeper_core::events::NewListingEvent;
use shopkeeper_core::issues::{open_issues_expr, RuleExpr};
use shopkeeper_core::listings::{
    EditOutcome, ExternalAnchors, Listing, ListingFilters, ListingImage, ListingRepositoryTrait,
    ListingUpdate, NewListing, NewListingImage,
};

use super::model::{ListingDB, ListingImageDB, NewListingDB, NewListingImageDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::events::model::NewListingEventDB;
use crate::schema::{listing_events, listing_images, listings};

/// Boxed SQL predicate over the listings table.
type ListingPredicate = Box<dyn BoxableExpression<listings::table, Sqlite, SqlType = Bool>>;

/// Lowers an issue-rule expression tree to a SQL predicate.
///
/// This is the second interpreter of the rule set; `RuleExpr::matches` is
/// the first. The two must give the same answer for every listing, which
/// `prop_rules_agree_in_memory_and_in_sql` below checks.
fn lower_rule_expr(expr: &RuleExpr) -> ListingPredicate {
    match expr {
        RuleExpr::All(parts) => parts
            .iter()
            .map(lower_rule_expr)
            .reduce(|a, b| Box::new(a.and(b)) as ListingPredicate)
            .unwrap_or_else(|| Box::new(true.into_sql::<Bool>())),
        RuleExpr::Any(parts) => parts
            .iter()
            .map(lower_rule_expr)
            .reduce(|a, b| Box::new(a.or(b)) as ListingPredicate)
            .unwrap_or_else(|| Box::new(false.into_sql::<Bool>())),
        RuleExpr::TypeIs(listing_type) => {
            Box::new(listings::listing_type.eq(listing_type.as_str()))
        }
        RuleExpr::StatusIsNot(status) => Box::new(listings::status.ne(status.as_str())),
        RuleExpr::PriceUnset => Box::new(listings::price.eq("")),
        RuleExpr::DescriptionUnset => Box::new(listings::description.eq("")),
        RuleExpr::NoVisibleImages => Box::new(not(exists(
            listing_images::table
                .filter(listing_images::listing_id.eq(listings::id))
                .filter(listing_images::is_hidden.eq(false)),
        ))),
    }
}

/// Loads one listing with its visible images, or `NotFound`.
fn load_listing(conn: &mut SqliteConnection, listing_id: i64) -> Result<Listing> {
    let listing_db = listings::table
        .find(listing_id)
        .select(ListingDB::as_select())
        .first::<ListingDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| Error::NotFound(format!("Listing {}", listing_id)))?;

    let images = ListingImageDB::belonging_to(&listing_db)
        .filter(listing_images::is_hidden.eq(false))
        .select(ListingImageDB::as_select())
        .load::<ListingImageDB>(conn)
        .into_core()?;

    listing_db.into_domain(images)
}

pub struct ListingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ListingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ListingRepository { pool, writer }
    }

    fn get_impl(&self, listing_id: i64) -> Result<Listing> {
        let mut conn = get_connection(&self.pool)?;
        load_listing(&mut conn, listing_id)
    }

    fn list_impl(&self, filters: &ListingFilters) -> Result<Vec<Listing>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = listings::table
            .select(ListingDB::as_select())
            .into_boxed();

        if !filters.include_hidden {
            query = query.filter(listings::is_hidden.eq(false));
        }
        if let Some(statuses) = &filters.statuses {
            let values: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            query = query.filter(listings::status.eq_any(values));
        }
        if let Some(owners) = &filters.owners {
            query = query.filter(listings::owner_id.eq_any(owners.clone()));
        }
        if let Some(types) = &filters.listing_types {
            let values: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            query = query.filter(listings::listing_type.eq_any(values));
        }
        match filters.has_issues {
            Some(true) => query = query.filter(lower_rule_expr(&open_issues_expr())),
            Some(false) => query = query.filter(not(lower_rule_expr(&open_issues_expr()))),
            None => {}
        }

        let listing_rows = query
            .order(listings::id.asc())
            .load::<ListingDB>(&mut conn)
            .into_core()?;

        let images = ListingImageDB::belonging_to(&listing_rows)
            .filter(listing_images::is_hidden.eq(false))
            .select(ListingImageDB::as_select())
            .load::<ListingImageDB>(&mut conn)
            .into_core()?
            .grouped_by(&listing_rows);

        listing_rows
            .into_iter()
            .zip(images)
            .map(|(row, row_images)| row.into_domain(row_images))
            .collect()
    }
}

#[async_trait]
impl ListingRepositoryTrait for ListingRepository {
    fn get(&self, listing_id: i64) -> Result<Listing> {
        self.get_impl(listing_id)
    }

    fn list(&self, filters: &ListingFilters) -> Result<Vec<Listing>> {
        self.list_impl(filters)
    }

    async fn insert(&self, draft: NewListing, anchors: ExternalAnchors) -> Result<Listing> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Listing> {
                let new_row = NewListingDB::from_draft(draft, anchors);
                let listing_db: ListingDB = diesel::insert_into(listings::table)
                    .values(&new_row)
                    .returning(ListingDB::as_returning())
                    .get_result(conn)
                    .into_core()?;

                let created = NewListingEventDB::from(NewListingEvent::created(
                    listing_db.id,
                    &listing_db.title,
                ));
                diesel::insert_into(listing_events::table)
                    .values(&created)
                    .execute(conn)
                    .into_core()?;

                listing_db.into_domain(Vec::new())
            })
            .await
    }

    async fn apply_edit(
        &self,
        listing_id: i64,
        update: ListingUpdate,
        requesting_user_id: i64,
        is_admin: bool,
    ) -> Result<EditOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<EditOutcome> {
                let mut listing = load_listing(conn, listing_id)?;
                let changes = listing.apply_edit(&update, requesting_user_id, is_admin)?;
                if changes.is_empty() {
                    return Ok(EditOutcome { listing, changes });
                }

                diesel::update(listings::table.find(listing_id))
                    .set(ListingDB::from_domain(&listing))
                    .execute(conn)
                    .into_core()?;

                let event_rows: Vec<NewListingEventDB> = changes
                    .iter()
                    .map(|change| {
                        NewListingEventDB::from(NewListingEvent::field_change(listing_id, change))
                    })
                    .collect();
                diesel::insert_into(listing_events::table)
                    .values(&event_rows)
                    .execute(conn)
                    .into_core()?;

                Ok(EditOutcome { listing, changes })
            })
            .await
    }

    async fn set_hidden(&self, listing_id: i64, hidden: bool) -> Result<Listing> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Listing> {
                let mut listing = load_listing(conn, listing_id)?;
                if listing.is_hidden == hidden {
                    // Nothing to toggle; the moderation API reports this as
                    // absent.
                    return Err(Error::NotFound(format!("Listing {}", listing_id)));
                }
                diesel::update(listings::table.find(listing_id))
                    .set(listings::is_hidden.eq(hidden))
                    .execute(conn)
                    .into_core()?;
                listing.is_hidden = hidden;
                Ok(listing)
            })
            .await
    }

    async fn add_image(&self, image: NewListingImage) -> Result<ListingImage> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ListingImage> {
                // Surface a typed NotFound rather than a foreign key error.
                load_listing(conn, image.listing_id)?;
                let image_db: ListingImageDB = diesel::insert_into(listing_images::table)
                    .values(&NewListingImageDB::from(image))
                    .returning(ListingImageDB::as_returning())
                    .get_result(conn)
                    .into_core()?;
                Ok(ListingImage::from(image_db))
            })
            .await
    }

    async fn set_image_hidden(&self, image_id: i64, hidden: bool) -> Result<ListingImage> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ListingImage> {
                let image_db = listing_images::table
                    .find(image_id)
                    .select(ListingImageDB::as_select())
                    .first::<ListingImageDB>(conn)
                    .optional()
                    .into_core()?
                    .ok_or_else(|| Error::NotFound(format!("Image {}", image_id)))?;
                if image_db.is_hidden == hidden {
                    return Err(Error::NotFound(format!("Image {}", image_id)));
                }
                diesel::update(listing_images::table.find(image_id))
                    .set(listing_images::is_hidden.eq(hidden))
                    .execute(conn)
                    .into_core()?;
                Ok(ListingImage::from(ListingImageDB {
                    is_hidden: hidden,
                    ..image_db
                }))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tempfile::TempDir;

    use shopkeeper_core::issues::{issue_rules, open_issues_expr};
    use shopkeeper_core::listings::{ListingStatus, ListingType};

    use super::*;
    use crate::db::{create_pool, init, run_migrations};

    fn test_pool() -> (TempDir, Arc<DbPool>) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("shopkeeper.db");
        let db_path = db_path.to_str().unwrap().to_string();
        init(&db_path).unwrap();
        let pool = create_pool(&db_path).unwrap();
        run_migrations(&pool).unwrap();
        (dir, pool)
    }

    fn insert_listing(
        conn: &mut SqliteConnection,
        listing_type: ListingType,
        status: ListingStatus,
        description: &str,
        price: &str,
        visible_images: usize,
        hidden_images: usize,
    ) -> i64 {
        let row = NewListingDB {
            title: "Bike".to_string(),
            description: description.to_string(),
            price: price.to_string(),
            listing_type: listing_type.as_str().to_string(),
            status: status.as_str().to_string(),
            is_hidden: false,
            owner_id: 1,
            message_id: 1,
            thread_id: 1,
        };
        let listing: ListingDB = diesel::insert_into(listings::table)
            .values(&row)
            .returning(ListingDB::as_returning())
            .get_result(conn)
            .unwrap();

        for n in 0..(visible_images + hidden_images) {
            let image = NewListingImageDB {
                path: format!("{}/{}.png", listing.id, n),
                width: 640,
                height: 480,
                is_hidden: n >= visible_images,
                listing_id: listing.id,
            };
            diesel::insert_into(listing_images::table)
                .values(&image)
                .execute(conn)
                .unwrap();
        }
        listing.id
    }

    fn sql_matches(conn: &mut SqliteConnection, expr: &RuleExpr, listing_id: i64) -> bool {
        let matched: i64 = listings::table
            .filter(listings::id.eq(listing_id))
            .filter(lower_rule_expr(expr))
            .count()
            .get_result(conn)
            .unwrap();
        matched == 1
    }

    #[test]
    fn test_empty_combinators_lower_to_constants() {
        let (_dir, pool) = test_pool();
        let mut conn = pool.get().unwrap();
        let listing_id = insert_listing(
            &mut conn,
            ListingType::Sell,
            ListingStatus::Open,
            "",
            "",
            0,
            0,
        );

        assert!(sql_matches(&mut conn, &RuleExpr::All(vec![]), listing_id));
        assert!(!sql_matches(&mut conn, &RuleExpr::Any(vec![]), listing_id));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// For every rule R and listing L, `R.expr.matches(L)` equals
        /// evaluating the lowered SQL predicate against a store containing
        /// exactly L. Same for the combined has-open-issues form.
        #[test]
        fn prop_rules_agree_in_memory_and_in_sql(
            is_sell in any::<bool>(),
            status_idx in 0usize..3,
            has_description in any::<bool>(),
            has_price in any::<bool>(),
            visible_images in 0usize..3,
            hidden_images in 0usize..2,
        ) {
            let (_dir, pool) = test_pool();
            let mut conn = pool.get().unwrap();

            let listing_type = if is_sell { ListingType::Sell } else { ListingType::Buy };
            let status =
                [ListingStatus::Open, ListingStatus::Pending, ListingStatus::Closed][status_idx];
            let description = if has_description { "desc" } else { "" };
            let price = if has_price { "$5" } else { "" };

            let listing_id = insert_listing(
                &mut conn,
                listing_type,
                status,
                description,
                price,
                visible_images,
                hidden_images,
            );
            let listing = load_listing(&mut conn, listing_id).unwrap();

            for rule in issue_rules() {
                prop_assert_eq!(
                    rule.expr.matches(&listing),
                    sql_matches(&mut conn, &rule.expr, listing_id)
                );
            }

            let bulk = open_issues_expr();
            prop_assert_eq!(bulk.matches(&listing), sql_matches(&mut conn, &bulk, listing_id));
        }
    }
}
