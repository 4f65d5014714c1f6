//! Data-quality issue rules.
//!
//! Each rule is declared once as a boolean expression tree over listing
//! attributes. The tree has two interpreters: [`RuleExpr::matches`] runs
//! directly against an in-memory listing (single-record display, per-row
//! checks), and the storage layer lowers the same tree to a SQL predicate
//! (bulk search and the reminder sweep). A single declarative source is
//! what keeps the two answers identical.

use serde::{Deserialize, Serialize};

use crate::listings::{Listing, ListingStatus, ListingType};

/// Icon hint shown next to an issue in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueIcon {
    Image,
    Text,
    DollarSign,
}

/// Where the owner is expected to resolve an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionLocation {
    Ui,
    Discord,
}

/// User-facing description of a data-quality issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    pub title: String,
    pub description: String,
    pub icon: IssueIcon,
    pub resolution_location: ResolutionLocation,
}

/// Boolean expression over listing attributes.
///
/// `NoVisibleImages` counts only non-hidden images, matching the image set
/// carried on the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    /// Every clause matches.
    All(Vec<RuleExpr>),
    /// At least one clause matches.
    Any(Vec<RuleExpr>),
    TypeIs(ListingType),
    StatusIsNot(ListingStatus),
    PriceUnset,
    DescriptionUnset,
    NoVisibleImages,
}

impl RuleExpr {
    /// In-memory interpreter. The storage layer lowers the same tree to a
    /// SQL predicate; the two must agree for every listing.
    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            RuleExpr::All(parts) => parts.iter().all(|p| p.matches(listing)),
            RuleExpr::Any(parts) => parts.iter().any(|p| p.matches(listing)),
            RuleExpr::TypeIs(listing_type) => listing.listing_type == *listing_type,
            RuleExpr::StatusIsNot(status) => listing.status != *status,
            RuleExpr::PriceUnset => listing.price.is_empty(),
            RuleExpr::DescriptionUnset => listing.description.is_empty(),
            RuleExpr::NoVisibleImages => listing.images.is_empty(),
        }
    }
}

/// A named data-quality rule: what to tell the owner, and when it applies.
#[derive(Debug, Clone)]
pub struct IssueRule {
    pub details: IssueDetails,
    pub expr: RuleExpr,
}

/// The fixed, ordered rule set.
pub fn issue_rules() -> Vec<IssueRule> {
    vec![
        IssueRule {
            details: IssueDetails {
                title: "No images".to_string(),
                description: "Your listing has no images. Please send at least one photo \
                              of the item in your listing's thread."
                    .to_string(),
                icon: IssueIcon::Image,
                resolution_location: ResolutionLocation::Discord,
            },
            expr: RuleExpr::All(vec![
                RuleExpr::NoVisibleImages,
                RuleExpr::TypeIs(ListingType::Sell),
            ]),
        },
        IssueRule {
            details: IssueDetails {
                title: "No price".to_string(),
                description: "Your listing has no price.".to_string(),
                icon: IssueIcon::DollarSign,
                resolution_location: ResolutionLocation::Ui,
            },
            expr: RuleExpr::All(vec![
                RuleExpr::PriceUnset,
                RuleExpr::TypeIs(ListingType::Sell),
            ]),
        },
        IssueRule {
            details: IssueDetails {
                title: "No description".to_string(),
                description: "Your listing has no description.".to_string(),
                icon: IssueIcon::Text,
                resolution_location: ResolutionLocation::Ui,
            },
            expr: RuleExpr::DescriptionUnset,
        },
    ]
}

/// Issues currently open on a listing, in rule order.
///
/// Closed listings are issue-free regardless of their contents.
pub fn issues_for(listing: &Listing) -> Vec<IssueDetails> {
    if listing.status == ListingStatus::Closed {
        return Vec::new();
    }
    issue_rules()
        .into_iter()
        .filter(|rule| rule.expr.matches(listing))
        .map(|rule| rule.details)
        .collect()
}

/// True when [`issues_for`] would return at least one issue.
pub fn has_open_issues(listing: &Listing) -> bool {
    !issues_for(listing).is_empty()
}

/// Bulk form of "has at least one open issue": the OR of every rule,
/// excluding Closed listings. Shared by search and the reminder sweep.
pub fn open_issues_expr() -> RuleExpr {
    RuleExpr::All(vec![
        RuleExpr::Any(issue_rules().into_iter().map(|rule| rule.expr).collect()),
        RuleExpr::StatusIsNot(ListingStatus::Closed),
    ])
}
