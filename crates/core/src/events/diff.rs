//! Human-readable change summaries.

use similar::TextDiff;

use crate::constants::EMPTY_VALUE_PLACEHOLDER;
use crate::listings::{FieldChange, ListingField};

/// Inline display form of a value in a change summary line.
fn display_value(value: &str) -> &str {
    if value.is_empty() {
        EMPTY_VALUE_PLACEHOLDER
    } else {
        value
    }
}

/// Line-based unified diff between two description values, so
/// multi-paragraph edits show minimal, readable deltas.
pub fn unified_description_diff(old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header("Old description", "New description")
        .to_string()
}

/// One summary line (or block) per changed field, used for the aggregate
/// edit notification.
pub fn describe_change(change: &FieldChange) -> String {
    match change.field {
        ListingField::Title => format!(
            "Title changed from {} to {}",
            change.from_value, change.to_value
        ),
        ListingField::Description => format!(
            "Description changed:\n```diff\n{}```",
            unified_description_diff(&change.from_value, &change.to_value)
        ),
        ListingField::Price => format!(
            "Price changed from {} to {}",
            display_value(&change.from_value),
            display_value(&change.to_value)
        ),
        ListingField::Status => format!(
            "Status changed from {} to {}",
            change.from_value, change.to_value
        ),
    }
}
