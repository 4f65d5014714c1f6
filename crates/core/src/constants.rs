/// Placeholder rendered in event text and change summaries when a recorded
/// value is empty, so diffs against nothing stay legible.
pub const EMPTY_VALUE_PLACEHOLDER: &str = "`(empty)`";

/// Default reminder sweep interval: 14 days.
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 60 * 60 * 24 * 14;
