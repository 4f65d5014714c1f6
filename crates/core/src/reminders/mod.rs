//! Periodic reminder sweep over listings with open issues.

mod reminders_service;

pub use reminders_service::{
    default_reminder_interval, spawn_reminder_scheduler, ReminderService, ReminderSweepSummary,
};
