//! SQLite storage implementation for Shopkeeper.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in
//! `shopkeeper-core` and contains:
//! - Database connection pooling and management
//! - Embedded Diesel migrations
//! - Repository implementations for listings and their event log
//! - Database-specific model types (with Diesel derives)
//! - The SQL lowering of the issue-rule expression trees
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel
//! dependencies exist. `core` is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod events;
pub mod listings;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from shopkeeper-core for convenience
pub use shopkeeper_core::errors::{DatabaseError, Error, Result};
