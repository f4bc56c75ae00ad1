#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod context;
pub mod entities;
pub mod evaluator;
pub mod events;
pub mod framework;
pub mod matcher;
pub mod processors;
pub mod sink;
pub mod store;

/// Migrations of the PostgreSQL event store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");
