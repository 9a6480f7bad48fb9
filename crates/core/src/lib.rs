//! Lotkeeper Core - Shared types library.
//!
//! This crate provides common types used across all Lotkeeper components:
//! - `server` - Inventory HTTP backend and report generation
//! - `cli` - Command-line tools for migrations, seeding and offline reports
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP handling. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, quantities, and upsert outcomes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
