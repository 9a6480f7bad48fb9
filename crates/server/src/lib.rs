//! Lotkeeper inventory server library.
//!
//! Batches of a product are identified by `(code, lot)`. Registering a
//! batch that already exists adds to its quantity instead of creating a
//! duplicate. The library exposes the router and storage backends so the
//! binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod routes;
pub mod state;
