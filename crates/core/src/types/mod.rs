//! Core types for Lotkeeper.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod quantity;
pub mod status;

pub use id::*;
pub use quantity::{Quantity, QuantityError};
pub use status::UpsertOutcome;
