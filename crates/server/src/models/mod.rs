//! Domain models for the inventory backend.

pub mod batch;

pub use batch::{
    Batch, BatchPatch, BatchPatchRequest, BatchRequest, CodeSummary, InputError, NewBatch,
    QuantityField, Upserted,
};
