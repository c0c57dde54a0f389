//! Shared utilities for tasc crates.
//!
//! This crate bridges polars `DataFrame`s, as produced by any loader, to
//! and from step-indexed collections.

pub mod polars;

pub use polars::{FrameOptions, any_to_f64, collection_from_frame, collection_to_frame, parse_f64};
