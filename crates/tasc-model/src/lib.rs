//! Step-indexed column model.
//!
//! A [`Collection`] holds a [`StepIndex`], uniquely named [`Column`]s in
//! insertion order, free-form metadata and a domain tag. Domain variants add
//! a [`DomainState`] built by a domain factory.

pub mod collection;
pub mod column;
pub mod domain;
pub mod error;
pub mod index;
pub mod stats;

pub use collection::{Collection, CollectionId, CollectionParts, Metadata, Row};
pub use column::{CellValue, Column, ColumnValues, ValueKind};
pub use domain::{CORE_DOMAIN, DomainState, Kwargs};
pub use error::{Result, TascError};
pub use index::StepIndex;
pub use stats::Summary;
