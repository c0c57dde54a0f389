//! Domain specialization for tasc collections.
//!
//! # Architecture
//!
//! - [`factory`]: the [`DomainFactory`] registry of constructors and
//!   `(source, target)` converters.
//! - [`load_displacement`]: collections with designated load and
//!   displacement columns.
//! - [`coordinate`]: collections whose columns carry spatial positions.

pub mod coordinate;
pub mod factory;
pub mod load_displacement;

pub use coordinate::{COORDINATE_DOMAIN, CoordinateState, Coordinates};
pub use factory::{
    Converter, DomainConstructor, DomainFactory, DomainInfo, optional_str, required_str,
};
pub use load_displacement::{LOAD_DISPLACEMENT_DOMAIN, LoadDisplacement};

use tasc_model::Result;

/// Register the built-in domains and their converters.
pub fn register_builtin_domains(factory: &mut DomainFactory) -> Result<()> {
    load_displacement::register(factory)?;
    coordinate::register(factory)?;
    Ok(())
}
