//! Operations registered for the `core` domain and inherited by every
//! other domain.

pub mod combine;
pub mod interpolate;
pub mod math;
pub mod search;
pub mod select;
pub mod split;
pub mod stats;
pub mod transform;

use tasc_model::Result;

use crate::registry::OperationRegistry;

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    math::register(registry)?;
    transform::register(registry)?;
    stats::register(registry)?;
    select::register(registry)?;
    search::register(registry)?;
    split::register(registry)?;
    combine::register(registry)?;
    interpolate::register(registry)?;
    Ok(())
}
