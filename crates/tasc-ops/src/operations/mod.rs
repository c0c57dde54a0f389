//! Built-in operations.
//!
//! Registration order is fixed: core operations first, then the
//! load-displacement and coordinate domains. The committed manifest
//! mirrors this order.

pub mod coordinate;
pub mod core;
pub mod load_displacement;
pub(crate) mod support;

use tasc_model::Result;

use crate::registry::OperationRegistry;

/// Register every built-in operation into `registry`.
pub fn register_builtin_operations(registry: &mut OperationRegistry) -> Result<()> {
    self::core::register(registry)?;
    self::load_displacement::register(registry)?;
    self::coordinate::register(registry)?;
    Ok(())
}
