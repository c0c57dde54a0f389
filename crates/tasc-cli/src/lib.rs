//! CLI library components for tasc.

pub mod commands;
pub mod logging;
