//! Operations over tasc collections.
//!
//! # Architecture
//!
//! - [`args`]: parameter declarations and argument binding.
//! - [`registry`]: the `(domain, name)` keyed [`OperationRegistry`] with its
//!   single-hop fallback to core.
//! - [`engine`]: a domain factory plus a registry; the entry point for
//!   chains.
//! - [`chain`] and [`group`]: fluent contexts over one collection or an
//!   ordered list of them.
//! - [`manifest`]: the versioned description of every registered operation.
//! - [`operations`]: built-in operations of the core, load/displacement and
//!   coordinate domains.

pub mod args;
pub mod chain;
pub mod engine;
pub mod group;
pub mod manifest;
pub mod operations;
pub mod registry;

pub use args::{Args, BoundArgs, IN_PLACE, Operand, Param, ParamDefault, ParamKind, bind};
pub use chain::ChainContext;
pub use engine::Engine;
pub use group::GroupContext;
pub use manifest::{
    COMMITTED_MANIFEST, MANIFEST_VERSION, ManifestEntry, OperationManifest, ParamSpec,
};
pub use operations::register_builtin_operations;
pub use registry::{
    AS_DOMAIN, OperationDef, OperationRegistry, Outcome, OutputKind, RegisteredOperation,
};
