//! Operation registry keyed by `(domain, operation name)`.
//!
//! # Dispatch
//!
//! [`OperationRegistry::resolve`] looks up `(domain, name)` and, for any
//! domain other than `core`, falls back once to `("core", name)`. Nothing
//! beyond that single hop is consulted.
//!
//! # Example
//!
//! ```ignore
//! use tasc_ops::{OperationDef, OperationRegistry, Param, ParamKind};
//!
//! let mut registry = OperationRegistry::new();
//! registry.register(
//!     "double",
//!     "core",
//!     OperationDef::collection(&[Param::required("column", ParamKind::Column)], double),
//!     false,
//! )?;
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasc_model::{CORE_DOMAIN, Collection, Result, TascError};
use tracing::{debug, trace};

use crate::args::{Args, BoundArgs, Param, bind};
use crate::manifest::{MANIFEST_VERSION, ManifestEntry, OperationManifest, ParamSpec};

/// Pseudo-operation handled by the chain itself.
pub const AS_DOMAIN: &str = "as_domain";

/// What an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A collection; the chain continues.
    Collection,
    /// An ordered list of collections.
    Group,
    /// A JSON value; the chain does not continue through it.
    Value,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Collection => "collection",
            OutputKind::Group => "group",
            OutputKind::Value => "value",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CollectionFn = dyn Fn(Collection, &BoundArgs) -> Result<Collection> + Send + Sync;
type GroupFn = dyn Fn(Collection, &BoundArgs) -> Result<Vec<Collection>> + Send + Sync;
type ValueFn = dyn Fn(&Collection, &BoundArgs) -> Result<Value> + Send + Sync;

#[derive(Clone)]
enum Handler {
    Collection(Arc<CollectionFn>),
    Group(Arc<GroupFn>),
    Value(Arc<ValueFn>),
}

/// Result of running an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Collection(Collection),
    Group(Vec<Collection>),
    Value(Value),
}

impl Outcome {
    pub fn kind(&self) -> OutputKind {
        match self {
            Outcome::Collection(_) => OutputKind::Collection,
            Outcome::Group(_) => OutputKind::Group,
            Outcome::Value(_) => OutputKind::Value,
        }
    }
}

/// Declared parameters plus the function implementing an operation.
///
/// Collection and group operations receive the collection they work on by
/// value: the input itself when `in_place` was requested, a copy otherwise.
/// They mutate it freely and return it (or collections derived from it).
#[derive(Clone)]
pub struct OperationDef {
    params: Vec<Param>,
    handler: Handler,
}

impl OperationDef {
    pub fn collection<F>(params: &[Param], func: F) -> Self
    where
        F: Fn(Collection, &BoundArgs) -> Result<Collection> + Send + Sync + 'static,
    {
        Self {
            params: params.to_vec(),
            handler: Handler::Collection(Arc::new(func)),
        }
    }

    pub fn group<F>(params: &[Param], func: F) -> Self
    where
        F: Fn(Collection, &BoundArgs) -> Result<Vec<Collection>> + Send + Sync + 'static,
    {
        Self {
            params: params.to_vec(),
            handler: Handler::Group(Arc::new(func)),
        }
    }

    pub fn value<F>(params: &[Param], func: F) -> Self
    where
        F: Fn(&Collection, &BoundArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            params: params.to_vec(),
            handler: Handler::Value(Arc::new(func)),
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn output(&self) -> OutputKind {
        match self.handler {
            Handler::Collection(_) => OutputKind::Collection,
            Handler::Group(_) => OutputKind::Group,
            Handler::Value(_) => OutputKind::Value,
        }
    }
}

/// An operation stored in the registry.
pub struct RegisteredOperation {
    domain: String,
    name: String,
    def: OperationDef,
}

impl RegisteredOperation {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        self.def.params()
    }

    pub fn output(&self) -> OutputKind {
        self.def.output()
    }

    /// `name(param: kind = default, ...) -> output`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params().iter().map(ToString::to_string).collect();
        format!("{}({}) -> {}", self.name, params.join(", "), self.output())
    }

    fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            domain: self.domain.clone(),
            name: self.name.clone(),
            params: self
                .params()
                .iter()
                .map(|p| ParamSpec {
                    name: p.name.to_string(),
                    kind: p.kind,
                    has_default: p.has_default(),
                })
                .collect(),
            output: self.output(),
        }
    }
}

/// Table of operations keyed by `(domain, name)`, in registration order.
#[derive(Default)]
pub struct OperationRegistry {
    entries: IndexMap<(String, String), RegisteredOperation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in operation.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        crate::operations::register_builtin_operations(&mut registry)?;
        Ok(registry)
    }

    /// Store `def` under `(domain, name)`.
    ///
    /// Overriding keeps the original registration position.
    ///
    /// # Errors
    ///
    /// [`TascError::OperationConflict`] when the key exists and
    /// `allow_override` is false; [`TascError::ReservedOperation`] for
    /// `as_domain`.
    pub fn register(
        &mut self,
        name: &str,
        domain: &str,
        def: OperationDef,
        allow_override: bool,
    ) -> Result<()> {
        if name == AS_DOMAIN {
            return Err(TascError::ReservedOperation {
                operation: name.to_string(),
            });
        }
        let key = (domain.to_string(), name.to_string());
        if self.entries.contains_key(&key) && !allow_override {
            return Err(TascError::OperationConflict {
                domain: domain.to_string(),
                operation: name.to_string(),
            });
        }
        trace!(domain, operation = name, output = %def.output(), "registering operation");
        self.entries.insert(
            key,
            RegisteredOperation {
                domain: domain.to_string(),
                name: name.to_string(),
                def,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup without fallback.
    pub fn get(&self, domain: &str, name: &str) -> Option<&RegisteredOperation> {
        self.entries.get(&(domain.to_string(), name.to_string()))
    }

    /// All operations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredOperation> + '_ {
        self.entries.values()
    }

    /// Operations callable from `domain`: its own, then inherited core ones
    /// it does not shadow.
    pub fn available(&self, domain: &str) -> Vec<&RegisteredOperation> {
        let mut available: Vec<&RegisteredOperation> =
            self.iter().filter(|op| op.domain == domain).collect();
        if domain != CORE_DOMAIN {
            available.extend(
                self.iter()
                    .filter(|op| op.domain == CORE_DOMAIN && self.get(domain, &op.name).is_none()),
            );
        }
        available
    }

    /// Resolve `name` for `domain` with a single fallback to core.
    ///
    /// # Errors
    ///
    /// [`TascError::DomainMismatch`] when only other domains provide the
    /// operation, [`TascError::UnknownOperation`] otherwise.
    pub fn resolve(&self, domain: &str, name: &str) -> Result<&RegisteredOperation> {
        if let Some(op) = self.get(domain, name) {
            return Ok(op);
        }
        if domain != CORE_DOMAIN
            && let Some(op) = self.get(CORE_DOMAIN, name)
        {
            return Ok(op);
        }
        let available: Vec<String> = self
            .iter()
            .filter(|op| op.name == name)
            .map(|op| op.domain.clone())
            .collect();
        if available.is_empty() {
            Err(TascError::UnknownOperation {
                operation: name.to_string(),
                domain: domain.to_string(),
            })
        } else {
            Err(TascError::DomainMismatch {
                operation: name.to_string(),
                domain: domain.to_string(),
                available,
            })
        }
    }

    /// Run `name` on `collection`, whatever its output kind.
    pub fn invoke(&self, collection: Collection, name: &str, args: &Args) -> Result<Outcome> {
        let op = self.resolve(collection.domain(), name)?;
        let bound = bind(name, op.params(), args)?;
        debug!(
            operation = name,
            domain = collection.domain(),
            resolved = op.domain(),
            in_place = bound.in_place(),
            "dispatching operation"
        );
        match &op.def.handler {
            Handler::Collection(func) => {
                func(target(collection, &bound), &bound).map(Outcome::Collection)
            }
            Handler::Group(func) => func(target(collection, &bound), &bound).map(Outcome::Group),
            Handler::Value(func) => func(&collection, &bound).map(Outcome::Value),
        }
    }

    /// Run a collection-producing operation.
    pub fn invoke_collection(
        &self,
        collection: Collection,
        name: &str,
        args: &Args,
    ) -> Result<Collection> {
        self.expect_output(collection.domain(), name, OutputKind::Collection)?;
        match self.invoke(collection, name, args)? {
            Outcome::Collection(collection) => Ok(collection),
            other => Err(unexpected(name, OutputKind::Collection, other.kind())),
        }
    }

    /// Run a group-producing operation.
    pub fn invoke_group(
        &self,
        collection: Collection,
        name: &str,
        args: &Args,
    ) -> Result<Vec<Collection>> {
        self.expect_output(collection.domain(), name, OutputKind::Group)?;
        match self.invoke(collection, name, args)? {
            Outcome::Group(collections) => Ok(collections),
            other => Err(unexpected(name, OutputKind::Group, other.kind())),
        }
    }

    /// Run a value-producing operation; the collection is only read.
    pub fn invoke_value(&self, collection: &Collection, name: &str, args: &Args) -> Result<Value> {
        let op = self.expect_output(collection.domain(), name, OutputKind::Value)?;
        let bound = bind(name, op.params(), args)?;
        debug!(operation = name, domain = collection.domain(), "evaluating operation");
        match &op.def.handler {
            Handler::Value(func) => func(collection, &bound),
            _ => Err(unexpected(name, OutputKind::Value, op.output())),
        }
    }

    /// Versioned manifest of every registered operation.
    pub fn manifest(&self) -> OperationManifest {
        OperationManifest {
            version: MANIFEST_VERSION,
            operations: self.iter().map(RegisteredOperation::manifest_entry).collect(),
        }
    }

    fn expect_output(
        &self,
        domain: &str,
        name: &str,
        expected: OutputKind,
    ) -> Result<&RegisteredOperation> {
        let op = self.resolve(domain, name)?;
        if op.output() != expected {
            return Err(unexpected(name, expected, op.output()));
        }
        Ok(op)
    }
}

/// The collection an operation works on: the input itself for in-place
/// calls, a fresh copy otherwise.
fn target(collection: Collection, bound: &BoundArgs) -> Collection {
    if bound.in_place() {
        collection
    } else {
        collection.clone()
    }
}

fn unexpected(name: &str, expected: OutputKind, actual: OutputKind) -> TascError {
    TascError::UnexpectedOutput {
        operation: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
