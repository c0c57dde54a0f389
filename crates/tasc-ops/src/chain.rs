//! Fluent chain over a single collection.

use serde_json::Value;
use tasc_model::{Collection, Kwargs, Result};
use tracing::info;

use crate::args::Args;
use crate::engine::Engine;
use crate::group::GroupContext;

/// Wraps one collection; every call yields a new context.
///
/// The active domain is the wrapped collection's domain tag, so after
/// `as_domain` dispatch follows the new domain.
///
/// # Example
///
/// ```ignore
/// let result = engine
///     .chain(collection)
///     .call("add", &Args::new().arg("A").arg(10).kwarg("result_column", "B"))?
///     .as_domain("load_displacement", kwargs)?
///     .call("cycle_count", &Args::new())?
///     .end();
/// ```
pub struct ChainContext<'e> {
    engine: &'e Engine,
    collection: Collection,
}

impl std::fmt::Debug for ChainContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainContext")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<'e> ChainContext<'e> {
    pub fn new(engine: &'e Engine, collection: Collection) -> Self {
        Self { engine, collection }
    }

    /// Active domain tag.
    pub fn domain(&self) -> &str {
        self.collection.domain()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Apply a collection-producing operation (or `as_domain`).
    pub fn call(self, name: &str, args: &Args) -> Result<Self> {
        let collection = self.engine.call(self.collection, name, args)?;
        Ok(Self::new(self.engine, collection))
    }

    pub fn as_domain(self, target: &str, kwargs: Kwargs) -> Result<Self> {
        let collection = self.engine.as_domain(self.collection, target, kwargs)?;
        Ok(Self::new(self.engine, collection))
    }

    /// Apply a group-producing operation.
    pub fn split(self, name: &str, args: &Args) -> Result<GroupContext<'e>> {
        let collections = self
            .engine
            .operations()
            .invoke_group(self.collection, name, args)?;
        Ok(GroupContext::new(self.engine, collections))
    }

    /// Partition rows by `markers`, one group per distinct marker.
    pub fn split_by_integers(self, markers: &[i64]) -> Result<GroupContext<'e>> {
        self.split("split_by_integers", &Args::new().arg(markers.to_vec()))
    }

    /// Evaluate a value-producing operation without ending the chain.
    pub fn value(&self, name: &str, args: &Args) -> Result<Value> {
        self.engine
            .operations()
            .invoke_value(&self.collection, name, args)
    }

    /// Apply a caller-supplied transformation.
    pub fn pipe<F>(self, func: F) -> Result<Self>
    where
        F: FnOnce(Collection) -> Result<Collection>,
    {
        let collection = func(self.collection)?;
        Ok(Self::new(self.engine, collection))
    }

    /// Look at the collection without changing it.
    #[must_use]
    pub fn inspect<F>(self, func: F) -> Self
    where
        F: FnOnce(&Collection),
    {
        func(&self.collection);
        self
    }

    /// Log the collection shape with `message`.
    #[must_use]
    pub fn debug(self, message: &str) -> Self {
        info!(
            domain = self.collection.domain(),
            rows = self.collection.len(),
            columns = self.collection.column_count(),
            "{message}"
        );
        self
    }

    /// Unwrap the collection.
    pub fn end(self) -> Collection {
        self.collection
    }
}
