//! The collection aggregate: step index, named columns, metadata and domain.
//!
//! # Identity
//!
//! Every collection carries a [`CollectionId`]. Constructing or cloning a
//! collection yields a fresh id; mutating methods keep it. Operations that
//! honour an in-place request return the collection they were given, so the
//! id is how callers tell a new collection from a mutated one.
//!
//! # Example
//!
//! ```ignore
//! use tasc_model::{Collection, Column};
//!
//! let collection = Collection::new(
//!     vec![0.0, 1.0, 2.0],
//!     vec![Column::from_values("Force", vec![0.0, 1.0, 2.0]).with_unit("kN")],
//! )?;
//! assert_eq!(collection.column("Force")?.mean()?, Some(1.0));
//! ```

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;

use crate::column::{CellValue, Column};
use crate::domain::{CORE_DOMAIN, DomainState, Kwargs};
use crate::error::{Result, TascError};
use crate::index::StepIndex;
use crate::stats::Summary;

/// Free-form metadata attached to a collection.
pub type Metadata = IndexMap<String, Value>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a collection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(u64);

impl CollectionId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// The generic fields every domain variant is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionParts {
    pub index: StepIndex,
    pub columns: Vec<Column>,
    pub metadata: Metadata,
}

impl CollectionParts {
    pub fn new(index: impl Into<StepIndex>) -> Self {
        Self {
            index: index.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }
}

/// One row: its step and the cell of every column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub step: f64,
    pub values: IndexMap<String, CellValue>,
}

/// Step index, uniquely named columns in insertion order, metadata and a
/// domain tag with its optional domain state.
///
/// All columns have exactly as many values as the index has steps.
#[derive(Debug)]
pub struct Collection {
    id: CollectionId,
    index: StepIndex,
    columns: IndexMap<String, Column>,
    metadata: Metadata,
    domain: String,
    state: Option<Arc<dyn DomainState>>,
}

impl Collection {
    /// Generic collection from an index and columns.
    pub fn new(index: impl Into<StepIndex>, columns: Vec<Column>) -> Result<Self> {
        Self::from_parts(CollectionParts {
            index: index.into(),
            columns,
            metadata: Metadata::new(),
        })
    }

    /// Generic collection from its parts.
    pub fn from_parts(parts: CollectionParts) -> Result<Self> {
        Self::with_domain(parts, CORE_DOMAIN, None)
    }

    /// Collection tagged with `domain` and carrying `state`.
    ///
    /// Only a domain factory calls this, after the domain constructor has
    /// validated `state` against `parts`. Fails when `state` belongs to
    /// another domain.
    #[doc(hidden)]
    pub fn with_domain(
        parts: CollectionParts,
        domain: impl Into<String>,
        state: Option<Arc<dyn DomainState>>,
    ) -> Result<Self> {
        let domain = domain.into();
        if let Some(state) = &state {
            check_state_domain("with_domain", &domain, state.as_ref())?;
        }
        let CollectionParts {
            index,
            columns,
            metadata,
        } = parts;
        let columns = build_columns(&index, columns)?;
        Ok(Self {
            id: CollectionId::next(),
            index,
            columns,
            metadata,
            domain,
            state,
        })
    }

    pub fn empty() -> Self {
        Self {
            id: CollectionId::next(),
            index: StepIndex::default(),
            columns: IndexMap::new(),
            metadata: Metadata::new(),
            domain: CORE_DOMAIN.to_string(),
            state: None,
        }
    }

    /// Generic fields of this collection, sharing column storage.
    pub fn to_parts(&self) -> CollectionParts {
        CollectionParts {
            index: self.index.clone(),
            columns: self.columns.values().cloned().collect(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn into_parts(self) -> CollectionParts {
        CollectionParts {
            index: self.index,
            columns: self.columns.into_values().collect(),
            metadata: self.metadata,
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn index(&self) -> &StepIndex {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.values()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Column by name, or a column-not-found error.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| TascError::column_not_found(name))
    }

    /// First column whose channel id matches.
    pub fn column_by_channel(&self, channel: &str) -> Option<&Column> {
        self.columns.values().find(|c| c.channel() == Some(channel))
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn domain_state(&self) -> Option<&dyn DomainState> {
        self.state.as_deref()
    }

    /// Domain state downcast to its concrete type.
    pub fn domain_state_as<T: DomainState>(&self) -> Option<&T> {
        self.state.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Domain fields, empty for the generic collection.
    pub fn domain_fields(&self) -> Kwargs {
        self.state
            .as_ref()
            .map(|state| state.fields())
            .unwrap_or_default()
    }

    /// Replace the domain state while keeping the domain tag.
    ///
    /// For domain operations that update their own fields; the new state
    /// must belong to this collection's domain.
    #[doc(hidden)]
    pub fn replace_domain_state(&mut self, state: Arc<dyn DomainState>) -> Result<()> {
        check_state_domain("replace_domain_state", &self.domain, state.as_ref())?;
        self.state = Some(state);
        Ok(())
    }

    /// Drop the domain tag and state, leaving a generic collection.
    pub fn demote_to_core(&mut self) {
        self.domain = CORE_DOMAIN.to_string();
        self.state = None;
    }

    /// Row at `position`.
    pub fn row(&self, position: usize) -> Result<Row> {
        let step = self.index.get(position)?;
        let mut values = IndexMap::with_capacity(self.columns.len());
        for (name, column) in &self.columns {
            values.insert(name.clone(), column.get(position)?);
        }
        Ok(Row { step, values })
    }

    /// Add a new column; fails if the name is taken.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.columns.contains_key(column.name()) {
            return Err(TascError::DuplicateColumn {
                column: column.name().to_string(),
            });
        }
        self.set_column(column)
    }

    /// Create or overwrite a column, keeping its position when it exists.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        check_shape(&self.index, &column)?;
        self.columns.insert(column.name().to_string(), column);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        self.columns
            .shift_remove(name)
            .ok_or_else(|| TascError::column_not_found(name))
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return self.column(from).map(|_| ());
        }
        if self.columns.contains_key(to) {
            return Err(TascError::DuplicateColumn {
                column: to.to_string(),
            });
        }
        let position = self
            .columns
            .get_index_of(from)
            .ok_or_else(|| TascError::column_not_found(from))?;
        if let Some(column) = self.columns.shift_remove(from) {
            self.columns
                .shift_insert(position, to.to_string(), column.renamed(to));
        }
        Ok(())
    }

    /// Keep only `names`, in that order.
    pub fn retain_columns(&mut self, names: &[String]) -> Result<()> {
        let mut kept = IndexMap::with_capacity(names.len());
        for name in names {
            let column = self.column(name)?.clone();
            kept.insert(name.clone(), column);
        }
        self.columns = kept;
        Ok(())
    }

    /// Keep only the rows at `positions`, in that order.
    pub fn retain_rows(&mut self, positions: &[usize]) -> Result<()> {
        let len = self.len();
        if let Some(&position) = positions.iter().find(|&&p| p >= len) {
            return Err(TascError::IndexOutOfRange { position, len });
        }
        self.index = self.index.take(positions);
        for column in self.columns.values_mut() {
            *column = column.take(positions);
        }
        Ok(())
    }

    /// Replace the index and all columns at once, keeping metadata and domain.
    pub fn rebuild(&mut self, index: StepIndex, columns: Vec<Column>) -> Result<()> {
        self.columns = build_columns(&index, columns)?;
        self.index = index;
        Ok(())
    }

    /// New collection over the rows at `positions`.
    pub fn take_rows(&self, positions: &[usize]) -> Result<Self> {
        let mut taken = self.clone();
        taken.retain_rows(positions)?;
        Ok(taken)
    }

    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.end > self.len() || range.start > range.end {
            return Err(TascError::IndexOutOfRange {
                position: range.end,
                len: self.len(),
            });
        }
        self.take_rows(&range.collect::<Vec<_>>())
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Result<Self> {
        self.check_row_count("head", n)?;
        self.slice(0..n)
    }

    /// Last `n` rows.
    pub fn tail(&self, n: usize) -> Result<Self> {
        self.check_row_count("tail", n)?;
        self.slice(self.len() - n..self.len())
    }

    /// Summary statistics of every numeric column, in column order.
    pub fn describe(&self) -> IndexMap<String, Summary> {
        self.columns
            .iter()
            .filter_map(|(name, column)| Some((name.clone(), column.summary().ok()?)))
            .collect()
    }

    /// True when index and every column share storage with `other`.
    pub fn shares_storage(&self, other: &Collection) -> bool {
        self.index.shares_storage(&other.index)
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|(name, c)| other.columns.get(name).is_some_and(|o| c.shares_storage(o)))
    }

    fn check_row_count(&self, operation: &str, n: usize) -> Result<()> {
        if n > self.len() {
            return Err(TascError::invalid_argument(
                operation,
                "n",
                format!("{n} exceeds the row count {}", self.len()),
            ));
        }
        Ok(())
    }
}

impl Clone for Collection {
    /// Copy with a fresh identity; column storage is shared copy-on-write.
    fn clone(&self) -> Self {
        Self {
            id: CollectionId::next(),
            index: self.index.clone(),
            columns: self.columns.clone(),
            metadata: self.metadata.clone(),
            domain: self.domain.clone(),
            state: self.state.clone(),
        }
    }
}

impl PartialEq for Collection {
    /// Structural equality; identity is ignored, column order matters.
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.index == other.index
            && self.columns.iter().eq(other.columns.iter())
            && self.metadata == other.metadata
            && self.domain_fields() == other.domain_fields()
    }
}

fn check_state_domain(operation: &str, domain: &str, state: &dyn DomainState) -> Result<()> {
    if domain == CORE_DOMAIN || state.domain() != domain {
        return Err(TascError::invalid_argument(
            operation,
            "state",
            format!(
                "state of domain '{}' cannot be attached to a '{domain}' collection",
                state.domain()
            ),
        ));
    }
    Ok(())
}

fn check_shape(index: &StepIndex, column: &Column) -> Result<()> {
    if column.len() != index.len() {
        return Err(TascError::Shape {
            column: column.name().to_string(),
            expected: index.len(),
            actual: column.len(),
        });
    }
    Ok(())
}

fn build_columns(index: &StepIndex, columns: Vec<Column>) -> Result<IndexMap<String, Column>> {
    let mut map = IndexMap::with_capacity(columns.len());
    for column in columns {
        check_shape(index, &column)?;
        let name = column.name().to_string();
        if map.contains_key(&name) {
            return Err(TascError::DuplicateColumn { column: name });
        }
        map.insert(name, column);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Collection {
        Collection::new(
            vec![10.0, 20.0, 30.0],
            vec![
                Column::from_values("A", vec![1.0, 2.0, 3.0]).with_channel("CH1"),
                Column::text("Note", vec![Some("x".into()), None, Some("z".into())]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn clone_gets_fresh_identity() {
        let collection = sample();
        let copy = collection.clone();
        assert_ne!(collection.id(), copy.id());
        assert_eq!(collection, copy);
        assert!(collection.shares_storage(&copy));
    }

    #[test]
    fn rename_keeps_position() {
        let mut collection = sample();
        collection.rename_column("A", "B").unwrap();
        let names: Vec<_> = collection.column_names().collect();
        assert_eq!(names, vec!["B", "Note"]);
        assert_eq!(collection.column("B").unwrap().name(), "B");
    }

    #[test]
    fn head_rejects_oversized_request() {
        let collection = sample();
        assert_eq!(collection.head(2).unwrap().len(), 2);
        assert!(matches!(
            collection.head(4),
            Err(TascError::InvalidArgument { .. })
        ));
    }

    #[derive(Debug)]
    struct Tagged;

    impl DomainState for Tagged {
        fn domain(&self) -> &str {
            "tagged"
        }

        fn fields(&self) -> Kwargs {
            Kwargs::new()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn state_must_match_the_domain_tag() {
        let parts = sample().into_parts();
        assert!(Collection::with_domain(parts.clone(), "tagged", Some(Arc::new(Tagged))).is_ok());
        assert!(matches!(
            Collection::with_domain(parts.clone(), "other", Some(Arc::new(Tagged))),
            Err(TascError::InvalidArgument { parameter, .. }) if parameter == "state"
        ));

        let mut generic = sample();
        assert!(generic.replace_domain_state(Arc::new(Tagged)).is_err());
        assert_eq!(generic.domain(), CORE_DOMAIN);
        assert!(generic.domain_state().is_none());

        let mut tagged = Collection::with_domain(parts, "tagged", Some(Arc::new(Tagged))).unwrap();
        let id = tagged.id();
        tagged.replace_domain_state(Arc::new(Tagged)).unwrap();
        tagged.demote_to_core();
        assert_eq!(tagged.domain(), CORE_DOMAIN);
        assert!(tagged.domain_state().is_none());
        assert_eq!(tagged.id(), id);
    }

    #[test]
    fn channel_lookup() {
        let collection = sample();
        assert_eq!(collection.column_by_channel("CH1").unwrap().name(), "A");
        assert!(collection.column_by_channel("CH9").is_none());
    }
}
