//! Fluent chain over an ordered list of collections.

use std::ops::{Bound, RangeBounds};

use indexmap::IndexMap;
use tasc_model::{
    CORE_DOMAIN, Collection, CollectionParts, Column, ColumnValues, Kwargs, Result, StepIndex,
    TascError, ValueKind,
};

use crate::args::Args;
use crate::chain::ChainContext;
use crate::engine::Engine;

/// Wraps collections produced by a split. Each element keeps its own
/// domain tag and is dispatched on it.
pub struct GroupContext<'e> {
    engine: &'e Engine,
    collections: Vec<Collection>,
}

impl<'e> GroupContext<'e> {
    pub fn new(engine: &'e Engine, collections: Vec<Collection>) -> Self {
        Self {
            engine,
            collections,
        }
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> + '_ {
        self.collections.iter()
    }

    /// Collection at `position`.
    pub fn get(&self, position: usize) -> Result<&Collection> {
        self.collections
            .get(position)
            .ok_or(TascError::IndexOutOfRange {
                position,
                len: self.collections.len(),
            })
    }

    /// Single-collection chain over the element at `position`.
    pub fn nth(mut self, position: usize) -> Result<ChainContext<'e>> {
        if position >= self.collections.len() {
            return Err(TascError::IndexOutOfRange {
                position,
                len: self.collections.len(),
            });
        }
        let collection = self.collections.swap_remove(position);
        Ok(ChainContext::new(self.engine, collection))
    }

    /// New group over a sub-range, order preserved.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Self> {
        let len = self.collections.len();
        let out_of_range = |position: usize| TascError::IndexOutOfRange { position, len };
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.checked_add(1).ok_or_else(|| out_of_range(start))?,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.checked_add(1).ok_or_else(|| out_of_range(end))?,
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        if start > end || end > len {
            return Err(out_of_range(end));
        }
        Ok(Self::new(self.engine, self.collections[start..end].to_vec()))
    }

    /// Apply an operation to every element, in order.
    pub fn map(self, name: &str, args: &Args) -> Result<Self> {
        let collections = self
            .collections
            .into_iter()
            .map(|collection| self.engine.call(collection, name, args))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(self.engine, collections))
    }

    /// Keep the elements for which `predicate` holds.
    #[must_use]
    pub fn filter<P>(self, mut predicate: P) -> Self
    where
        P: FnMut(&Collection) -> bool,
    {
        let collections = self
            .collections
            .into_iter()
            .filter(|collection| predicate(collection))
            .collect();
        Self::new(self.engine, collections)
    }

    /// Convert every element into `target`.
    pub fn as_domain(self, target: &str, kwargs: &Kwargs) -> Result<Self> {
        let collections = self
            .collections
            .into_iter()
            .map(|collection| self.engine.as_domain(collection, target, kwargs.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(self.engine, collections))
    }

    /// Join all elements row-wise.
    ///
    /// Columns are the union in first-seen order; cells of columns an
    /// element lacks are null. The result takes the domain and metadata of
    /// the first element.
    pub fn concat(self) -> Result<ChainContext<'e>> {
        let Some(first) = self.collections.first() else {
            return Ok(ChainContext::new(self.engine, Collection::empty()));
        };
        let domain = first.domain().to_string();
        let fields = first.domain_fields();
        let metadata = first.metadata().clone();

        let mut layout: IndexMap<String, (ValueKind, Option<String>, Option<String>)> =
            IndexMap::new();
        for collection in &self.collections {
            for column in collection.columns() {
                let (kind, _, _) = layout.entry(column.name().to_string()).or_insert((
                    column.kind(),
                    column.channel().map(str::to_string),
                    column.unit().map(str::to_string),
                ));
                if *kind != column.kind() {
                    return Err(TascError::ColumnType {
                        column: column.name().to_string(),
                    });
                }
            }
        }

        let steps: StepIndex = self
            .collections
            .iter()
            .flat_map(|c| c.index().iter())
            .collect();
        let mut columns = Vec::with_capacity(layout.len());
        for (name, (kind, channel, unit)) in layout {
            let values = match kind {
                ValueKind::Number => ColumnValues::Number(
                    self.collections
                        .iter()
                        .flat_map(|c| match c.get_column(&name).and_then(Column::as_numbers) {
                            Some(values) => values.to_vec(),
                            None => vec![None; c.len()],
                        })
                        .collect::<Vec<_>>()
                        .into(),
                ),
                ValueKind::Text => ColumnValues::Text(
                    self.collections
                        .iter()
                        .flat_map(|c| match c.get_column(&name).and_then(Column::as_texts) {
                            Some(values) => values.to_vec(),
                            None => vec![None; c.len()],
                        })
                        .collect::<Vec<_>>()
                        .into(),
                ),
            };
            let mut column = Column::new(name, values).with_optional_unit(unit);
            if let Some(channel) = channel {
                column = column.with_channel(channel);
            }
            columns.push(column);
        }

        let parts = CollectionParts {
            index: steps,
            columns,
            metadata,
        };
        let joined = if domain == CORE_DOMAIN {
            Collection::from_parts(parts)?
        } else {
            self.engine.domains().create(&domain, parts, &fields)?
        };
        Ok(ChainContext::new(self.engine, joined))
    }

    /// Unwrap all collections.
    pub fn end(self) -> Vec<Collection> {
        self.collections
    }
}
