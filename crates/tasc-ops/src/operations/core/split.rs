//! Partitioning a collection into groups.

use indexmap::IndexMap;
use tasc_model::{CORE_DOMAIN, Collection, Result};

use crate::args::{BoundArgs, Param, ParamKind};
use crate::registry::{OperationDef, OperationRegistry};

const SPLIT_BY_INTEGERS: &[Param] = &[Param::required("markers", ParamKind::Integers)];

/// Row positions per marker, in first-seen marker order.
pub(crate) fn partition(markers: &[i64]) -> IndexMap<i64, Vec<usize>> {
    let mut groups: IndexMap<i64, Vec<usize>> = IndexMap::new();
    for (position, &marker) in markers.iter().enumerate() {
        groups.entry(marker).or_default().push(position);
    }
    groups
}

/// One collection per distinct marker, holding every row with that
/// marker in original order. Each keeps the source domain and metadata.
pub(crate) fn split_rows(
    collection: &Collection,
    markers: &[i64],
    args: &BoundArgs,
) -> Result<Vec<Collection>> {
    if markers.len() != collection.len() {
        return Err(args.invalid(
            "markers",
            format!(
                "{} markers given for {} rows",
                markers.len(),
                collection.len()
            ),
        ));
    }
    partition(markers)
        .values()
        .map(|positions| collection.take_rows(positions))
        .collect()
}

fn split_by_integers(collection: Collection, args: &BoundArgs) -> Result<Vec<Collection>> {
    let markers = args.integers("markers").unwrap_or_default();
    split_rows(&collection, &markers, args)
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "split_by_integers",
        CORE_DOMAIN,
        OperationDef::group(SPLIT_BY_INTEGERS, split_by_integers),
        false,
    )
}
