//! Skeleton and cumulative curves of cyclic load/displacement data.
//!
//! Both operations trace a curve whose length differs from the source rows,
//! so the result replaces the rows with the curve points and designates the
//! curve columns as the new load and displacement columns.

use serde_json::Value;
use tasc_domain::{LOAD_DISPLACEMENT_DOMAIN, LoadDisplacement, load_displacement};
use tasc_model::{Collection, Column, Kwargs, Result, StepIndex};
use tracing::debug;

use crate::args::{BoundArgs, Param, ParamDefault, ParamKind};
use crate::operations::core::split::partition;
use crate::operations::load_displacement::cycles::cycle_markers;
use crate::operations::support::{numbers, unit_of};
use crate::registry::{OperationDef, OperationRegistry};

const CREATE_SKELETON_CURVE: &[Param] = &[
    Param::with_default("has_decrease", ParamKind::Bool, ParamDefault::Bool(false)),
    Param::with_default(
        "decrease_type",
        ParamKind::Text,
        ParamDefault::Text("envelope"),
    ),
    Param::optional("cycle_column", ParamKind::Column),
    Param::optional("result_load_column", ParamKind::Column),
    Param::optional("result_disp_column", ParamKind::Column),
];

const CREATE_CUMULATIVE_CURVE: &[Param] = &[
    Param::optional("cycle_column", ParamKind::Column),
    Param::optional("result_load_column", ParamKind::Column),
    Param::optional("result_disp_column", ParamKind::Column),
];

/// How the skeleton curve continues after the cycle of peak load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decrease {
    /// The point of largest displacement of each cycle.
    Envelope,
    /// The points between peak load and largest displacement of each cycle.
    ContinuousOnly,
    /// As `ContinuousOnly`, or the single point when both peaks coincide.
    Both,
}

impl Decrease {
    fn parse(args: &BoundArgs) -> Result<Self> {
        match args.str("decrease_type")? {
            "envelope" => Ok(Self::Envelope),
            "continuous_only" => Ok(Self::ContinuousOnly),
            "both" => Ok(Self::Both),
            other => Err(args.invalid(
                "decrease_type",
                format!(
                    "unknown decrease type {other:?}; \
                     expected envelope, continuous_only or both"
                ),
            )),
        }
    }
}

/// Side of a point run to extrapolate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Displacement at which the line through the two points at `edge` reaches
/// `load`. A single point, or two points of equal load, give the displacement
/// of the first of them.
fn displacement_at(points: &[(f64, f64)], load: f64, edge: Edge) -> Option<f64> {
    let ((d1, l1), (d2, l2)) = match (edge, points) {
        (_, []) => return None,
        (_, [only]) => return Some(only.0),
        (Edge::Start, [first, second, ..]) => (*first, *second),
        (Edge::End, [.., second_last, last]) => (*second_last, *last),
    };
    if l1 == l2 {
        return Some(d1);
    }
    Some(d1 + (d2 - d1) * (load - l1) / (l2 - l1))
}

/// Position of the first largest `key`.
fn first_max<T>(items: &[T], key: impl Fn(&T) -> Option<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, item) in items.iter().enumerate() {
        if let Some(value) = key(item)
            && best.is_none_or(|(_, top)| value > top)
        {
            best = Some((position, value));
        }
    }
    best.map(|(position, _)| position)
}

/// `(displacement, load)` points in drawing order.
#[derive(Debug, Default)]
struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    fn push(&mut self, point: (f64, f64)) {
        self.points.push(point);
    }

    /// Push unless `point` repeats the last one.
    fn push_distinct(&mut self, point: (f64, f64)) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }
}

/// Source of a curve: the load/displacement pairs with their cycle markers.
struct CycleData {
    collection: Collection,
    load_column: String,
    displacement_column: String,
    /// `(displacement, load)` per row, `None` where either is null.
    points: Vec<Option<(f64, f64)>>,
    markers: Vec<i64>,
}

impl CycleData {
    fn read(collection: Collection, args: &BoundArgs) -> Result<Self> {
        let state = LoadDisplacement::of(&collection)?;
        let load_column = state.load_column().to_string();
        let displacement_column = state.displacement_column().to_string();
        let (collection, markers) = cycle_markers(collection, args)?;
        let points = numbers(&collection, &displacement_column)?
            .iter()
            .zip(numbers(&collection, &load_column)?)
            .map(|pair| match pair {
                (Some(d), Some(l)) => Some((*d, *l)),
                _ => None,
            })
            .collect();
        Ok(Self {
            collection,
            load_column,
            displacement_column,
            points,
            markers,
        })
    }

    /// Valid points of the given rows, in row order.
    fn points_of(&self, rows: &[usize]) -> Vec<(f64, f64)> {
        rows.iter().filter_map(|&row| self.points[row]).collect()
    }

    /// Replace the rows with `curve`, stored under `<column>_<suffix>` unless
    /// the result names are given.
    fn into_curve(self, curve: Curve, args: &BoundArgs, suffix: &str) -> Result<Collection> {
        let load_name = args
            .opt_str("result_load_column")
            .map_or_else(|| format!("{}_{suffix}", self.load_column), str::to_string);
        let displacement_name = args
            .opt_str("result_disp_column")
            .map_or_else(
                || format!("{}_{suffix}", self.displacement_column),
                str::to_string,
            );
        if load_name == displacement_name {
            return Err(args.invalid(
                "result_disp_column",
                format!("load and displacement results are both named '{load_name}'"),
            ));
        }

        let mut collection = self.collection;
        let load_unit = unit_of(&collection, &self.load_column);
        let displacement_unit = unit_of(&collection, &self.displacement_column);
        debug!(
            operation = args.operation(),
            points = curve.points.len(),
            "traced curve"
        );
        let (displacement, load): (Vec<_>, Vec<_>) = curve
            .points
            .into_iter()
            .map(|(d, l)| (Some(d), Some(l)))
            .unzip();
        collection.rebuild(
            StepIndex::sequential(load.len()),
            vec![
                Column::numeric(&load_name, load).with_optional_unit(load_unit),
                Column::numeric(&displacement_name, displacement)
                    .with_optional_unit(displacement_unit),
            ],
        )?;
        let metadata = collection.metadata_mut();
        metadata.insert("operation".into(), Value::from(args.operation()));
        metadata.insert(
            "source_columns".into(),
            Value::from(vec![self.load_column, self.displacement_column]),
        );

        let mut fields = Kwargs::new();
        fields.insert("load_column".into(), Value::from(load_name));
        fields.insert("displacement_column".into(), Value::from(displacement_name));
        if let Some(state) = load_displacement::construct(&collection.to_parts(), &fields)? {
            collection.replace_domain_state(state)?;
        }
        Ok(collection)
    }
}

/// Envelope through the load peaks of cycles 1 up to the cycle holding the
/// maximum load. The first new peak of a cycle shifts that cycle so it
/// continues the line through the last two curve points. With
/// `has_decrease`, the cycles from the peak cycle on extend the curve as
/// chosen by `decrease_type`.
fn create_skeleton_curve(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let decrease = Decrease::parse(args)?;
    let data = CycleData::read(collection, args)?;
    let cycles = partition(&data.markers);
    let peak = first_max(&data.points, |point| point.map(|(_, load)| load));
    let peak_cycle = peak.map_or(0, |row| data.markers[row]);

    let mut curve = Curve::default();
    let mut peak_load = 0.0_f64;
    let mut offset = 0.0_f64;
    for cycle in 1..=peak_cycle {
        let Some(rows) = cycles.get(&cycle) else {
            continue;
        };
        offset = 0.0;
        for (displacement, load) in data.points_of(rows) {
            if load <= peak_load {
                continue;
            }
            peak_load = load;
            if offset == 0.0
                && curve.points.len() >= 2
                && let Some(joined) = displacement_at(&curve.points, load, Edge::End)
            {
                offset = joined - displacement;
            }
            curve.push((displacement + offset, load));
        }
    }

    if args.bool("has_decrease") && peak.is_some() {
        let last_cycle = data.markers.iter().copied().max().unwrap_or(peak_cycle);
        for cycle in peak_cycle..=last_cycle {
            let Some(rows) = cycles.get(&cycle) else {
                continue;
            };
            let points = data.points_of(rows);
            let (Some(load_peak), Some(displacement_peak)) = (
                first_max(&points, |point| Some(point.1)),
                first_max(&points, |point| Some(point.0)),
            ) else {
                continue;
            };
            let shifted = |position: usize| {
                let (displacement, load) = points[position];
                (displacement + offset, load)
            };
            match decrease {
                Decrease::Envelope => curve.push_distinct(shifted(displacement_peak)),
                Decrease::ContinuousOnly if load_peak == displacement_peak => {}
                Decrease::Both if load_peak == displacement_peak => {
                    curve.push_distinct(shifted(displacement_peak));
                }
                Decrease::ContinuousOnly | Decrease::Both => {
                    let from = load_peak.min(displacement_peak);
                    let to = load_peak.max(displacement_peak);
                    for position in from..=to {
                        curve.push_distinct(shifted(position));
                    }
                }
            }
        }
    }
    data.into_curve(curve, args, "skeleton")
}

/// Cycles laid end to end. Each cycle contributes its points of
/// non-negative load, closed at zero load on both sides, shifted so it
/// starts where the previous cycle ended.
fn create_cumulative_curve(collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let data = CycleData::read(collection, args)?;
    let mut curve = Curve::default();
    for rows in partition(&data.markers).values() {
        let branch: Vec<(f64, f64)> = data
            .points_of(rows)
            .into_iter()
            .filter(|&(_, load)| load >= 0.0)
            .collect();
        let (Some(start), Some(end)) = (
            displacement_at(&branch, 0.0, Edge::Start),
            displacement_at(&branch, 0.0, Edge::End),
        ) else {
            continue;
        };
        let offset = curve.points.last().map_or(0.0, |&(last, _)| last - start);
        curve.push((start + offset, 0.0));
        for (displacement, load) in branch {
            curve.push((displacement + offset, load));
        }
        curve.push((end + offset, 0.0));
    }
    data.into_curve(curve, args, "cumulative")
}

pub fn register(registry: &mut OperationRegistry) -> Result<()> {
    registry.register(
        "create_skeleton_curve",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::collection(CREATE_SKELETON_CURVE, create_skeleton_curve),
        false,
    )?;
    registry.register(
        "create_cumulative_curve",
        LOAD_DISPLACEMENT_DOMAIN,
        OperationDef::collection(CREATE_CUMULATIVE_CURVE, create_cumulative_curve),
        false,
    )?;
    Ok(())
}
