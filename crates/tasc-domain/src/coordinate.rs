//! Coordinate domain: spatial positions attached to columns (e.g. sensor
//! locations), with distance calculations between them.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tasc_model::{Collection, CollectionParts, DomainState, Kwargs, Result, TascError};

use crate::factory::DomainFactory;

pub const COORDINATE_DOMAIN: &str = "coordinate";

/// Position of one column. Missing components are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

impl Coordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Components of `other` that are set replace those of `self`.
    #[must_use]
    pub fn merged(self, other: Coordinates) -> Self {
        Self {
            x: other.x.or(self.x),
            y: other.y.or(self.y),
            z: other.z.or(self.z),
        }
    }

    pub fn to_value(self) -> Value {
        let mut map = Map::new();
        for (axis, component) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            map.insert(
                axis.to_string(),
                component
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            );
        }
        Value::Object(map)
    }
}

/// Coordinates per column name, in assignment order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateState {
    coordinates: IndexMap<String, Coordinates>,
}

impl CoordinateState {
    /// State of a coordinate collection.
    pub fn of(collection: &Collection) -> Result<&Self> {
        collection
            .domain_state_as::<Self>()
            .ok_or_else(|| TascError::MissingRequiredField {
                domain: collection.domain().to_string(),
                field: "coordinates".to_string(),
            })
    }

    pub fn get(&self, column: &str) -> Option<Coordinates> {
        self.coordinates.get(column).copied()
    }

    /// Columns with at least one coordinate component set.
    pub fn columns_with_coordinates(&self) -> Vec<&str> {
        self.coordinates
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Copy with `coordinates` merged into the entry for `column`.
    #[must_use]
    pub fn with_coordinates(&self, column: &str, coordinates: Coordinates) -> Self {
        let mut next = self.clone();
        let entry = next.coordinates.entry(column.to_string()).or_default();
        *entry = entry.merged(coordinates);
        next
    }

    /// Euclidean distance between two columns' positions.
    ///
    /// Uses 3D when both have a z component, 2D otherwise.
    pub fn distance(&self, column1: &str, column2: &str) -> Result<f64> {
        let (x1, y1, z1) = self.planar(column1)?;
        let (x2, y2, z2) = self.planar(column2)?;
        let planar = (x2 - x1).powi(2) + (y2 - y1).powi(2);
        let distance = match (z1, z2) {
            (Some(z1), Some(z2)) => (planar + (z2 - z1).powi(2)).sqrt(),
            _ => planar.sqrt(),
        };
        Ok(distance)
    }

    fn planar(&self, column: &str) -> Result<(f64, f64, Option<f64>)> {
        let coordinates = self.get(column).unwrap_or_default();
        let missing = |axis: &str| TascError::MissingRequiredField {
            domain: COORDINATE_DOMAIN.to_string(),
            field: format!("coordinates.{column}.{axis}"),
        };
        let x = coordinates.x.ok_or_else(|| missing("x"))?;
        let y = coordinates.y.ok_or_else(|| missing("y"))?;
        Ok((x, y, coordinates.z))
    }
}

impl DomainState for CoordinateState {
    fn domain(&self) -> &str {
        COORDINATE_DOMAIN
    }

    fn fields(&self) -> Kwargs {
        let map: Map<String, Value> = self
            .coordinates
            .iter()
            .map(|(name, c)| (name.clone(), c.to_value()))
            .collect();
        let mut fields = Kwargs::new();
        fields.insert("coordinates".into(), Value::Object(map));
        fields
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Constructor: optional `coordinates` object mapping column names to
/// `{x, y, z}`.
pub fn construct(
    parts: &CollectionParts,
    kwargs: &Kwargs,
) -> Result<Option<Arc<dyn DomainState>>> {
    let coordinates = match kwargs.get("coordinates") {
        None | Some(Value::Null) => IndexMap::new(),
        Some(value) => serde_json::from_value::<IndexMap<String, Coordinates>>(value.clone())
            .map_err(|err| {
                TascError::invalid_argument(COORDINATE_DOMAIN, "coordinates", err.to_string())
            })?,
    };
    if let Some(name) = coordinates.keys().find(|name| parts.column(name).is_none()) {
        return Err(TascError::column_not_found(name.as_str()));
    }
    Ok(Some(Arc::new(CoordinateState { coordinates })))
}

pub fn register(factory: &mut DomainFactory) -> Result<()> {
    factory.register(
        COORDINATE_DOMAIN,
        "Columns with spatial coordinates",
        construct,
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_existing_components() {
        let state = CoordinateState::default()
            .with_coordinates("A", Coordinates::new(1.0, 2.0))
            .with_coordinates(
                "A",
                Coordinates {
                    z: Some(3.0),
                    ..Coordinates::default()
                },
            );
        assert_eq!(state.get("A"), Some(Coordinates::new(1.0, 2.0).with_z(3.0)));
    }

    #[test]
    fn distance_is_planar_without_z() {
        let state = CoordinateState::default()
            .with_coordinates("A", Coordinates::new(0.0, 0.0).with_z(5.0))
            .with_coordinates("B", Coordinates::new(3.0, 4.0));
        assert_eq!(state.distance("A", "B").unwrap(), 5.0);
    }

    #[test]
    fn distance_is_spatial_with_z() {
        let state = CoordinateState::default()
            .with_coordinates("A", Coordinates::new(0.0, 0.0).with_z(0.0))
            .with_coordinates("B", Coordinates::new(2.0, 3.0).with_z(6.0));
        assert_eq!(state.distance("A", "B").unwrap(), 7.0);
    }

    #[test]
    fn distance_requires_x_and_y() {
        let state = CoordinateState::default().with_coordinates(
            "A",
            Coordinates {
                x: Some(1.0),
                ..Coordinates::default()
            },
        );
        let err = state.distance("A", "A").unwrap_err();
        assert_eq!(
            err,
            TascError::MissingRequiredField {
                domain: "coordinate".into(),
                field: "coordinates.A.y".into()
            }
        );
    }
}
