//! Load/displacement domain: a collection with designated load and
//! displacement columns.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tasc_model::{
    CORE_DOMAIN, Collection, CollectionParts, DomainState, Kwargs, Result, TascError,
};

use crate::factory::{DomainFactory, required_str};

pub const LOAD_DISPLACEMENT_DOMAIN: &str = "load_displacement";

const LOAD_KEYWORDS: &[&str] = &["load", "force", "荷重", "力"];
const DISPLACEMENT_KEYWORDS: &[&str] = &["disp", "displacement", "変位", "変形"];

/// Names of the load and displacement columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDisplacement {
    load_column: String,
    displacement_column: String,
}

impl LoadDisplacement {
    pub fn load_column(&self) -> &str {
        &self.load_column
    }

    pub fn displacement_column(&self) -> &str {
        &self.displacement_column
    }

    /// State of a load/displacement collection.
    ///
    /// # Errors
    ///
    /// [`TascError::MissingRequiredField`] when the collection carries no
    /// load/displacement state.
    pub fn of(collection: &Collection) -> Result<&Self> {
        collection
            .domain_state_as::<Self>()
            .ok_or_else(|| TascError::MissingRequiredField {
                domain: collection.domain().to_string(),
                field: "load_column".to_string(),
            })
    }
}

impl DomainState for LoadDisplacement {
    fn domain(&self) -> &str {
        LOAD_DISPLACEMENT_DOMAIN
    }

    fn fields(&self) -> Kwargs {
        let mut fields = Kwargs::new();
        fields.insert("load_column".into(), Value::from(self.load_column.clone()));
        fields.insert(
            "displacement_column".into(),
            Value::from(self.displacement_column.clone()),
        );
        fields
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Constructor: requires `load_column` and `displacement_column`, which must
/// name existing columns unless the collection has no columns yet.
pub fn construct(
    parts: &CollectionParts,
    kwargs: &Kwargs,
) -> Result<Option<Arc<dyn DomainState>>> {
    let load_column = required_str(kwargs, LOAD_DISPLACEMENT_DOMAIN, "load_column")?;
    let displacement_column =
        required_str(kwargs, LOAD_DISPLACEMENT_DOMAIN, "displacement_column")?;
    if !parts.columns.is_empty() {
        for name in [&load_column, &displacement_column] {
            if parts.column(name).is_none() {
                return Err(TascError::column_not_found(name.as_str()));
            }
        }
    }
    Ok(Some(Arc::new(LoadDisplacement {
        load_column,
        displacement_column,
    })))
}

/// Converter from `core`: infers missing column names from the column names,
/// then falls back to the first two numeric columns.
pub fn infer_columns(collection: Collection, kwargs: Kwargs) -> Result<(Collection, Kwargs)> {
    let mut kwargs = kwargs;
    let mut load = present_str(&kwargs, "load_column");
    let mut displacement = present_str(&kwargs, "displacement_column");

    if load.is_none() {
        load = find_by_keywords(&collection, LOAD_KEYWORDS, None);
    }
    if displacement.is_none() {
        displacement = find_by_keywords(&collection, DISPLACEMENT_KEYWORDS, load.as_deref());
    }
    if load.is_none() || displacement.is_none() {
        let numeric: Vec<&str> = collection
            .columns()
            .filter(|c| c.is_numeric())
            .map(|c| c.name())
            .collect();
        if numeric.len() >= 2 {
            let load_name = load.get_or_insert_with(|| numeric[0].to_string()).clone();
            if displacement.is_none() {
                displacement = numeric
                    .iter()
                    .find(|name| **name != load_name)
                    .map(|name| (*name).to_string());
            }
        }
    }

    for (field, value) in [("load_column", load), ("displacement_column", displacement)] {
        if let Some(value) = value {
            kwargs.insert(field.to_string(), Value::from(value));
        }
    }
    Ok((collection, kwargs))
}

fn present_str(kwargs: &Kwargs, field: &str) -> Option<String> {
    kwargs
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn find_by_keywords(
    collection: &Collection,
    keywords: &[&str],
    exclude: Option<&str>,
) -> Option<String> {
    keywords.iter().find_map(|keyword| {
        let keyword = keyword.to_lowercase();
        collection
            .column_names()
            .filter(|name| Some(*name) != exclude)
            .find(|name| name.to_lowercase().contains(&keyword))
            .map(str::to_string)
    })
}

pub fn register(factory: &mut DomainFactory) -> Result<()> {
    factory.register(
        LOAD_DISPLACEMENT_DOMAIN,
        "Load/displacement measurements with designated primary columns",
        construct,
        false,
    )?;
    factory.register_converter(CORE_DOMAIN, LOAD_DISPLACEMENT_DOMAIN, infer_columns);
    Ok(())
}
