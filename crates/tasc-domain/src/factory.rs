//! Domain factory and converter registry.
//!
//! The [`DomainFactory`] builds specialized collections from generic parts.
//! Each domain registers a constructor that validates keyword arguments and
//! produces the domain state; converters keyed by `(source, target)` may
//! rewrite a collection and infer missing keyword arguments before the
//! target constructor runs.
//!
//! # Example
//!
//! ```ignore
//! use tasc_domain::DomainFactory;
//!
//! let factory = DomainFactory::with_builtins()?;
//! let mut kwargs = Kwargs::new();
//! kwargs.insert("load_column".into(), "Force".into());
//! kwargs.insert("displacement_column".into(), "Disp".into());
//! let specialized = factory.convert(collection, "load_displacement", kwargs)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tasc_model::{
    CORE_DOMAIN, Collection, CollectionParts, DomainState, Kwargs, Result, TascError,
};
use tracing::{debug, trace, warn};

/// Builds the domain state from generic parts and keyword arguments.
///
/// Returning `Ok(None)` yields a collection with no extra fields.
pub type DomainConstructor = Arc<
    dyn Fn(&CollectionParts, &Kwargs) -> Result<Option<Arc<dyn DomainState>>> + Send + Sync,
>;

/// Adapts a collection and its keyword arguments ahead of construction.
pub type Converter = Arc<dyn Fn(Collection, Kwargs) -> Result<(Collection, Kwargs)> + Send + Sync>;

struct DomainEntry {
    description: String,
    constructor: DomainConstructor,
}

/// A registered domain as listed by [`DomainFactory::domains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainInfo<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

/// Registry of domain constructors and converters.
///
/// The `core` domain is always registered. Domains are listed in
/// registration order.
pub struct DomainFactory {
    domains: IndexMap<String, DomainEntry>,
    converters: HashMap<(String, String), Converter>,
}

impl Default for DomainFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainFactory {
    /// Factory with only the `core` domain.
    pub fn new() -> Self {
        let mut domains = IndexMap::new();
        domains.insert(
            CORE_DOMAIN.to_string(),
            DomainEntry {
                description: "Generic step-indexed collection".to_string(),
                constructor: Arc::new(construct_core),
            },
        );
        Self {
            domains,
            converters: HashMap::new(),
        }
    }

    /// Factory with every built-in domain and converter registered.
    pub fn with_builtins() -> Result<Self> {
        let mut factory = Self::new();
        crate::register_builtin_domains(&mut factory)?;
        Ok(factory)
    }

    /// Register a domain constructor.
    ///
    /// # Errors
    ///
    /// Returns [`TascError::DuplicateDomain`] if the name is taken and
    /// `allow_override` is false.
    pub fn register<F>(
        &mut self,
        domain: impl Into<String>,
        description: impl Into<String>,
        constructor: F,
        allow_override: bool,
    ) -> Result<()>
    where
        F: Fn(&CollectionParts, &Kwargs) -> Result<Option<Arc<dyn DomainState>>>
            + Send
            + Sync
            + 'static,
    {
        let domain = domain.into();
        if self.domains.contains_key(&domain) && !allow_override {
            return Err(TascError::DuplicateDomain { domain });
        }
        trace!(domain = %domain, "registering domain");
        self.domains.insert(
            domain,
            DomainEntry {
                description: description.into(),
                constructor: Arc::new(constructor),
            },
        );
        Ok(())
    }

    /// Register the converter for `(source, target)`, replacing any previous one.
    pub fn register_converter<F>(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        converter: F,
    ) where
        F: Fn(Collection, Kwargs) -> Result<(Collection, Kwargs)> + Send + Sync + 'static,
    {
        let key = (source.into(), target.into());
        trace!(source = %key.0, target = %key.1, "registering converter");
        if self.converters.insert(key.clone(), Arc::new(converter)).is_some() {
            warn!(source = %key.0, target = %key.1, "replaced existing converter");
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    pub fn has_converter(&self, source: &str, target: &str) -> bool {
        self.converters
            .contains_key(&(source.to_string(), target.to_string()))
    }

    /// Registered domains in registration order.
    pub fn domains(&self) -> impl Iterator<Item = DomainInfo<'_>> + '_ {
        self.domains.iter().map(|(name, entry)| DomainInfo {
            name,
            description: &entry.description,
        })
    }

    /// Build a collection of `domain` from generic parts and keyword arguments.
    pub fn create(
        &self,
        domain: &str,
        parts: CollectionParts,
        kwargs: &Kwargs,
    ) -> Result<Collection> {
        let entry = self
            .domains
            .get(domain)
            .ok_or_else(|| TascError::UnknownDomain {
                domain: domain.to_string(),
            })?;
        let state = (entry.constructor)(&parts, kwargs)?;
        let collection = Collection::with_domain(parts, domain, state)?;
        debug!(
            domain,
            rows = collection.len(),
            columns = collection.column_count(),
            "created collection"
        );
        Ok(collection)
    }

    /// Re-check a specialized collection's fields against its columns.
    ///
    /// Operations may drop or rename columns the domain fields point at.
    /// When the domain constructor no longer accepts the current fields the
    /// collection falls back to `core`, keeping its columns, metadata and
    /// identity. Generic collections and unregistered domains pass through.
    pub fn revalidate(&self, mut collection: Collection) -> Collection {
        if collection.domain() == CORE_DOMAIN {
            return collection;
        }
        let Some(entry) = self.domains.get(collection.domain()) else {
            return collection;
        };
        if let Err(err) = (entry.constructor)(&collection.to_parts(), &collection.domain_fields()) {
            debug!(
                domain = collection.domain(),
                error = %err,
                "domain fields no longer fit; falling back to core"
            );
            collection.demote_to_core();
        }
        collection
    }

    /// Convert `collection` into `target`.
    ///
    /// Applies the `(source, target)` converter when one is registered,
    /// merging its inferred keyword arguments under the caller's, then runs
    /// the target constructor. Without a converter the caller's keyword
    /// arguments go to the constructor as they are. Converting into the
    /// collection's own domain reuses its current fields as defaults.
    pub fn convert(
        &self,
        collection: Collection,
        target: &str,
        kwargs: Kwargs,
    ) -> Result<Collection> {
        if !self.contains(target) {
            return Err(TascError::UnknownDomain {
                domain: target.to_string(),
            });
        }
        let source = collection.domain().to_string();
        let mut kwargs = kwargs;
        if source == target {
            for (field, value) in collection.domain_fields() {
                kwargs.entry(field).or_insert(value);
            }
        }

        let key = (source, target.to_string());
        let (collection, kwargs) = match self.converters.get(&key) {
            Some(converter) => {
                debug!(source = %key.0, target, "applying converter");
                let (converted, mut merged) = converter(collection, kwargs.clone())?;
                for (field, value) in kwargs {
                    merged.insert(field, value);
                }
                (converted, merged)
            }
            None => (collection, kwargs),
        };
        self.create(target, collection.into_parts(), &kwargs)
    }
}

fn construct_core(_: &CollectionParts, _: &Kwargs) -> Result<Option<Arc<dyn DomainState>>> {
    Ok(None)
}

/// Required string keyword argument of `domain`.
///
/// # Errors
///
/// [`TascError::MissingRequiredField`] when absent or null,
/// [`TascError::InvalidArgument`] when not a string.
pub fn required_str(kwargs: &Kwargs, domain: &str, field: &str) -> Result<String> {
    optional_str(kwargs, domain, field)?.ok_or_else(|| TascError::MissingRequiredField {
        domain: domain.to_string(),
        field: field.to_string(),
    })
}

/// Optional string keyword argument of `domain`.
pub fn optional_str(kwargs: &Kwargs, domain: &str, field: &str) -> Result<Option<String>> {
    match kwargs.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(TascError::invalid_argument(
            domain,
            field,
            format!("expected a string, got {other}"),
        )),
    }
}
