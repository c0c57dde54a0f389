//! The engine bundles a domain factory with an operation registry.
//!
//! Chain contexts borrow an engine, so tests and applications can build
//! their own registries instead of sharing global state.

use serde_json::Value;
use tasc_domain::DomainFactory;
use tasc_model::{Collection, Kwargs, Result, TascError};
use tracing::debug;

use crate::args::Args;
use crate::chain::ChainContext;
use crate::group::GroupContext;
use crate::registry::{AS_DOMAIN, OperationRegistry};

/// Domain factory and operation registry used for dispatch.
#[derive(Default)]
pub struct Engine {
    domains: DomainFactory,
    operations: OperationRegistry,
}

impl Engine {
    pub fn new(domains: DomainFactory, operations: OperationRegistry) -> Self {
        Self {
            domains,
            operations,
        }
    }

    /// Engine with every built-in domain, converter and operation.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(
            DomainFactory::with_builtins()?,
            OperationRegistry::with_builtins()?,
        ))
    }

    pub fn domains(&self) -> &DomainFactory {
        &self.domains
    }

    pub fn domains_mut(&mut self) -> &mut DomainFactory {
        &mut self.domains
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }

    /// Start a chain over `collection`.
    pub fn chain(&self, collection: Collection) -> ChainContext<'_> {
        ChainContext::new(self, collection)
    }

    /// Start a group chain over `collections`.
    pub fn group(&self, collections: Vec<Collection>) -> GroupContext<'_> {
        GroupContext::new(self, collections)
    }

    /// Run a collection-producing operation, or `as_domain`.
    ///
    /// A specialized result whose domain fields no longer name existing
    /// columns comes back as a `core` collection.
    pub fn call(&self, collection: Collection, name: &str, args: &Args) -> Result<Collection> {
        if name == AS_DOMAIN {
            let (target, kwargs) = domain_request(args)?;
            return self.as_domain(collection, &target, kwargs);
        }
        let result = self.operations.invoke_collection(collection, name, args)?;
        Ok(self.domains.revalidate(result))
    }

    /// Convert `collection` into `target` through the domain factory.
    pub fn as_domain(
        &self,
        collection: Collection,
        target: &str,
        kwargs: Kwargs,
    ) -> Result<Collection> {
        debug!(source = collection.domain(), target, "converting domain");
        self.domains.convert(collection, target, kwargs)
    }
}

/// Target domain and keyword arguments of an `as_domain` call.
///
/// The target is the first positional argument or the `domain` keyword.
fn domain_request(args: &Args) -> Result<(String, Kwargs)> {
    let invalid = |message: &str| TascError::invalid_argument(AS_DOMAIN, "domain", message);
    let mut kwargs = args.to_kwargs();
    let keyword_target = kwargs.shift_remove("domain");
    let target = match (args.positional(), keyword_target) {
        ([], Some(target)) => target,
        ([target], None) => target.clone(),
        ([], None) => return Err(invalid("missing target domain")),
        _ => return Err(invalid("target domain given more than once")),
    };
    match target {
        Value::String(target) => Ok((target, kwargs)),
        other => Err(invalid(&format!("expected a domain name, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_request_accepts_positional_or_keyword() {
        let args = Args::new().arg("coordinate").kwarg("coordinates", Value::Null);
        let (target, kwargs) = domain_request(&args).unwrap();
        assert_eq!(target, "coordinate");
        assert!(kwargs.contains_key("coordinates"));

        let (target, kwargs) = domain_request(&Args::new().kwarg("domain", "core")).unwrap();
        assert_eq!(target, "core");
        assert!(kwargs.is_empty());

        assert!(domain_request(&Args::new()).is_err());
        assert!(domain_request(&Args::new().arg("a").kwarg("domain", "b")).is_err());
    }
}
