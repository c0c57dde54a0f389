//! Domain tags and the state a specialized collection carries.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

/// Tag of the generic, unspecialized collection.
pub const CORE_DOMAIN: &str = "core";

/// Keyword arguments passed to domain constructors and converters.
pub type Kwargs = IndexMap<String, Value>;

/// Extra fields a domain variant attaches to a collection.
///
/// Implementations are built by domain constructors registered with a
/// domain factory, never by callers directly. State is shared between
/// clones of a collection and replaced wholesale when it changes.
pub trait DomainState: fmt::Debug + Send + Sync + 'static {
    /// Tag of the domain this state belongs to.
    fn domain(&self) -> &str;

    /// Domain fields as keyword values.
    ///
    /// Used for collection equality and for re-creating the state when a
    /// collection is converted into its own domain again.
    fn fields(&self) -> Kwargs;

    fn as_any(&self) -> &dyn Any;
}
