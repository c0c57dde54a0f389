//! Versioned operation manifest.
//!
//! The manifest lists every registered `(domain, operation)` in
//! registration order with its parameters and output kind. It is the input
//! for tooling generators; a committed copy lives in
//! `manifest/operations.json` and is checked against the live registry.

use serde::{Deserialize, Serialize};

use crate::args::ParamKind;
use crate::registry::OutputKind;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// The manifest committed with this crate.
pub const COMMITTED_MANIFEST: &str = include_str!("../manifest/operations.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationManifest {
    pub version: u32,
    pub operations: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub domain: String,
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub output: OutputKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub has_default: bool,
}

impl OperationManifest {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Parse the manifest committed with this crate.
    pub fn committed() -> serde_json::Result<Self> {
        Self::from_json(COMMITTED_MANIFEST)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self).map(|mut text| {
            text.push('\n');
            text
        })
    }

    /// Human-readable differences from `expected`, empty when in sync.
    pub fn drift(&self, expected: &OperationManifest) -> Vec<String> {
        let mut drift = Vec::new();
        if self.version != expected.version {
            drift.push(format!(
                "version {} differs from expected {}",
                self.version, expected.version
            ));
        }
        for entry in &self.operations {
            let key = format!("{}::{}", entry.domain, entry.name);
            match expected.find(&entry.domain, &entry.name) {
                None => drift.push(format!("{key} is not in the manifest")),
                Some(other) if other != entry => {
                    drift.push(format!("{key} has a different signature"));
                }
                Some(_) => {}
            }
        }
        for entry in &expected.operations {
            if self.find(&entry.domain, &entry.name).is_none() {
                let key = format!("{}::{}", entry.domain, entry.name);
                drift.push(format!("{key} is no longer registered"));
            }
        }
        if drift.is_empty() && self.operations != expected.operations {
            drift.push("registration order differs".to_string());
        }
        drift
    }

    fn find(&self, domain: &str, name: &str) -> Option<&ManifestEntry> {
        self.operations
            .iter()
            .find(|e| e.domain == domain && e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ManifestEntry {
        ManifestEntry {
            domain: "core".into(),
            name: name.into(),
            params: vec![ParamSpec {
                name: "column".into(),
                kind: ParamKind::Column,
                has_default: false,
            }],
            output: OutputKind::Collection,
        }
    }

    #[test]
    fn drift_reports_each_difference() {
        let live = OperationManifest {
            version: MANIFEST_VERSION,
            operations: vec![entry("a"), entry("b")],
        };
        let mut changed = entry("a");
        changed.params[0].has_default = true;
        let expected = OperationManifest {
            version: MANIFEST_VERSION,
            operations: vec![changed, entry("c")],
        };
        assert_eq!(
            live.drift(&expected),
            vec![
                "core::a has a different signature",
                "core::b is not in the manifest",
                "core::c is no longer registered",
            ]
        );
        assert!(live.drift(&live).is_empty());
    }

    #[test]
    fn json_uses_snake_case_categories() {
        let text = serde_json::to_string(&entry("a")).unwrap();
        assert_eq!(
            text,
            r#"{"domain":"core","name":"a","params":[{"name":"column","kind":"column","has_default":false}],"output":"collection"}"#
        );
    }
}
