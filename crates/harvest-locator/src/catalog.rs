//! Immutable name → locator mapping built once per page model.

use crate::{
    definition::LocatorDefinition,
    error::{LocatorError, Result},
    loader::LocatorManifest,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Lookup table over one manifest's element definitions.
///
/// Names are unique; the catalog never changes after construction.
#[derive(Debug, Clone)]
pub struct LocatorCatalog {
    name: String,
    origin: String,
    definitions: HashMap<String, LocatorDefinition>,
}

impl LocatorCatalog {
    /// Build a catalog from a validated manifest.
    #[must_use]
    pub fn from_manifest(manifest: LocatorManifest) -> Self {
        let (name, origin, elements) = manifest.into_parts();
        let definitions: HashMap<_, _> = elements
            .into_iter()
            .map(|def| (def.name().to_string(), def))
            .collect();

        info!(
            catalog = %name,
            origin = %origin,
            count = definitions.len(),
            "built locator catalog"
        );

        Self {
            name,
            origin,
            definitions,
        }
    }

    /// Parse JSON text and build a catalog from it.
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        LocatorManifest::from_json(json, origin).map(Self::from_manifest)
    }

    /// Load a manifest file and build a catalog from it.
    pub fn load(path: &Path) -> Result<Self> {
        LocatorManifest::load(path).map(Self::from_manifest)
    }

    /// Catalog name, taken from the manifest.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the manifest came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Look up a definition by element name.
    ///
    /// # Errors
    /// Returns [`LocatorError::NotFound`] if the name is not declared.
    pub fn get(&self, name: &str) -> Result<&LocatorDefinition> {
        self.definitions.get(name).ok_or_else(|| LocatorError::NotFound {
            name: name.to_string(),
        })
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Number of declared elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Always false for a catalog built from a valid manifest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Declared element names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::LocatorKind;

    fn catalog() -> LocatorCatalog {
        LocatorCatalog::from_json(
            r#"{"Name":"Orders","Elements":[
                {"Name":"ORDER_TYPE","Type":"id","Value":"ddlOrderType"},
                {"Name":"PAGE_COUNT","Type":"xpath","Value":"//tr[@class='pager']//td"}
            ]}"#,
            "inline",
        )
        .expect("valid catalog")
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog();
        let def = catalog.get("ORDER_TYPE").expect("declared");
        assert_eq!(def.kind(), LocatorKind::Id);
        assert_eq!(def.value(), "ddlOrderType");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), vec!["ORDER_TYPE", "PAGE_COUNT"]);
    }

    #[test]
    fn test_missing_name() {
        let err = catalog().get("SEARCH_BUTTON").expect_err("not declared");
        assert_eq!(
            err,
            LocatorError::NotFound {
                name: "SEARCH_BUTTON".to_string()
            }
        );
    }
}
