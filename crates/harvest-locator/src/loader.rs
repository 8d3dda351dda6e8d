//! Locator manifest parsing.
//!
//! Manifests are JSON documents of the form
//! `{ "Name": ..., "Elements": [ { "Name": ..., "Type": ..., "Value": ... } ] }`.

use crate::{
    definition::LocatorDefinition,
    error::{LocatorError, Result},
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Elements")]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Value")]
    value: String,
}

/// A parsed and validated locator manifest.
#[derive(Debug, Clone)]
pub struct LocatorManifest {
    name: String,
    origin: String,
    elements: Vec<LocatorDefinition>,
}

impl LocatorManifest {
    /// Parse a manifest from JSON text.
    ///
    /// `origin` names the source in error messages (a path or resource name).
    ///
    /// # Errors
    /// - [`LocatorError::Resource`] for malformed JSON, zero elements, blank or
    ///   duplicate element names
    /// - [`LocatorError::UnknownType`] for an unrecognised `Type`
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(json).map_err(|e| LocatorError::Resource {
            origin: origin.to_string(),
            reason: format!("malformed JSON: {e}"),
        })?;

        if raw.elements.is_empty() {
            return Err(LocatorError::Resource {
                origin: origin.to_string(),
                reason: "manifest declares no elements".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut elements = Vec::with_capacity(raw.elements.len());
        for element in raw.elements {
            if element.name.trim().is_empty() {
                return Err(LocatorError::Resource {
                    origin: origin.to_string(),
                    reason: "element with empty name".to_string(),
                });
            }
            if !seen.insert(element.name.clone()) {
                return Err(LocatorError::Resource {
                    origin: origin.to_string(),
                    reason: format!("duplicate element name {}", element.name),
                });
            }
            elements.push(LocatorDefinition::parse(
                element.name,
                &element.kind,
                element.value,
            )?);
        }

        debug!(
            manifest = %raw.name,
            origin,
            elements = elements.len(),
            "parsed locator manifest"
        );

        Ok(Self {
            name: raw.name,
            origin: origin.to_string(),
            elements,
        })
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    /// Returns [`LocatorError::Resource`] if the file cannot be read, plus any
    /// error from [`from_json`](Self::from_json).
    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| LocatorError::Resource {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_json(&contents, &origin)
    }

    /// Manifest name (usually the page it describes).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the manifest came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Declared elements in manifest order.
    #[must_use]
    pub fn elements(&self) -> &[LocatorDefinition] {
        &self.elements
    }

    pub(crate) fn into_parts(self) -> (String, String, Vec<LocatorDefinition>) {
        (self.name, self.origin, self.elements)
    }
}
