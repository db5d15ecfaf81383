//! Addon manifest.
//!
//! See the Stremio addon SDK documentation for `manifest.json`. Field names
//! are serialized in camelCase; empty optional fields are omitted.

use serde::{Deserialize, Serialize};

/// Capability descriptor served at `/manifest.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,

    #[serde(rename = "resources", default, skip_serializing_if = "Vec::is_empty")]
    pub resource_items: Vec<ResourceItem>,

    /// Stremio supports "movie", "series", "channel" and "tv"
    #[serde(default)]
    pub types: Vec<String>,

    /// Must serialize as an empty array rather than be omitted
    #[serde(default)]
    pub catalogs: Vec<CatalogItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_prefixes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "BehaviorHints::is_empty")]
    pub behavior_hints: BehaviorHints,
}

impl Manifest {
    /// Whether all required fields are set.
    pub fn is_complete(&self) -> bool {
        !(self.id.is_empty()
            || self.name.is_empty()
            || self.description.is_empty()
            || self.version.is_empty())
    }

    pub fn configuration_required(&self) -> bool {
        self.behavior_hints.configuration_required
    }

    pub fn configurable(&self) -> bool {
        self.behavior_hints.configurable
    }

    pub fn supports_type(&self, media_type: &str) -> bool {
        self.types.iter().any(|t| t == media_type)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub name: String,
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub adult: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub p2p: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub configurable: bool,

    /// Served as-is on `/manifest.json` but cleared on `/{userData}/manifest.json`,
    /// otherwise Stremio won't show the "Install" button after configuration.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub configuration_required: bool,
}

impl BehaviorHints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(rename = "type")]
    pub media_type: String,
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraItem {
    pub name: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_limit: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_manifest_serialization() {
        let manifest = Manifest {
            id: "org.test".to_string(),
            name: "t".to_string(),
            description: "d".to_string(),
            version: "1.0.0".to_string(),
            types: vec!["movie".to_string()],
            ..Manifest::default()
        };

        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            json!({
                "id": "org.test",
                "name": "t",
                "description": "d",
                "version": "1.0.0",
                "types": ["movie"],
                "catalogs": []
            })
        );
    }

    #[test]
    fn test_behavior_hints_camel_case() {
        let manifest = Manifest {
            behavior_hints: BehaviorHints {
                configurable: true,
                configuration_required: true,
                ..BehaviorHints::default()
            },
            ..Manifest::default()
        };

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value["behaviorHints"],
            json!({"configurable": true, "configurationRequired": true})
        );
        assert!(manifest.configuration_required());
    }

    #[test]
    fn test_is_complete() {
        let mut manifest = Manifest {
            id: "a".to_string(),
            name: "b".to_string(),
            description: "c".to_string(),
            version: "1".to_string(),
            ..Manifest::default()
        };
        assert!(manifest.is_complete());

        manifest.version.clear();
        assert!(!manifest.is_complete());
    }

    #[test]
    fn test_catalog_type_field_name() {
        let catalog = CatalogItem {
            media_type: "movie".to_string(),
            id: "top".to_string(),
            name: "Top".to_string(),
            extra: vec![],
        };
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(value["type"], "movie");
    }
}
