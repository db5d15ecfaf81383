//! Configuration UI description served at `/configure.json`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration form for the addon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationUi {
    /// E.g. "form" or "list"
    #[serde(rename = "type")]
    pub ui_type: String,

    pub properties: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ConfigurationUi {
    pub fn new(ui_type: impl Into<String>) -> Self {
        Self {
            ui_type: ui_type.into(),
            ..Self::default()
        }
    }

    /// Add a field under `name`. Required fields are also listed in `required`.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the field can't be represented as JSON.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field: ConfigurationField,
    ) -> Result<Self, serde_json::Error> {
        let name = name.into();
        if field.required {
            self.add_required_field(name.clone());
        }
        self.properties.insert(name, serde_json::to_value(field)?);
        Ok(self)
    }

    pub fn add_required_field(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.required.contains(&field) {
            self.required.push(field);
        }
    }

    pub fn set_default(&mut self, default: Value) {
        self.default = Some(default);
    }
}

/// One field of the configuration form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationField {
    /// E.g. "text", "number", "boolean", "select"
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl ConfigurationField {
    pub fn new(field_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn step(mut self, step: impl Into<Value>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}
