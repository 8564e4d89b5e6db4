use crate::core::FieldId;
use serde::{Deserialize, Serialize};

/// Type tag of a field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// Single choice from `constraints.options`.
    Select,
    /// List of strings, optionally restricted by `constraints.list`.
    List,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::List => "list",
        }
    }
}

/// Constraints applied to every item of a list field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListConstraints {
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique: bool,
    pub item_pattern: Option<String>,
    pub item_max_length: Option<usize>,
    /// Allowed item values; empty means unrestricted.
    pub item_options: Vec<String>,
}

/// Validation bundle of a field definition. Every bound is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConstraints {
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Allowed values for `select` fields; empty means unrestricted.
    pub options: Vec<String>,
    pub list: Option<ListConstraints>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: FieldId,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub constraints: FieldConstraints,
    #[serde(default)]
    pub deleted: bool,
}

impl FieldDefinition {
    pub fn new(id: impl Into<FieldId>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            required: false,
            constraints: FieldConstraints::default(),
            deleted: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}
