//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored datafile. `url` is `<protocol>://<path relative to the dataset>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetFile {
    pub id: i64,
    pub dataset_id: i64,
    pub filename: String,
    pub url: String,
    pub size: Option<i64>,
    pub mimetype: Option<String>,
}

/// Everything needed to find a datafile in the file store
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DatafileLocation {
    pub experiment_id: i64,
    pub dataset_id: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schema {
    pub id: i64,
    pub namespace: String,
    pub name: String,
}

/// Value of a single datafile parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Numeric(f64),
    String(String),
}

impl ParameterValue {
    /// Stored `parameter_names.data_type` for this value
    pub fn data_type(&self) -> &'static str {
        match self {
            ParameterValue::Numeric(_) => "numeric",
            ParameterValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Numeric(v) => write!(f, "{}", v),
            ParameterValue::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Numeric(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

/// A parameter as read back for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub full_name: String,
    pub units: Option<String>,
    pub value: ParameterValue,
}

/// A parameter set with its parameters in storage order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub id: i64,
    pub schema: Schema,
    pub parameters: Vec<Parameter>,
}

/// A parameter produced by a post-save filter, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParameter {
    pub name: String,
    pub value: ParameterValue,
    pub units: Option<String>,
}

impl ExtractedParameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}
