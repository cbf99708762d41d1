//! Serde targets for the backend's HTTP responses.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Error-shaped body the backend may return with any status code.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessageResponse {
    pub error: String,
    pub message: String,
}

/// Result kind of a stored dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Raster,
    Vector,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Raster => f.write_str("raster"),
            DatasetKind::Vector => f.write_str("vector"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDatasetResponse {
    pub result_descriptor: DatasetResultDescriptor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetResultDescriptor {
    #[serde(rename = "type")]
    pub kind: DatasetKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: Uuid,
}

/// Data type of one vector attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureDataType {
    Category,
    Int,
    Float,
    Text,
    Bool,
    DateTime,
}

impl FeatureDataType {
    /// Whether column literals of this type are JSON strings (as opposed to
    /// numbers).
    pub fn is_textual(&self) -> bool {
        matches!(self, FeatureDataType::Text)
    }
}

impl fmt::Display for FeatureDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureDataType::Category => "category",
            FeatureDataType::Int => "int",
            FeatureDataType::Float => "float",
            FeatureDataType::Text => "text",
            FeatureDataType::Bool => "bool",
            FeatureDataType::DateTime => "dateTime",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub data_type: FeatureDataType,
    #[serde(default)]
    pub measurement: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDescriptor {
    pub name: String,
    #[serde(default)]
    pub measurement: Value,
}

/// Typed result metadata of a registered workflow: columns for vector
/// output, bands for raster, nothing for plots.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypedResultDescriptor {
    #[serde(rename_all = "camelCase")]
    Vector {
        data_type: String,
        columns: HashMap<String, ColumnDescriptor>,
    },
    #[serde(rename_all = "camelCase")]
    Raster {
        data_type: String,
        bands: Vec<BandDescriptor>,
    },
    Plot {},
}
