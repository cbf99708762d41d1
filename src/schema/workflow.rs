//! The exported workflow document — the wire shape exchanged with the
//! backend and persisted by the host model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::PinType;

/// Declared result kind of a complete workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Raster,
    Vector,
    Plot,
}

impl ResultKind {
    /// Maps a scalar pin type onto the document-level result kind.
    pub fn from_pin_type(pin: &PinType) -> Option<ResultKind> {
        match pin.as_str() {
            "raster" => Some(ResultKind::Raster),
            "vector" => Some(ResultKind::Vector),
            "plot" => Some(ResultKind::Plot),
            _ => None,
        }
    }
}

/// Root document: exactly one operator tree plus its declared result kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(rename = "type")]
    pub result_kind: ResultKind,
    pub operator: WorkflowOperator,
}

/// One node of the exported operator tree. Sources are always strict
/// descendants in execution order, so the structure is a tree with no
/// cycles even when a source carries an array of operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOperator {
    #[serde(rename = "type")]
    pub operator: String,
    pub params: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<serde_json::Map<String, Value>>,
}

impl WorkflowOperator {
    pub fn new(operator: impl Into<String>) -> Self {
        WorkflowOperator {
            operator: operator.into(),
            params: serde_json::Map::new(),
            sources: None,
        }
    }

    /// Typed view of one source entry.
    pub fn source(&self, name: &str) -> Option<Result<SourceValue, serde_json::Error>> {
        let value = self.sources.as_ref()?.get(name)?;
        Some(SourceValue::from_value(value))
    }
}

/// A source entry is either a single operator or an array of operators
/// (assembled by an array builder block).
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    One(WorkflowOperator),
    Many(Vec<WorkflowOperator>),
}

impl SourceValue {
    pub fn from_value(value: &Value) -> Result<SourceValue, serde_json::Error> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| serde_json::from_value(item.clone()))
                .collect::<Result<Vec<_>, _>>()
                .map(SourceValue::Many),
            other => serde_json::from_value(other.clone()).map(SourceValue::One),
        }
    }
}
