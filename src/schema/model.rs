//! Typed, queryable schema model built from the raw definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pin type of the sources fed into an array builder's free slots.
pub const WILDCARD_PIN_TYPE: &str = "*";

/// Pin type of an array builder's output.
pub const ARRAY_PIN_TYPE: &str = "array";

/// Param `format` marker that triggers a raster dataset existence/type check.
pub const RASTER_REF_FORMAT: &str = "raster-dataset-reference";

/// Param `format` marker that triggers a vector dataset existence/type check.
pub const VECTOR_REF_FORMAT: &str = "vector-dataset-reference";

/// The value-kind tag of a connection endpoint, e.g. `raster`, `vector`,
/// `plot`, `array`. Unions are comma-joined and kept as one literal tag
/// (`raster,vector`); [`PinType::components`] splits them for connection
/// compatibility only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinType(String);

impl PinType {
    pub fn new(tag: impl Into<String>) -> Self {
        PinType(tag.into())
    }

    /// Comma-join the distinct entries, preserving first-seen order.
    pub fn join_distinct<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen: Vec<&str> = Vec::new();
        for tag in tags {
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        PinType(seen.join(","))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(',')
    }

    /// Whether an output of type `produced` may feed a pin of this type:
    /// either side is a wildcard, or the component sets intersect (a
    /// `raster,vector` output may feed a `vector,plot` pin via `vector`).
    pub fn accepts(&self, produced: &PinType) -> bool {
        if self.0 == WILDCARD_PIN_TYPE || produced.0 == WILDCARD_PIN_TYPE {
            return true;
        }
        self.components()
            .any(|c| produced.components().any(|p| p == c))
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinType {
    fn from(tag: &str) -> Self {
        PinType(tag.to_string())
    }
}

/// Declared output typing of an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputType {
    /// Fixed pin type, resolved from a datatype definition or embedded
    /// directly in the operator definition.
    Static(PinType),
    /// The output pin follows whatever is connected to the operator's single
    /// source.
    CopyFromSource,
}

/// One input pin declaration: a single pin type, a union, or an array of one
/// inner type (fed by an array builder block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub pin_type: PinType,
    /// Set exactly when the source is array-typed.
    pub inner_type: Option<PinType>,
}

impl SourceSchema {
    pub fn is_array(&self) -> bool {
        self.inner_type.is_some()
    }
}

/// One configuration field: the raw JSON-Schema fragment plus the extracted
/// `format` marker that may trigger semantic validation.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    pub format: Option<String>,
    pub schema: Value,
}

/// Backend-declared contract for one operator type. Immutable once parsed;
/// cached per backend URL by the editor session.
#[derive(Debug, Clone)]
pub struct OperatorSchema {
    pub id: String,
    pub title: String,
    pub description: String,
    pub help_url: Option<String>,
    /// Params in document order.
    pub params: Vec<(String, ParamSchema)>,
    required_params: Vec<String>,
    /// Sources in document order.
    pub sources: Vec<(String, SourceSchema)>,
    required_sources: Vec<String>,
    pub output_type: OutputType,
}

impl OperatorSchema {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        title: Option<String>,
        description: Option<String>,
        help_url: Option<String>,
        params: Vec<(String, ParamSchema)>,
        required_params: Vec<String>,
        sources: Vec<(String, SourceSchema)>,
        required_sources: Vec<String>,
        output_type: OutputType,
    ) -> Self {
        OperatorSchema {
            title: title.unwrap_or_else(|| id.clone()),
            description: description.unwrap_or_else(|| "Workflow Operator".to_string()),
            id,
            help_url,
            params,
            required_params,
            sources,
            required_sources,
            output_type,
        }
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn is_param_required(&self, name: &str) -> bool {
        self.required_params.iter().any(|p| p == name)
    }

    pub fn source(&self, name: &str) -> Option<&SourceSchema> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn is_source_required(&self, name: &str) -> bool {
        self.required_sources.iter().any(|s| s == name)
    }

    pub fn has_dynamic_output(&self) -> bool {
        self.output_type == OutputType::CopyFromSource
    }

    /// Pin type the output carries before any connection is made: the static
    /// type, or the single source's type for copy-from-source operators.
    pub fn output_type_on_start(&self) -> PinType {
        match &self.output_type {
            OutputType::Static(pin) => pin.clone(),
            OutputType::CopyFromSource => self
                .sources
                .first()
                .map(|(_, s)| s.pin_type.clone())
                .unwrap_or_else(|| PinType::new(WILDCARD_PIN_TYPE)),
        }
    }
}
