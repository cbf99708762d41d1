//! Serde targets for the backend's operator-type schema document.
//!
//! The document is a flat map of named, JSON-Schema-like definitions. Each
//! entry is either an operator definition (identified by its
//! `properties.type.enum` singleton) or a datatype definition (a `oneOf`
//! listing the operators whose outputs satisfy that pin type).

use serde::Deserialize;
use serde_json::Value;

pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// `{"$ref": "#/definitions/..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonSchemaRef {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl JsonSchemaRef {
    /// Name of the referenced definition (`#/definitions/raster` → `raster`).
    pub fn definition_name(&self) -> &str {
        self.reference
            .strip_prefix(DEFINITIONS_PREFIX)
            .unwrap_or(&self.reference)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchemaDocument {
    pub definitions: serde_json::Map<String, Value>,
}

/// One operator entry. The single element of `properties.type.enum` is the
/// operator id.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOperatorDefinition {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<RawLink>,
    /// Literal output pin type embedded by the operator itself, or the
    /// `copyFromSource` marker. Cross-referenced from the datatype
    /// definitions when absent.
    #[serde(rename = "outputType")]
    pub output_type: Option<String>,
    pub properties: RawOperatorProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLink {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOperatorProperties {
    #[serde(rename = "type")]
    pub type_field: RawTypeEnum,
    #[serde(default)]
    pub params: RawParams,
    pub sources: Option<RawSources>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTypeEnum {
    #[serde(rename = "enum")]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParams {
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSources {
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// A datatype entry: this pin type is satisfied by any of the referenced
/// operators' outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatatypeDefinition {
    #[serde(rename = "oneOf")]
    pub one_of: Vec<JsonSchemaRef>,
}

/// Raw source shapes: a scalar `$ref`, an array of one pin type, or a union
/// of pin types.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSource {
    Ref(JsonSchemaRef),
    Array {
        items: JsonSchemaRef,
    },
    Union {
        #[serde(rename = "anyOf")]
        any_of: Vec<JsonSchemaRef>,
    },
}
