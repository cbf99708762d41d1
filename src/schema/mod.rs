//! Schema model: parses the backend's operator-type schema into a typed,
//! queryable representation.
//!
//! Every entry of the document is either an operator definition or a
//! datatype definition. Datatype definitions double as the output-type
//! cross-reference: an operator produces the pin type of the first datatype
//! definition that lists it, unless the operator embeds a literal output
//! type (or the `copyFromSource` marker) directly.

pub mod meta;
pub mod model;
pub mod raw;
pub mod workflow;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;
use model::{OperatorSchema, OutputType, ParamSchema, PinType, SourceSchema};
use raw::{RawDatatypeDefinition, RawOperatorDefinition, RawSchemaDocument, RawSource};

/// Output-type marker for operators whose output pin follows their source.
pub const COPY_FROM_SOURCE: &str = "copyFromSource";

/// Parse a raw schema document into operator schemas, in document order.
pub fn parse(document: &Value) -> Result<Vec<Arc<OperatorSchema>>, SchemaError> {
    let doc: RawSchemaDocument = serde_json::from_value(document.clone())
        .map_err(|e| SchemaError::malformed("definitions", e.to_string()))?;

    let mut operators: Vec<(String, RawOperatorDefinition)> = Vec::new();
    let mut datatypes: Vec<(String, RawDatatypeDefinition)> = Vec::new();

    for (key, value) in &doc.definitions {
        if value.get("oneOf").is_some() {
            let datatype: RawDatatypeDefinition = serde_json::from_value(value.clone())
                .map_err(|e| SchemaError::malformed(key, e.to_string()))?;
            datatypes.push((key.clone(), datatype));
        } else {
            let operator: RawOperatorDefinition = serde_json::from_value(value.clone())
                .map_err(|e| SchemaError::malformed(key, e.to_string()))?;
            if operator.properties.type_field.variants.len() != 1 {
                return Err(SchemaError::malformed(
                    key,
                    "properties.type.enum must contain exactly the operator id",
                ));
            }
            operators.push((key.clone(), operator));
        }
    }

    // First datatype definition listing an operator wins.
    let mut produced_by: HashMap<&str, &str> = HashMap::new();
    for (datatype_name, datatype) in &datatypes {
        for reference in &datatype.one_of {
            produced_by
                .entry(reference.definition_name())
                .or_insert(datatype_name.as_str());
        }
    }

    operators
        .iter()
        .map(|(key, operator)| build_operator(key, operator, &produced_by).map(Arc::new))
        .collect()
}

fn build_operator(
    key: &str,
    raw: &RawOperatorDefinition,
    produced_by: &HashMap<&str, &str>,
) -> Result<OperatorSchema, SchemaError> {
    let id = raw.properties.type_field.variants[0].clone();

    let params = raw
        .properties
        .params
        .properties
        .iter()
        .map(|(name, schema)| {
            let format = schema
                .get("format")
                .and_then(Value::as_str)
                .map(String::from);
            (
                name.clone(),
                ParamSchema {
                    format,
                    schema: schema.clone(),
                },
            )
        })
        .collect();

    let mut sources = Vec::new();
    let mut required_sources = Vec::new();
    if let Some(raw_sources) = &raw.properties.sources {
        for (name, value) in &raw_sources.properties {
            let source: RawSource = serde_json::from_value(value.clone())
                .map_err(|e| SchemaError::malformed(key, format!("source '{name}': {e}")))?;
            sources.push((name.clone(), resolve_source(&source)));
        }
        required_sources = raw_sources.required.clone();
    }

    let output_type = resolve_output_type(key, raw, &sources, produced_by)?;

    let help_url = raw
        .links
        .iter()
        .find(|link| link.rel == "external help")
        .map(|link| link.href.clone());

    Ok(OperatorSchema::new(
        id,
        raw.title.clone(),
        raw.description.clone(),
        help_url,
        params,
        raw.properties.params.required.clone(),
        sources,
        required_sources,
        output_type,
    ))
}

fn resolve_source(source: &RawSource) -> SourceSchema {
    match source {
        RawSource::Ref(reference) => SourceSchema {
            pin_type: PinType::new(reference.definition_name()),
            inner_type: None,
        },
        RawSource::Array { items } => SourceSchema {
            pin_type: PinType::new(model::ARRAY_PIN_TYPE),
            inner_type: Some(PinType::new(items.definition_name())),
        },
        RawSource::Union { any_of } => SourceSchema {
            pin_type: PinType::join_distinct(any_of.iter().map(|r| r.definition_name())),
            inner_type: None,
        },
    }
}

fn resolve_output_type(
    key: &str,
    raw: &RawOperatorDefinition,
    sources: &[(String, SourceSchema)],
    produced_by: &HashMap<&str, &str>,
) -> Result<OutputType, SchemaError> {
    let output_type = match raw.output_type.as_deref() {
        Some(COPY_FROM_SOURCE) => OutputType::CopyFromSource,
        Some(literal) => OutputType::Static(PinType::new(literal)),
        None => match produced_by.get(key) {
            Some(datatype) => OutputType::Static(PinType::new(*datatype)),
            None => {
                return Err(SchemaError::malformed(
                    key,
                    "output type could not be resolved: the operator embeds no \
                     outputType and no datatype definition lists it",
                ));
            }
        },
    };

    if output_type == OutputType::CopyFromSource && sources.len() != 1 {
        return Err(SchemaError::malformed(
            key,
            format!(
                "a copy-from-source operator must have exactly one source, found {}",
                sources.len()
            ),
        ));
    }

    Ok(output_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_document() -> Value {
        json!({
            "definitions": {
                "GdalSource": {
                    "title": "GDAL Source",
                    "properties": {
                        "type": {"enum": ["GdalSource"]},
                        "params": {
                            "properties": {
                                "data": {"type": "string", "format": "raster-dataset-reference"}
                            },
                            "required": ["data"]
                        }
                    }
                },
                "raster": {
                    "oneOf": [{"$ref": "#/definitions/GdalSource"}]
                }
            }
        })
    }

    #[test]
    fn resolves_output_type_from_datatype_definition() {
        let schemas = parse(&minimal_document()).unwrap();
        assert_eq!(schemas.len(), 1);
        let op = &schemas[0];
        assert_eq!(op.id, "GdalSource");
        assert_eq!(op.title, "GDAL Source");
        assert_eq!(op.output_type, OutputType::Static(PinType::new("raster")));
        assert!(op.is_param_required("data"));
        assert_eq!(op.params[0].1.format.as_deref(), Some("raster-dataset-reference"));
    }

    #[test]
    fn malformed_definition_names_the_offending_key() {
        let doc = json!({
            "definitions": {
                "Broken": {"properties": {"params": {}}}
            }
        });
        let err = parse(&doc).unwrap_err();
        match err {
            SchemaError::MalformedDefinition { key, .. } => assert_eq!(key, "Broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn copy_from_source_requires_exactly_one_source() {
        let doc = json!({
            "definitions": {
                "Reprojection": {
                    "outputType": "copyFromSource",
                    "properties": {
                        "type": {"enum": ["Reprojection"]},
                        "params": {},
                        "sources": {
                            "properties": {
                                "a": {"$ref": "#/definitions/raster"},
                                "b": {"$ref": "#/definitions/raster"}
                            },
                            "required": ["a", "b"]
                        }
                    }
                }
            }
        });
        assert!(matches!(
            parse(&doc),
            Err(SchemaError::MalformedDefinition { .. })
        ));
    }

    #[test]
    fn union_and_array_sources_resolve() {
        let doc = json!({
            "definitions": {
                "Stacker": {
                    "outputType": "raster",
                    "properties": {
                        "type": {"enum": ["Stacker"]},
                        "params": {},
                        "sources": {
                            "properties": {
                                "rasters": {"items": {"$ref": "#/definitions/raster"}},
                                "extra": {"anyOf": [
                                    {"$ref": "#/definitions/raster"},
                                    {"$ref": "#/definitions/vector"}
                                ]}
                            },
                            "required": ["rasters"]
                        }
                    }
                }
            }
        });
        let schemas = parse(&doc).unwrap();
        let op = &schemas[0];
        let rasters = op.source("rasters").unwrap();
        assert!(rasters.is_array());
        assert_eq!(rasters.inner_type, Some(PinType::new("raster")));
        let extra = op.source("extra").unwrap();
        assert_eq!(extra.pin_type, PinType::new("raster,vector"));
    }
}
