//! Operator block factory: turns one [`OperatorSchema`] into the block
//! definition the canvas engine instantiates.
//!
//! Each source becomes one input pin (scalar, union, or array with a
//! remembered inner type). Exactly one output pin is added: statically
//! typed, or — for copy-from-source operators — typed to the single
//! source's pin type until a connection retargets it (see
//! [`crate::graph::EditorGraph::connect`]).

use std::sync::Arc;

use crate::schema::model::{OperatorSchema, PinType};

/// Category prefix of all registered block types.
pub const OPERATOR_CATEGORY: &str = "geoflow";

/// Block type id of the terminal output block.
pub const WORKFLOW_OUT_BLOCK_TYPE: &str = "geoflow/workflowout";

/// Block type id of the array builder block.
pub const ARRAY_BUILDER_BLOCK_TYPE: &str = "geoflow/arraybuilder";

/// Canvas block type id for an operator ("geoflow/GdalSource").
pub fn block_type_id(operator_id: &str) -> String {
    format!("{OPERATOR_CATEGORY}/{operator_id}")
}

/// One declared input pin.
#[derive(Debug, Clone)]
pub struct InputDecl {
    pub name: String,
    pub pin_type: PinType,
    /// Required element type when the pin must be fed by an array builder.
    pub inner_type: Option<PinType>,
}

/// Synthesized graph-node block definition for one operator.
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    pub block_type: String,
    pub operator: Arc<OperatorSchema>,
    pub inputs: Vec<InputDecl>,
    /// Output pin type at construction time.
    pub output_on_start: PinType,
    /// Whether the output pin retypes to follow its connected source.
    pub dynamic_output: bool,
    /// Whether the block exposes the parameter-editor affordance.
    pub has_params: bool,
}

/// Build the block definition for one operator schema.
pub fn build(schema: &Arc<OperatorSchema>) -> BlockDefinition {
    let inputs = schema
        .sources
        .iter()
        .map(|(name, source)| InputDecl {
            name: name.clone(),
            pin_type: source.pin_type.clone(),
            inner_type: source.inner_type.clone(),
        })
        .collect();

    BlockDefinition {
        block_type: block_type_id(&schema.id),
        output_on_start: schema.output_type_on_start(),
        dynamic_output: schema.has_dynamic_output(),
        has_params: schema.has_params(),
        inputs,
        operator: Arc::clone(schema),
    }
}
