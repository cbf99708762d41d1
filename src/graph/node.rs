//! Live canvas nodes: operator blocks plus the two companion block types
//! (array builder, workflow out).

use std::sync::Arc;

use serde_json::Value;

use crate::factory::{ARRAY_BUILDER_BLOCK_TYPE, BlockDefinition, WORKFLOW_OUT_BLOCK_TYPE};
use crate::schema::model::{ARRAY_PIN_TYPE, PinType, WILDCARD_PIN_TYPE};
use crate::schema::workflow::WorkflowOperator;

pub type NodeId = u64;
pub type LinkId = u64;

pub const ARRAY_BUILDER_TITLE: &str = "Array Builder";
pub const WORKFLOW_OUT_TITLE: &str = "Workflow Out";
pub const WORKFLOW_OUT_INPUT_NAME: &str = "in";
pub const ARRAY_BUILDER_INPUT_NAME: &str = "item";

const NODE_WIDTH: f64 = 160.0;
const NODE_SLOT_HEIGHT: f64 = 20.0;
const NODE_WIDGET_HEIGHT: f64 = 20.0;
const NODE_TITLE_HEIGHT: f64 = 30.0;
const INFO_LINE_HEIGHT: f64 = 12.0;
const MARGIN: f64 = 6.0;

/// What a node's output pin currently carries.
#[derive(Debug, Clone, PartialEq)]
pub enum PinData {
    Operator(WorkflowOperator),
    /// Array builder output: the present element documents plus the distinct
    /// set of their declared pin types.
    Array {
        items: Vec<WorkflowOperator>,
        combined_types: PinType,
    },
}

#[derive(Debug, Clone)]
pub struct InputPin {
    pub name: String,
    pub pin_type: PinType,
    /// Required element type when this pin must be fed by an array builder.
    pub inner_type: Option<PinType>,
    pub link: Option<LinkId>,
}

#[derive(Debug, Clone)]
pub struct OutputPin {
    pub name: String,
    pub pin_type: PinType,
    pub data: Option<PinData>,
    pub links: Vec<LinkId>,
}

#[derive(Debug, Clone)]
pub enum BlockKind {
    Operator(Arc<BlockDefinition>),
    /// Tracks the distinct element types seen during the last pass.
    ArrayBuilder { combined_types: PinType },
    WorkflowOut,
}

/// One live canvas node.
#[derive(Debug, Clone)]
pub struct BlockInstance {
    pub id: NodeId,
    pub kind: BlockKind,
    pub inputs: Vec<InputPin>,
    pub output: OutputPin,
    pub param_values: serde_json::Map<String, Value>,
    pub has_errors: bool,
    pub pos: (f64, f64),
}

impl BlockInstance {
    pub(crate) fn operator(id: NodeId, def: &Arc<BlockDefinition>) -> Self {
        let inputs = def
            .inputs
            .iter()
            .map(|decl| InputPin {
                name: decl.name.clone(),
                pin_type: decl.pin_type.clone(),
                inner_type: decl.inner_type.clone(),
                link: None,
            })
            .collect();
        BlockInstance {
            id,
            inputs,
            output: OutputPin {
                name: "out".into(),
                pin_type: def.output_on_start.clone(),
                data: None,
                links: Vec::new(),
            },
            kind: BlockKind::Operator(Arc::clone(def)),
            param_values: serde_json::Map::new(),
            has_errors: false,
            pos: (0.0, 0.0),
        }
    }

    pub(crate) fn array_builder(id: NodeId) -> Self {
        BlockInstance {
            id,
            inputs: vec![InputPin {
                name: ARRAY_BUILDER_INPUT_NAME.into(),
                pin_type: PinType::new(WILDCARD_PIN_TYPE),
                inner_type: None,
                link: None,
            }],
            output: OutputPin {
                name: "arr".into(),
                pin_type: PinType::new(ARRAY_PIN_TYPE),
                data: None,
                links: Vec::new(),
            },
            kind: BlockKind::ArrayBuilder {
                combined_types: PinType::new(""),
            },
            param_values: serde_json::Map::new(),
            has_errors: false,
            pos: (0.0, 0.0),
        }
    }

    pub(crate) fn workflow_out(id: NodeId) -> Self {
        BlockInstance {
            id,
            inputs: vec![InputPin {
                name: WORKFLOW_OUT_INPUT_NAME.into(),
                pin_type: PinType::new("raster,vector,plot"),
                inner_type: None,
                link: None,
            }],
            output: OutputPin {
                name: "out".into(),
                pin_type: PinType::new(""),
                data: None,
                links: Vec::new(),
            },
            kind: BlockKind::WorkflowOut,
            param_values: serde_json::Map::new(),
            has_errors: false,
            pos: (0.0, 0.0),
        }
    }

    pub fn title(&self) -> &str {
        match &self.kind {
            BlockKind::Operator(def) => &def.operator.title,
            BlockKind::ArrayBuilder { .. } => ARRAY_BUILDER_TITLE,
            BlockKind::WorkflowOut => WORKFLOW_OUT_TITLE,
        }
    }

    pub fn block_type(&self) -> &str {
        match &self.kind {
            BlockKind::Operator(def) => &def.block_type,
            BlockKind::ArrayBuilder { .. } => ARRAY_BUILDER_BLOCK_TYPE,
            BlockKind::WorkflowOut => WORKFLOW_OUT_BLOCK_TYPE,
        }
    }

    pub fn definition(&self) -> Option<&Arc<BlockDefinition>> {
        match &self.kind {
            BlockKind::Operator(def) => Some(def),
            _ => None,
        }
    }

    pub fn is_workflow_out(&self) -> bool {
        matches!(self.kind, BlockKind::WorkflowOut)
    }

    pub fn is_array_builder(&self) -> bool {
        matches!(self.kind, BlockKind::ArrayBuilder { .. })
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|pin| pin.name == name)
    }

    /// Canvas footprint, derived the same way the original node renderer
    /// sizes blocks: slot rows, the params widget, and one info line per
    /// param value.
    pub fn size(&self) -> (f64, f64) {
        let rows = self.inputs.len().max(1) as f64;
        let mut height = NODE_TITLE_HEIGHT + rows * NODE_SLOT_HEIGHT;

        if let BlockKind::Operator(def) = &self.kind
            && def.has_params
        {
            height += 2.0 * NODE_WIDGET_HEIGHT;
            height += def.operator.params.len() as f64 * INFO_LINE_HEIGHT;
        }
        (NODE_WIDTH, height + MARGIN)
    }
}
