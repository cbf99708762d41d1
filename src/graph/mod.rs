//! The live editor graph the compiler walks.
//!
//! The structure is cyclic-capable — links may form loops at the data level —
//! but the compiler's dependency-order walk rejects cycles explicitly
//! (see [`crate::compile::ranks`]). Connection-time rules implemented here:
//! pin-type compatibility, array-builder slot growth, and the dynamic-output
//! retype cascade (suppressed while an import or export holds the session).

pub mod node;
pub mod session;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::GraphError;
use crate::factory::BlockDefinition;
use crate::schema::model::{ARRAY_PIN_TYPE, PinType, WILDCARD_PIN_TYPE};
use crate::schema::workflow::Workflow;

pub use node::{
    ARRAY_BUILDER_INPUT_NAME, ARRAY_BUILDER_TITLE, BlockInstance, BlockKind, InputPin, LinkId,
    NodeId, OutputPin, PinData, WORKFLOW_OUT_INPUT_NAME, WORKFLOW_OUT_TITLE,
};
pub use session::{SessionFlag, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub to_slot: usize,
}

/// A named visual group around a set of nodes (template import).
#[derive(Debug, Clone)]
pub struct NodeGroup {
    pub title: String,
    pub pos: (f64, f64),
    pub size: (f64, f64),
}

#[derive(Debug, Default)]
pub struct EditorGraph {
    nodes: BTreeMap<NodeId, BlockInstance>,
    links: BTreeMap<LinkId, Link>,
    groups: Vec<NodeGroup>,
    next_node_id: NodeId,
    next_link_id: LinkId,
    pub session: SessionFlag,
    /// Graph-wide output slot, set by the compiler on a successful export.
    pub output: Option<Workflow>,
}

impl EditorGraph {
    pub fn new() -> Self {
        EditorGraph::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&BlockInstance> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut BlockInstance> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BlockInstance> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn groups(&self) -> &[NodeGroup] {
        &self.groups
    }

    pub fn workflow_out_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_workflow_out()).count()
    }

    /// Remove all nodes, links and groups. The session state and output slot
    /// are left alone; an import clears the graph while holding the session.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.groups.clear();
    }

    pub fn add_operator_block(&mut self, def: &Arc<BlockDefinition>) -> NodeId {
        let id = self.fresh_node_id();
        self.nodes.insert(id, BlockInstance::operator(id, def));
        id
    }

    pub fn add_array_builder(&mut self) -> NodeId {
        let id = self.fresh_node_id();
        self.nodes.insert(id, BlockInstance::array_builder(id));
        id
    }

    /// Add a terminal output block. The compiler enforces that exactly one
    /// exists at export time; the graph itself does not forbid duplicates
    /// (a template import next to an existing terminal can produce them).
    pub fn add_workflow_out(&mut self) -> NodeId {
        let id = self.fresh_node_id();
        self.nodes.insert(id, BlockInstance::workflow_out(id));
        id
    }

    pub fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        let mut stale: Vec<LinkId> = node.output.links.clone();
        stale.extend(node.inputs.iter().filter_map(|pin| pin.link));
        for link_id in stale {
            self.remove_link(link_id);
        }
    }

    /// Remove every live instance of the given block types (registry rebuild
    /// after a backend change).
    pub fn remove_nodes_of_types(&mut self, block_types: &[String]) {
        let doomed: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| block_types.iter().any(|t| t == n.block_type()))
            .map(|n| n.id)
            .collect();
        for id in doomed {
            self.remove_node(id);
        }
    }

    /// Wire `from`'s output to the named input of `to`.
    ///
    /// An occupied input is re-wired (the old link is dropped). Array
    /// builders ignore the input name and grow a fresh slot when all are
    /// taken. Connecting a new upstream type to a copy-from-source block
    /// retypes its output and severs all downstream links; the severing is
    /// skipped while a bulk import or export holds the session.
    pub fn connect(&mut self, from: NodeId, to: NodeId, input: &str) -> Result<LinkId, GraphError> {
        let source_type = self
            .nodes
            .get(&from)
            .ok_or(GraphError::UnknownNode(from))?
            .output
            .pin_type
            .clone();

        let (is_builder, named_slot) = {
            let target = self.nodes.get(&to).ok_or(GraphError::UnknownNode(to))?;
            (target.is_array_builder(), target.input_index(input))
        };
        let slot = if is_builder {
            self.array_builder_slot(to)
        } else {
            named_slot.ok_or_else(|| GraphError::NoSuchInput {
                node: to,
                input: input.to_string(),
            })?
        };

        let target = &self.nodes[&to];
        let pin = &target.inputs[slot];
        if !pin.pin_type.accepts(&source_type) && !is_array_feed(pin, &source_type) {
            return Err(GraphError::IncompatiblePins {
                output: source_type.to_string(),
                input: pin.name.clone(),
                input_type: pin.pin_type.to_string(),
            });
        }

        if let Some(old) = target.inputs[slot].link {
            self.remove_link(old);
        }

        let link_id = self.fresh_link_id();
        self.links.insert(
            link_id,
            Link {
                id: link_id,
                from,
                to,
                to_slot: slot,
            },
        );
        if let Some(node) = self.nodes.get_mut(&from) {
            node.output.links.push(link_id);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.inputs[slot].link = Some(link_id);
        }

        // While a bulk import holds the session the retype still happens —
        // reconstructed graphs must end up correctly typed — but without the
        // downstream disconnect cascade, which would sever links the import
        // just created.
        let cascade = self.session.is_idle();
        self.retype_dynamic_output(to, &source_type, cascade);

        Ok(link_id)
    }

    /// Sever all links leaving a node's output pin.
    pub fn disconnect_output(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        for link_id in node.output.links.clone() {
            self.remove_link(link_id);
        }
    }

    pub fn remove_link(&mut self, id: LinkId) {
        let Some(link) = self.links.remove(&id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&link.from) {
            node.output.links.retain(|l| *l != id);
        }
        if let Some(node) = self.nodes.get_mut(&link.to)
            && let Some(pin) = node.inputs.get_mut(link.to_slot)
        {
            pin.link = None;
        }
    }

    /// Node feeding the given input slot, if connected.
    pub fn input_source(&self, node: NodeId, slot: usize) -> Option<NodeId> {
        let link_id = self.nodes.get(&node)?.inputs.get(slot)?.link?;
        self.links.get(&link_id).map(|l| l.from)
    }

    /// Data currently arriving at the given input slot.
    pub fn input_data(&self, node: NodeId, slot: usize) -> Option<&PinData> {
        let source = self.input_source(node, slot)?;
        self.nodes.get(&source)?.output.data.as_ref()
    }

    pub fn add_group(&mut self, group: NodeGroup) {
        self.groups.push(group);
    }

    fn fresh_node_id(&mut self) -> NodeId {
        self.next_node_id += 1;
        self.next_node_id
    }

    fn fresh_link_id(&mut self) -> LinkId {
        self.next_link_id += 1;
        self.next_link_id
    }

    /// First free array-builder slot; a new one is appended when the last
    /// free slot is about to be taken, so there is always a spare.
    fn array_builder_slot(&mut self, id: NodeId) -> usize {
        let node = self
            .nodes
            .get_mut(&id)
            .filter(|n| n.is_array_builder())
            .expect("caller checked the node is an array builder");
        let slot = match node.inputs.iter().position(|pin| pin.link.is_none()) {
            Some(free) => free,
            None => {
                node.inputs.push(spare_item_input());
                node.inputs.len() - 1
            }
        };
        if slot == node.inputs.len() - 1 {
            node.inputs.push(spare_item_input());
        }
        slot
    }

    fn retype_dynamic_output(&mut self, id: NodeId, new_type: &PinType, cascade: bool) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let dynamic = node
            .definition()
            .map(|def| def.dynamic_output)
            .unwrap_or(false);
        if !dynamic || node.output.pin_type == *new_type {
            return;
        }
        if cascade {
            self.disconnect_output(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.output.pin_type = new_type.clone();
        }
    }
}

/// An array-typed input is fed by an array builder's `array` output.
fn is_array_feed(pin: &InputPin, source_type: &PinType) -> bool {
    pin.inner_type.is_some() && source_type.as_str() == ARRAY_PIN_TYPE
}

fn spare_item_input() -> InputPin {
    InputPin {
        name: ARRAY_BUILDER_INPUT_NAME.into(),
        pin_type: PinType::new(WILDCARD_PIN_TYPE),
        inner_type: None,
        link: None,
    }
}
