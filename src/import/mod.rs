//! Graph importer: reconstructs block instances and wiring from a persisted
//! workflow document, the compiler's dual.
//!
//! The walk is depth-first over the operator tree. Param values are assigned
//! directly, bypassing the param-editor round trip; array-valued sources get
//! an array builder materialized underneath them. Every created node and
//! edge is recorded into an auxiliary [`LayoutGraph`](layout::LayoutGraph)
//! and positioned by the layout engine afterwards.
//!
//! The caller ([`WorkflowEditor::import`](crate::editor::WorkflowEditor::import))
//! holds the session in `Importing` for the duration, which suppresses the
//! retype cascade while edges are reconstructed one by one.

pub mod layout;

use crate::error::ImportError;
use crate::graph::{
    ARRAY_BUILDER_INPUT_NAME, EditorGraph, NodeGroup, NodeId, WORKFLOW_OUT_INPUT_NAME,
};
use crate::registry::Registry;
use crate::schema::workflow::{SourceValue, Workflow, WorkflowOperator};
use layout::{LayoutEngine, LayoutGraph};

/// Materialize `workflow` into the graph.
///
/// Without a template name the graph is cleared first and a terminal output
/// block is created; in template mode the new nodes are added next to the
/// existing ones and wrapped in a named group sized to the layout bounds.
pub fn import_document(
    graph: &mut EditorGraph,
    registry: &Registry,
    engine: &dyn LayoutEngine,
    workflow: &Workflow,
    template_name: Option<&str>,
) -> Result<(), ImportError> {
    tracing::debug!(template = ?template_name, "importing workflow");

    let mut aux = LayoutGraph::new();

    let parent = if template_name.is_none() {
        graph.clear();
        let out = graph.add_workflow_out();
        let size = graph.node(out).map(|n| n.size()).unwrap_or_default();
        aux.add_node(out, size.0, size.1);
        Some((out, WORKFLOW_OUT_INPUT_NAME))
    } else {
        None
    };

    add_operator(graph, registry, &mut aux, &workflow.operator, parent)?;

    engine.layout(&mut aux);
    apply_positions(graph, &aux);

    if let Some(name) = template_name {
        graph.add_group(NodeGroup {
            title: name.to_string(),
            pos: (0.0, 0.0),
            size: (aux.width, aux.height),
        });
    }
    Ok(())
}

fn add_operator(
    graph: &mut EditorGraph,
    registry: &Registry,
    aux: &mut LayoutGraph,
    operator: &WorkflowOperator,
    parent: Option<(NodeId, &str)>,
) -> Result<NodeId, ImportError> {
    let def = registry
        .block_for_operator(&operator.operator)
        .ok_or_else(|| ImportError::UnknownOperator(operator.operator.clone()))?
        .clone();

    let id = graph.add_operator_block(&def);
    if let Some(node) = graph.node_mut(id) {
        node.param_values = operator.params.clone();
    }
    let size = graph.node(id).map(|n| n.size()).unwrap_or_default();
    aux.add_node(id, size.0, size.1);

    if let Some((parent_id, input)) = parent {
        graph.connect(id, parent_id, input)?;
        aux.add_edge(id, parent_id);
    }

    let Some(sources) = &operator.sources else {
        return Ok(id);
    };
    for (source_name, value) in sources {
        let source = SourceValue::from_value(value).map_err(|e| {
            ImportError::MalformedDocument(format!("source '{source_name}': {e}"))
        })?;
        match source {
            SourceValue::One(child) => {
                add_operator(graph, registry, aux, &child, Some((id, source_name.as_str())))?;
            }
            SourceValue::Many(children) => {
                let builder = graph.add_array_builder();
                let size = graph.node(builder).map(|n| n.size()).unwrap_or_default();
                aux.add_node(builder, size.0, size.1);
                graph.connect(builder, id, source_name)?;
                aux.add_edge(builder, id);

                for child in &children {
                    add_operator(
                        graph,
                        registry,
                        aux,
                        child,
                        Some((builder, ARRAY_BUILDER_INPUT_NAME)),
                    )?;
                }
            }
        }
    }
    Ok(id)
}

fn apply_positions(graph: &mut EditorGraph, aux: &LayoutGraph) {
    for laid_out in aux.nodes() {
        if let Some(node) = graph.node_mut(laid_out.id) {
            node.pos = (laid_out.x, laid_out.y);
        }
    }
}
