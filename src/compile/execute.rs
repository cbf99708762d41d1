//! Per-node execute contract.
//!
//! Execution is split into three phases so that nodes of one rank can await
//! their semantic validations concurrently: a synchronous planning phase
//! reading the graph, the async semantic phase, and a synchronous apply
//! phase writing output data and error flags back.

use serde_json::Value;

use crate::graph::{
    ARRAY_BUILDER_TITLE, BlockKind, EditorGraph, NodeId, PinData, WORKFLOW_OUT_TITLE,
};
use crate::schema::model::PinType;
use crate::schema::workflow::{ResultKind, Workflow, WorkflowOperator};
use crate::validate::ValidationSummary;

/// Outcome of the planning phase for one node.
#[derive(Debug)]
pub(crate) enum NodePlan {
    Operator {
        node: NodeId,
        title: String,
        candidate: WorkflowOperator,
        errors: Vec<String>,
    },
    Array {
        node: NodeId,
        items: Vec<WorkflowOperator>,
        combined_types: PinType,
    },
    Out {
        node: NodeId,
        workflow: Option<Workflow>,
        errors: Vec<String>,
    },
}

impl NodePlan {
    /// The candidate to hand to the semantic validator, present only when
    /// the node passed all structural checks.
    pub(crate) fn semantic_candidate(&self) -> Option<&WorkflowOperator> {
        match self {
            NodePlan::Operator {
                candidate, errors, ..
            } if errors.is_empty() => Some(candidate),
            _ => None,
        }
    }

    pub(crate) fn push_error(&mut self, message: String) {
        match self {
            NodePlan::Operator { errors, .. } | NodePlan::Out { errors, .. } => {
                errors.push(message);
            }
            NodePlan::Array { .. } => {}
        }
    }
}

pub(crate) fn plan_node(graph: &EditorGraph, id: NodeId) -> Option<NodePlan> {
    let node = graph.node(id)?;
    match &node.kind {
        BlockKind::Operator(_) => Some(plan_operator(graph, id)),
        BlockKind::ArrayBuilder { .. } => Some(plan_array_builder(graph, id)),
        BlockKind::WorkflowOut => Some(plan_workflow_out(graph, id)),
    }
}

fn plan_operator(graph: &EditorGraph, id: NodeId) -> NodePlan {
    let node = graph.node(id).expect("caller resolved the node");
    let def = node
        .definition()
        .expect("operator plans are made for operator blocks")
        .clone();

    let mut errors = Vec::new();
    let mut candidate = WorkflowOperator {
        operator: def.operator.id.clone(),
        params: node.param_values.clone(),
        sources: None,
    };

    if node.param_values.is_empty() && def.has_params {
        errors.push("The configuration parameters have not been provided.".to_string());
    }

    if !def.inputs.is_empty() {
        let mut sources = serde_json::Map::new();

        for (slot, decl) in def.inputs.iter().enumerate() {
            let data = graph.input_data(id, slot);
            match data {
                Some(PinData::Operator(op)) => {
                    sources.insert(
                        decl.name.clone(),
                        serde_json::to_value(op).expect("operator documents serialize to json"),
                    );
                }
                Some(PinData::Array { items, .. }) => {
                    let elements = items
                        .iter()
                        .map(|item| {
                            serde_json::to_value(item)
                                .expect("operator documents serialize to json")
                        })
                        .collect();
                    sources.insert(decl.name.clone(), Value::Array(elements));
                }
                None => {}
            }

            if data.is_none() && def.operator.is_source_required(&decl.name) {
                errors.push(format!(
                    "The source \"{}\" expects data, but none has arrived.",
                    decl.name
                ));
            }

            if let Some(inner) = &decl.inner_type {
                check_array_source(graph, id, slot, &decl.name, inner, &mut errors);
            }
        }

        candidate.sources = Some(sources);
    }

    NodePlan::Operator {
        node: id,
        title: node.title().to_string(),
        candidate,
        errors,
    }
}

/// An array-typed source must be fed by an array builder whose element types
/// are homogeneous and match the declared inner type. Empty and mismatched
/// arrays are distinct failures.
fn check_array_source(
    graph: &EditorGraph,
    id: NodeId,
    slot: usize,
    source_name: &str,
    inner: &PinType,
    errors: &mut Vec<String>,
) {
    let producer = graph.input_source(id, slot).and_then(|p| graph.node(p));
    let Some(producer) = producer else {
        // Covered by the required-source check when the pin is required.
        return;
    };
    let BlockKind::ArrayBuilder { combined_types } = &producer.kind else {
        errors.push(format!(
            "The source \"{source_name}\" expects an array of {inner} datasets built with an {ARRAY_BUILDER_TITLE} block.",
        ));
        return;
    };
    if combined_types.is_empty() {
        errors.push(format!(
            "The source \"{source_name}\" expects an array of {inner} datasets, but the array is empty.",
        ));
    } else if combined_types != inner {
        errors.push(format!(
            "The source \"{source_name}\" expects an array of {inner} datasets, but it contains {combined_types}.",
        ));
    }
}

/// Aggregate the present values of all connected inputs, skipping
/// unconnected and data-less slots, and track the distinct set of their
/// declared pin types.
fn plan_array_builder(graph: &EditorGraph, id: NodeId) -> NodePlan {
    let node = graph.node(id).expect("caller resolved the node");

    let mut items = Vec::new();
    let mut types: Vec<&str> = Vec::new();
    for slot in 0..node.inputs.len() {
        let Some(source) = graph.input_source(id, slot).and_then(|s| graph.node(s)) else {
            continue;
        };
        if let Some(PinData::Operator(op)) = &source.output.data {
            items.push(op.clone());
            types.push(source.output.pin_type.as_str());
        }
    }

    NodePlan::Array {
        node: id,
        combined_types: PinType::join_distinct(types),
        items,
    }
}

fn plan_workflow_out(graph: &EditorGraph, id: NodeId) -> NodePlan {
    let node = graph.node(id).expect("caller resolved the node");
    let mut errors = Vec::new();
    let mut workflow = None;

    match graph.input_data(id, 0) {
        Some(PinData::Operator(op)) => {
            let producer_type = graph
                .input_source(id, 0)
                .and_then(|p| graph.node(p))
                .map(|p| p.output.pin_type.clone());
            match producer_type.as_ref().and_then(ResultKind::from_pin_type) {
                Some(result_kind) => {
                    workflow = Some(Workflow {
                        result_kind,
                        operator: op.clone(),
                    });
                }
                None => errors.push(
                    "The result type of the connected operator could not be determined."
                        .to_string(),
                ),
            }
        }
        Some(PinData::Array { .. }) => {
            errors.push("An array cannot be exported as a workflow.".to_string());
        }
        None => {
            if node.inputs[0].link.is_some() {
                errors.push(
                    "No dataset has arrived. Check the connected operator for errors."
                        .to_string(),
                );
            } else {
                errors.push(
                    "No dataset has arrived. Connect this block to an operator, \
                     for example \"GdalSource\"."
                        .to_string(),
                );
            }
        }
    }

    NodePlan::Out {
        node: id,
        workflow,
        errors,
    }
}

/// Write a plan's outcome back into the graph and the summary.
pub(crate) fn apply_plan(graph: &mut EditorGraph, plan: NodePlan, summary: &mut ValidationSummary) {
    match plan {
        NodePlan::Operator {
            node,
            title,
            candidate,
            errors,
        } => {
            let valid = errors.is_empty();
            for message in errors {
                summary.add_error(&title, message);
            }
            if let Some(node) = graph.node_mut(node) {
                node.has_errors = !valid;
                node.output.data = valid.then_some(PinData::Operator(candidate));
            }
        }
        NodePlan::Array {
            node,
            items,
            combined_types,
        } => {
            if let Some(node) = graph.node_mut(node) {
                node.output.data = Some(PinData::Array {
                    items,
                    combined_types: combined_types.clone(),
                });
                if let BlockKind::ArrayBuilder { combined_types: slot } = &mut node.kind {
                    *slot = combined_types;
                }
            }
        }
        NodePlan::Out {
            node,
            workflow,
            errors,
        } => {
            let valid = workflow.is_some();
            if valid {
                graph.output = workflow;
            }
            if let Some(node) = graph.node_mut(node) {
                node.has_errors = !valid;
                for message in errors {
                    summary.add_error(WORKFLOW_OUT_TITLE, message);
                }
            }
        }
    }
}
