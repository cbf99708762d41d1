//! Graph compiler: executes the live node graph in dependency order and
//! collects the per-node documents bottom-up into one root workflow
//! document.
//!
//! Node-level failures never abort the pass — every node still executes and
//! every reachable error lands in the summary, so the user sees all
//! problems at once. Only the session guard can stop a pass, by dropping
//! the trigger while another export or import is in flight.

pub mod ranks;

mod execute;

use futures::future::join_all;

use crate::backend::BackendApi;
use crate::graph::{EditorGraph, NodeId, SessionState, WORKFLOW_OUT_TITLE};
use crate::host::HostModel;
use crate::schema::workflow::Workflow;
use crate::validate::{GENERAL_GROUP, RuleSet, ValidationSummary};
use execute::{NodePlan, apply_plan, plan_node};

/// Execute the graph and hand the resulting document to the host model.
///
/// Returns the exported workflow, or `None` when validation failed — or when
/// the trigger was dropped because a pass is already in flight. Populates
/// and renders `summary` as a side effect.
pub async fn export(
    graph: &mut EditorGraph,
    backend: &dyn BackendApi,
    rules: &RuleSet,
    host: &mut dyn HostModel,
    summary: &mut ValidationSummary,
) -> Option<Workflow> {
    if !graph.session.try_begin(SessionState::Exporting) {
        tracing::debug!("export trigger dropped, a pass is already in flight");
        return None;
    }
    let workflow = export_inner(graph, backend, rules, host, summary).await;
    graph.session.end();
    workflow
}

async fn export_inner(
    graph: &mut EditorGraph,
    backend: &dyn BackendApi,
    rules: &RuleSet,
    host: &mut dyn HostModel,
    summary: &mut ValidationSummary,
) -> Option<Workflow> {
    summary.reset();
    graph.output = None;

    match ranks::execution_ranks(graph) {
        Ok(ranks) => {
            for rank in ranks {
                run_rank(graph, backend, rules, summary, &rank).await;
            }
        }
        Err(cycle) => {
            summary.add_error(GENERAL_GROUP, cycle.to_string());
        }
    }

    check_output_count(graph, summary);

    host.set_workflow(graph.output.as_ref());
    host.save_changes();
    summary.render();

    tracing::debug!(valid = graph.output.is_some(), "export finished");
    graph.output.clone()
}

/// Execute one dependency rank: plan synchronously, await all semantic
/// validations of the rank together, then apply the outcomes.
async fn run_rank(
    graph: &mut EditorGraph,
    backend: &dyn BackendApi,
    rules: &RuleSet,
    summary: &mut ValidationSummary,
    rank: &[NodeId],
) {
    let mut plans: Vec<NodePlan> = rank.iter().filter_map(|id| plan_node(graph, *id)).collect();

    let validations = plans.iter().enumerate().filter_map(|(index, plan)| {
        plan.semantic_candidate().map(|candidate| async move {
            (index, rules.validate(candidate, backend).await)
        })
    });
    let outcomes = join_all(validations).await;

    for (index, message) in outcomes {
        if let Some(message) = message {
            plans[index].push_error(message);
        }
    }

    for plan in plans {
        apply_plan(graph, plan, summary);
    }
}

/// Exactly one terminal output block must exist for the export to be
/// unambiguous.
fn check_output_count(graph: &mut EditorGraph, summary: &mut ValidationSummary) {
    match graph.workflow_out_count() {
        1 => {}
        0 => {
            summary.add_error(
                GENERAL_GROUP,
                format!(
                    "There must be an output block. Add a {WORKFLOW_OUT_TITLE} block \
                     and connect it to an operator, for example \"GdalSource\"."
                ),
            );
            graph.output = None;
        }
        _ => {
            summary.add_error(
                GENERAL_GROUP,
                format!(
                    "For the result to be unambiguous, there may only be one output \
                     block. Delete the extra {WORKFLOW_OUT_TITLE} blocks."
                ),
            );
            graph.output = None;
        }
    }
}
