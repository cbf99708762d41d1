//! The editor session: one live graph plus everything needed to compile it.
//!
//! Owns the registry, the rule set, the backend handle and the host model.
//! Mutation entry points trigger an export; the session guard drops nested
//! triggers, so a param edit happening as a side effect of an import never
//! starts a second pass.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::backend::BackendApi;
use crate::compile;
use crate::error::{GraphError, SchemaError};
use crate::graph::{EditorGraph, LinkId, NodeId, SessionState};
use crate::host::HostModel;
use crate::import;
use crate::import::layout::{LayeredLayout, LayoutEngine};
use crate::registry::Registry;
use crate::schema;
use crate::schema::model::OperatorSchema;
use crate::schema::workflow::Workflow;
use crate::validate::{RuleSet, ValidationGroup, ValidationSummary};

pub struct WorkflowEditor {
    graph: EditorGraph,
    registry: Registry,
    rules: RuleSet,
    backend: Arc<dyn BackendApi>,
    host: Box<dyn HostModel>,
    layout: Box<dyn LayoutEngine>,
    summary: ValidationSummary,
    /// Parsed operator schemas, cached per backend URL.
    schema_cache: HashMap<String, Arc<Vec<Arc<OperatorSchema>>>>,
}

impl WorkflowEditor {
    /// A fresh session: empty registry, builtin rules, and a graph holding
    /// the single terminal output block.
    pub fn new(backend: Arc<dyn BackendApi>, host: Box<dyn HostModel>) -> Self {
        let mut graph = EditorGraph::new();
        graph.add_workflow_out();

        WorkflowEditor {
            graph,
            registry: Registry::new(),
            rules: RuleSet::with_builtin_rules(),
            backend,
            host,
            layout: Box::new(LayeredLayout::default()),
            summary: ValidationSummary::new(),
            schema_cache: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &EditorGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EditorGraph {
        &mut self.graph
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub fn host(&self) -> &dyn HostModel {
        self.host.as_ref()
    }

    /// Summary groups rendered by the most recent pass.
    pub fn validation_summary(&self) -> &[ValidationGroup] {
        self.summary.last_render()
    }

    /// Fetch and parse the backend's operator schema (memoized per URL),
    /// then rebuild all registrations wholesale. Live instances of block
    /// types that no longer exist are deleted from the graph. On failure the
    /// previous registration stays in place.
    pub async fn connect_backend(
        &mut self,
        backend: Arc<dyn BackendApi>,
        meta_schema_url: Option<&str>,
    ) -> Result<(), SchemaError> {
        let url = backend.server_url().to_string();

        let schemas = match self.schema_cache.get(&url) {
            Some(cached) => Arc::clone(cached),
            None => {
                let document = backend.fetch_operator_schema().await?;
                if let Some(meta_url) = meta_schema_url {
                    schema::meta::ensure_schema_compliant(&document, meta_url).await?;
                }
                let parsed = Arc::new(schema::parse(&document)?);
                self.schema_cache.insert(url, Arc::clone(&parsed));
                parsed
            }
        };

        let removed = self.registry.rebuild(&schemas);
        self.graph.remove_nodes_of_types(&removed);
        self.backend = backend;

        tracing::info!(
            operators = schemas.len(),
            removed = removed.len(),
            "backend connected, registry rebuilt"
        );
        Ok(())
    }

    /// Compile the graph and hand the document to the host model. Dropped
    /// (returns `None`) while another pass is in flight.
    pub async fn export(&mut self) -> Option<Workflow> {
        compile::export(
            &mut self.graph,
            self.backend.as_ref(),
            &self.rules,
            self.host.as_mut(),
            &mut self.summary,
        )
        .await
    }

    /// Reconstruct the graph from a persisted document and re-run the
    /// compiler. With no document, one compiler pass still runs so the
    /// initial output-block validation is surfaced.
    ///
    /// Import errors abort the reconstruction cleanly: they are reported
    /// through the host alert channel, the session guard is released, and
    /// the compiler pass in the tail of this method still runs.
    pub async fn import(&mut self, workflow: Option<&Workflow>, template_name: Option<&str>) {
        if let Some(workflow) = workflow {
            if !self.graph.session.try_begin(SessionState::Importing) {
                tracing::debug!("import trigger dropped, a pass is already in flight");
                return;
            }
            let outcome = import::import_document(
                &mut self.graph,
                &self.registry,
                self.layout.as_ref(),
                workflow,
                template_name,
            );
            self.graph.session.end();

            if let Err(error) = outcome {
                tracing::warn!(%error, "workflow import failed");
                self.host.alert(&format!("The workflow could not be imported: {error}"));
            }
        }
        self.export().await;
    }

    /// Place a registered operator block. Triggers an export.
    pub async fn add_operator_block(&mut self, block_type: &str) -> Result<NodeId, GraphError> {
        let def = self
            .registry
            .block(block_type)
            .ok_or_else(|| GraphError::UnknownBlockType(block_type.to_string()))?
            .clone();
        let id = self.graph.add_operator_block(&def);
        self.export().await;
        Ok(id)
    }

    /// Place an array builder block. Triggers an export.
    pub async fn add_array_builder(&mut self) -> NodeId {
        let id = self.graph.add_array_builder();
        self.export().await;
        id
    }

    /// Wire two blocks. Triggers an export, like any connection change.
    pub async fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        input: &str,
    ) -> Result<LinkId, GraphError> {
        let link = self.graph.connect(from, to, input)?;
        self.export().await;
        Ok(link)
    }

    /// Remove a block. Triggers an export.
    pub async fn remove_node(&mut self, id: NodeId) {
        self.graph.remove_node(id);
        self.export().await;
    }

    /// Assign a block's param values (the param-editor save path). Triggers
    /// an export.
    pub async fn set_param_values(
        &mut self,
        id: NodeId,
        values: serde_json::Map<String, Value>,
    ) -> Result<(), GraphError> {
        let node = self.graph.node_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.param_values = values;
        self.export().await;
        Ok(())
    }

    /// Wipe the graph and restore the single terminal output block.
    pub async fn clear_graph(&mut self) {
        self.graph.clear();
        self.graph.add_workflow_out();
        self.export().await;
    }
}
