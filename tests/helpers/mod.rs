use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use geoflow::backend::types::TypedResultDescriptor;
use geoflow::backend::{BackendApi, DatasetKind};
use geoflow::editor::WorkflowEditor;
use geoflow::error::TransportError;
use geoflow::host::InMemoryHost;
use geoflow::schema::workflow::Workflow;

// =============================================================================
// Stub backend
// =============================================================================

/// In-memory backend: a dataset catalog plus one canned metadata response.
pub struct StubBackend {
    pub server_url: String,
    pub schema: Value,
    pub datasets: HashMap<String, DatasetKind>,
    pub metadata: Option<TypedResultDescriptor>,
    pub schema_fetches: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Self {
        StubBackend {
            server_url: "https://backend.test/api".into(),
            schema: editor_schema(),
            datasets: HashMap::new(),
            metadata: None,
            schema_fetches: AtomicUsize::new(0),
        }
    }

    /// Catalog with one raster (`ndvi`) and one vector (`places`) dataset.
    pub fn with_default_datasets() -> Self {
        let mut stub = StubBackend::new();
        stub.datasets.insert("ndvi".into(), DatasetKind::Raster);
        stub.datasets.insert("places".into(), DatasetKind::Vector);
        stub
    }

    pub fn with_vector_columns(columns: Value) -> Self {
        let mut stub = StubBackend::with_default_datasets();
        stub.metadata = Some(
            serde_json::from_value(json!({
                "type": "vector",
                "dataType": "MultiPoint",
                "columns": columns
            }))
            .expect("fixture metadata is well-formed"),
        );
        stub
    }
}

#[async_trait]
impl BackendApi for StubBackend {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn fetch_operator_schema(&self) -> Result<Value, TransportError> {
        self.schema_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.schema.clone())
    }

    async fn dataset_type(&self, dataset: &str) -> Result<DatasetKind, TransportError> {
        self.datasets
            .get(dataset)
            .copied()
            .ok_or_else(|| TransportError::Backend {
                error: "UnknownDataset".into(),
                message: format!("dataset '{dataset}' does not exist"),
            })
    }

    async fn workflow_metadata(
        &self,
        _workflow: &Workflow,
    ) -> Result<TypedResultDescriptor, TransportError> {
        self.metadata
            .clone()
            .ok_or_else(|| TransportError::Backend {
                error: "NotFound".into(),
                message: "no metadata registered".into(),
            })
    }
}

// =============================================================================
// Editor builders
// =============================================================================

pub fn editor_schema() -> Value {
    serde_json::from_str(include_str!("../fixtures/editor_schema.json"))
        .expect("fixture schema is valid json")
}

/// Editor session connected to the fixture schema over the given stub.
pub async fn connected_editor(backend: StubBackend) -> WorkflowEditor {
    let backend = Arc::new(backend);
    let mut editor = WorkflowEditor::new(backend.clone(), Box::new(InMemoryHost::new()));
    editor
        .connect_backend(backend, None)
        .await
        .expect("fixture schema registers cleanly");
    editor
}

pub async fn default_editor() -> WorkflowEditor {
    connected_editor(StubBackend::with_default_datasets()).await
}

/// All summary messages of the last pass, flattened.
pub fn summary_messages(editor: &WorkflowEditor) -> Vec<String> {
    editor
        .validation_summary()
        .iter()
        .flat_map(|group| group.messages.iter().cloned())
        .collect()
}

/// Messages of one summary group.
pub fn group_messages<'a>(editor: &'a WorkflowEditor, block_title: &str) -> Vec<&'a str> {
    editor
        .validation_summary()
        .iter()
        .filter(|group| group.block_title == block_title)
        .flat_map(|group| group.messages.iter().map(String::as_str))
        .collect()
}
