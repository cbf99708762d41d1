//! Integration tests for the editor session: dynamic retyping, backend
//! reconnects, schema caching, and the host-model handoff.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use geoflow::compile;
use geoflow::graph::WORKFLOW_OUT_INPUT_NAME;
use geoflow::host::InMemoryHost;
use geoflow::schema::model::PinType;
use geoflow::validate::{RuleSet, ValidationSummary};
use serde_json::json;

use helpers::StubBackend;

fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().expect("params fixtures are objects")
}

#[tokio::test]
async fn reconnecting_a_new_type_retypes_and_severs_downstream() {
    let mut editor = helpers::default_editor().await;

    let raster = editor.add_operator_block("geoflow/GdalSource").await.unwrap();
    editor
        .set_param_values(raster, params(json!({"data": "ndvi"})))
        .await
        .unwrap();
    let vector = editor.add_operator_block("geoflow/OgrSource").await.unwrap();
    editor
        .set_param_values(vector, params(json!({"data": "places"})))
        .await
        .unwrap();

    let reprojection = editor.add_operator_block("geoflow/Reprojection").await.unwrap();
    editor
        .set_param_values(
            reprojection,
            params(json!({"targetSpatialReference": "EPSG:4326"})),
        )
        .await
        .unwrap();
    let aggregate = editor
        .add_operator_block("geoflow/NeighborhoodAggregate")
        .await
        .unwrap();

    editor.connect(raster, reprojection, "source").await.unwrap();
    assert_eq!(
        editor.graph().node(reprojection).unwrap().output.pin_type,
        PinType::new("raster")
    );

    // Downstream consumer wired to the (currently raster) output.
    editor.connect(reprojection, aggregate, "raster").await.unwrap();
    assert_eq!(editor.graph().input_source(aggregate, 0), Some(reprojection));

    // Swapping the upstream to a vector producer severs the consumer and
    // retypes the output; it is never silently left as raster.
    editor.connect(vector, reprojection, "source").await.unwrap();
    assert_eq!(
        editor.graph().node(reprojection).unwrap().output.pin_type,
        PinType::new("vector")
    );
    assert_eq!(editor.graph().input_source(aggregate, 0), None);
}

#[tokio::test]
async fn schema_is_fetched_once_per_backend_url() {
    let backend = Arc::new(StubBackend::with_default_datasets());
    let mut editor = geoflow::editor::WorkflowEditor::new(
        backend.clone(),
        Box::new(InMemoryHost::new()),
    );

    editor.connect_backend(backend.clone(), None).await.unwrap();
    editor.connect_backend(backend.clone(), None).await.unwrap();

    assert_eq!(backend.schema_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnect_removes_instances_of_dropped_block_types() {
    let mut editor = helpers::default_editor().await;
    let node = editor.add_operator_block("geoflow/Statistics").await.unwrap();
    assert!(editor.graph().node(node).is_some());

    // A different backend whose schema no longer carries Statistics.
    let mut reduced_schema = helpers::editor_schema();
    let definitions = reduced_schema["definitions"].as_object_mut().unwrap();
    definitions.remove("Statistics");
    definitions.remove("plot");

    let other = Arc::new(StubBackend {
        server_url: "https://other.test/api".into(),
        schema: reduced_schema,
        ..StubBackend::with_default_datasets()
    });
    editor.connect_backend(other, None).await.unwrap();

    assert!(editor.registry().block("geoflow/Statistics").is_none());
    assert!(editor.graph().node(node).is_none());
    // Blocks of surviving types stay registered.
    assert!(editor.registry().block("geoflow/GdalSource").is_some());
}

#[tokio::test]
async fn export_hands_the_document_to_the_host_model() {
    let mut editor = helpers::default_editor().await;
    let out = editor
        .graph()
        .nodes()
        .find(|n| n.is_workflow_out())
        .map(|n| n.id)
        .unwrap();
    let source = editor.add_operator_block("geoflow/GdalSource").await.unwrap();
    editor
        .set_param_values(source, params(json!({"data": "ndvi"})))
        .await
        .unwrap();
    editor.connect(source, out, WORKFLOW_OUT_INPUT_NAME).await.unwrap();

    let backend = StubBackend::with_default_datasets();
    let rules = RuleSet::with_builtin_rules();
    let mut host = InMemoryHost::new();
    let mut summary = ValidationSummary::new();

    let workflow = compile::export(
        editor.graph_mut(),
        &backend,
        &rules,
        &mut host,
        &mut summary,
    )
    .await;

    assert!(workflow.is_some());
    assert_eq!(host.workflow, workflow);
    assert_eq!(host.saved, 1);

    // A failing pass still writes (a null document) and saves.
    editor.graph_mut().remove_node(source);
    let workflow = compile::export(
        editor.graph_mut(),
        &backend,
        &rules,
        &mut host,
        &mut summary,
    )
    .await;
    assert!(workflow.is_none());
    assert_eq!(host.workflow, None);
    assert_eq!(host.saved, 2);
}

#[tokio::test]
async fn import_failure_reports_through_the_alert_channel() {
    let host = Arc::new(std::sync::Mutex::new(InMemoryHost::new()));
    let backend = Arc::new(StubBackend::with_default_datasets());
    let mut editor =
        geoflow::editor::WorkflowEditor::new(backend.clone(), Box::new(host.clone()));
    editor.connect_backend(backend, None).await.unwrap();

    let workflow: geoflow::schema::workflow::Workflow = serde_json::from_value(json!({
        "type": "Raster",
        "operator": {"type": "Unknown", "params": {}}
    }))
    .unwrap();
    editor.import(Some(&workflow), None).await;

    let host = host.lock().unwrap();
    assert!(
        host.alerts
            .iter()
            .any(|a| a.contains("could not be imported")),
        "unexpected alerts: {:?}",
        host.alerts
    );
    // The trailing compiler pass still wrote to the model.
    assert!(host.saved > 0);
    assert!(editor.graph().session.is_idle());
}
