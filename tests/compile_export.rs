//! Integration tests for the export pass: terminal-block rules, structural
//! source checks, array homogeneity, and validator isolation.

mod helpers;

use async_trait::async_trait;
use geoflow::backend::BackendApi;
use geoflow::error::RuleError;
use geoflow::graph::{ARRAY_BUILDER_INPUT_NAME, WORKFLOW_OUT_INPUT_NAME, WORKFLOW_OUT_TITLE};
use geoflow::schema::workflow::{ResultKind, WorkflowOperator};
use geoflow::validate::OperatorRule;
use serde_json::json;

use helpers::{StubBackend, group_messages, summary_messages};

fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().expect("params fixtures are objects")
}

#[tokio::test]
async fn valid_chain_exports_a_document() {
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

    let workflow = editor.export().await.expect("the chain is valid");
    assert_eq!(workflow.result_kind, ResultKind::Raster);
    assert_eq!(workflow.operator.operator, "GdalSource");
    assert!(summary_messages(&editor).is_empty());
}

#[tokio::test]
async fn missing_output_block_is_reported() {
    let mut editor = helpers::default_editor().await;
    editor.graph_mut().clear();

    let workflow = editor.export().await;
    assert!(workflow.is_none());
    let messages = group_messages(&editor, "General");
    assert!(
        messages.iter().any(|m| m.contains("must be an output block")),
        "unexpected summary: {messages:?}"
    );
}

#[tokio::test]
async fn ambiguous_output_blocks_are_reported() {
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
    editor.graph_mut().add_workflow_out();

    let workflow = editor.export().await;
    assert!(workflow.is_none(), "ambiguous output must yield a null result");
    let messages = group_messages(&editor, "General");
    assert!(
        messages.iter().any(|m| m.contains("only be one output block")),
        "unexpected summary: {messages:?}"
    );
}

#[tokio::test]
async fn required_source_is_enforced() {
    let mut editor = helpers::default_editor().await;
    let out = editor
        .graph()
        .nodes()
        .find(|n| n.is_workflow_out())
        .map(|n| n.id)
        .unwrap();

    let expression = editor.add_operator_block("geoflow/Expression").await.unwrap();
    editor
        .set_param_values(
            expression,
            params(json!({"expression": "A + B", "outputType": "U8"})),
        )
        .await
        .unwrap();
    editor.connect(expression, out, WORKFLOW_OUT_INPUT_NAME).await.unwrap();

    assert!(editor.export().await.is_none());
    let messages = group_messages(&editor, "Expression");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("\"rasters\"") && m.contains("expects data")),
        "unexpected summary: {messages:?}"
    );
    // The node is flagged, the terminal reports missing upstream data.
    assert!(editor.graph().node(expression).unwrap().has_errors);
    assert!(!group_messages(&editor, WORKFLOW_OUT_TITLE).is_empty());
}

#[tokio::test]
async fn missing_params_are_enforced() {
    let mut editor = helpers::default_editor().await;
    let source = editor.add_operator_block("geoflow/GdalSource").await.unwrap();

    editor.export().await;
    let messages = group_messages(&editor, "GDAL Source");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("configuration parameters")),
        "unexpected summary: {messages:?}"
    );
    assert!(editor.graph().node(source).unwrap().has_errors);
}

#[tokio::test]
async fn array_homogeneity_is_enforced() {
    let mut editor = helpers::connected_editor(StubBackend {
        datasets: [
            ("a".to_string(), geoflow::backend::DatasetKind::Raster),
            ("b".to_string(), geoflow::backend::DatasetKind::Raster),
            ("c".to_string(), geoflow::backend::DatasetKind::Raster),
            ("places".to_string(), geoflow::backend::DatasetKind::Vector),
        ]
        .into_iter()
        .collect(),
        ..StubBackend::new()
    })
    .await;
    let out = editor
        .graph()
        .nodes()
        .find(|n| n.is_workflow_out())
        .map(|n| n.id)
        .unwrap();

    let expression = editor.add_operator_block("geoflow/Expression").await.unwrap();
    editor
        .set_param_values(
            expression,
            params(json!({"expression": "A + B", "outputType": "U8"})),
        )
        .await
        .unwrap();
    editor.connect(expression, out, WORKFLOW_OUT_INPUT_NAME).await.unwrap();

    let builder = editor.add_array_builder().await;
    editor.connect(builder, expression, "rasters").await.unwrap();

    // Empty array: a distinct message.
    editor.export().await;
    let messages = group_messages(&editor, "Expression");
    assert!(
        messages.iter().any(|m| m.contains("the array is empty")),
        "unexpected summary: {messages:?}"
    );

    // Three rasters and one vector: the combined type is flagged.
    for name in ["a", "b", "c"] {
        let raster = editor.add_operator_block("geoflow/GdalSource").await.unwrap();
        editor
            .set_param_values(raster, params(json!({"data": name})))
            .await
            .unwrap();
        editor
            .connect(raster, builder, ARRAY_BUILDER_INPUT_NAME)
            .await
            .unwrap();
    }
    let vector = editor.add_operator_block("geoflow/OgrSource").await.unwrap();
    editor
        .set_param_values(vector, params(json!({"data": "places"})))
        .await
        .unwrap();
    editor
        .connect(vector, builder, ARRAY_BUILDER_INPUT_NAME)
        .await
        .unwrap();

    editor.export().await;
    let messages = group_messages(&editor, "Expression");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("it contains raster,vector")),
        "unexpected summary: {messages:?}"
    );
}

#[tokio::test]
async fn homogeneous_array_passes() {
    let mut editor = helpers::connected_editor(StubBackend {
        datasets: [
            ("a".to_string(), geoflow::backend::DatasetKind::Raster),
            ("b".to_string(), geoflow::backend::DatasetKind::Raster),
        ]
        .into_iter()
        .collect(),
        ..StubBackend::new()
    })
    .await;
    let out = editor
        .graph()
        .nodes()
        .find(|n| n.is_workflow_out())
        .map(|n| n.id)
        .unwrap();

    let expression = editor.add_operator_block("geoflow/Expression").await.unwrap();
    editor
        .set_param_values(
            expression,
            params(json!({"expression": "A + B", "outputType": "U8"})),
        )
        .await
        .unwrap();
    editor.connect(expression, out, WORKFLOW_OUT_INPUT_NAME).await.unwrap();

    let builder = editor.add_array_builder().await;
    editor.connect(builder, expression, "rasters").await.unwrap();
    for name in ["a", "b"] {
        let raster = editor.add_operator_block("geoflow/GdalSource").await.unwrap();
        editor
            .set_param_values(raster, params(json!({"data": name})))
            .await
            .unwrap();
        editor
            .connect(raster, builder, ARRAY_BUILDER_INPUT_NAME)
            .await
            .unwrap();
    }

    let workflow = editor.export().await.expect("homogeneous array is valid");
    let rasters = workflow.operator.sources.as_ref().unwrap()["rasters"]
        .as_array()
        .unwrap();
    assert_eq!(rasters.len(), 2);
}

struct ExplodingRule;

#[async_trait]
impl OperatorRule for ExplodingRule {
    async fn validate(
        &self,
        _instance: &WorkflowOperator,
        _backend: &dyn BackendApi,
    ) -> Result<Option<String>, RuleError> {
        Err(RuleError::invalid("boom"))
    }
}

#[tokio::test]
async fn failing_rule_marks_only_its_node() {
    let mut editor = helpers::default_editor().await;
    editor.rules_mut().register("Expression", ExplodingRule);

    let out = editor
        .graph()
        .nodes()
        .find(|n| n.is_workflow_out())
        .map(|n| n.id)
        .unwrap();

    // Two independent sources feed one expression; the sibling sources must
    // still execute cleanly when the expression's rule explodes.
    let builder = editor.add_array_builder().await;
    let a = editor.add_operator_block("geoflow/GdalSource").await.unwrap();
    editor
        .set_param_values(a, params(json!({"data": "ndvi"})))
        .await
        .unwrap();
    editor.connect(a, builder, ARRAY_BUILDER_INPUT_NAME).await.unwrap();

    let expression = editor.add_operator_block("geoflow/Expression").await.unwrap();
    editor
        .set_param_values(
            expression,
            params(json!({"expression": "A", "outputType": "U8"})),
        )
        .await
        .unwrap();
    editor.connect(builder, expression, "rasters").await.unwrap();
    editor.connect(expression, out, WORKFLOW_OUT_INPUT_NAME).await.unwrap();

    assert!(editor.export().await.is_none());

    let messages = group_messages(&editor, "Expression");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Error during validation: boom")),
        "unexpected summary: {messages:?}"
    );
    assert!(editor.graph().node(expression).unwrap().has_errors);
    // The sibling source executed normally in the same pass.
    assert!(!editor.graph().node(a).unwrap().has_errors);
}

#[tokio::test]
async fn cycles_are_rejected_with_a_summary_error() {
    let mut editor = helpers::default_editor().await;

    let a = editor.add_operator_block("geoflow/Expression").await.unwrap();
    let b = editor.add_operator_block("geoflow/NeighborhoodAggregate").await.unwrap();
    let builder_a = editor.add_array_builder().await;
    editor.connect(b, builder_a, ARRAY_BUILDER_INPUT_NAME).await.unwrap();
    editor.connect(builder_a, a, "rasters").await.unwrap();
    editor.connect(a, b, "raster").await.unwrap();

    assert!(editor.export().await.is_none());
    let messages = group_messages(&editor, "General");
    assert!(
        messages.iter().any(|m| m.contains("contains a cycle")),
        "unexpected summary: {messages:?}"
    );
}
