//! Builtin validation rules.

use async_trait::async_trait;

use super::OperatorRule;
use crate::backend::types::TypedResultDescriptor;
use crate::backend::{BackendApi, DatasetKind};
use crate::error::RuleError;
use crate::schema::workflow::{ResultKind, SourceValue, Workflow, WorkflowOperator};
use serde_json::Value;

/// The referenced dataset must exist and have the expected result kind.
/// Registered for `GdalSource` (raster) and `OgrSource` (vector); both read
/// the dataset name from the `data` param.
pub struct DatasetTypeRule {
    expected: DatasetKind,
}

impl DatasetTypeRule {
    pub fn raster() -> Self {
        DatasetTypeRule {
            expected: DatasetKind::Raster,
        }
    }

    pub fn vector() -> Self {
        DatasetTypeRule {
            expected: DatasetKind::Vector,
        }
    }
}

#[async_trait]
impl OperatorRule for DatasetTypeRule {
    async fn validate(
        &self,
        instance: &WorkflowOperator,
        backend: &dyn BackendApi,
    ) -> Result<Option<String>, RuleError> {
        let dataset = instance
            .params
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RuleError::invalid("the param 'data' must be a dataset name"))?;

        let found = backend.dataset_type(dataset).await?;
        if found != self.expected {
            return Ok(Some(format!(
                "Expected a dataset of type {}, but \"{dataset}\" is of type {found}.",
                self.expected
            )));
        }
        Ok(None)
    }
}

/// The filter's target column must exist in the upstream dataset's schema
/// and have a type compatible with the filter's literal range values.
///
/// This is the one rule that needs a structural document: it registers a
/// throwaway sub-workflow built from the node's own `vector` source and asks
/// the backend for its result metadata.
pub struct ColumnRangeFilterRule;

#[async_trait]
impl OperatorRule for ColumnRangeFilterRule {
    async fn validate(
        &self,
        instance: &WorkflowOperator,
        backend: &dyn BackendApi,
    ) -> Result<Option<String>, RuleError> {
        let source = instance
            .source("vector")
            .ok_or_else(|| RuleError::invalid("the source 'vector' is missing"))?
            .map_err(|e| RuleError::invalid(format!("the source 'vector' is malformed: {e}")))?;
        let SourceValue::One(upstream) = source else {
            return Err(RuleError::invalid("the source 'vector' must be a single operator"));
        };

        let metadata = backend
            .workflow_metadata(&Workflow {
                result_kind: ResultKind::Vector,
                operator: upstream,
            })
            .await?;
        let TypedResultDescriptor::Vector { columns, .. } = metadata else {
            return Err(RuleError::invalid("the upstream workflow is not a vector workflow"));
        };

        let column = instance
            .params
            .get("column")
            .and_then(Value::as_str)
            .ok_or_else(|| RuleError::invalid("the param 'column' must be a column name"))?;

        let Some(column_meta) = columns.get(column) else {
            return Ok(Some(format!(
                "The source contains no column named \"{column}\"."
            )));
        };

        // Type of the first range literal decides what the user compared
        // against; an empty ranges list has nothing to check.
        let first_literal = instance
            .params
            .get("ranges")
            .and_then(Value::as_array)
            .and_then(|ranges| ranges.first())
            .and_then(Value::as_array)
            .and_then(|range| range.first());
        let Some(literal) = first_literal else {
            return Ok(None);
        };

        if column_meta.data_type.is_textual() {
            if !literal.is_string() {
                return Ok(Some(format!(
                    "The column \"{column}\" is of type {}, but the ranges do not consist of strings.",
                    column_meta.data_type
                )));
            }
        } else if !literal.is_number() {
            return Ok(Some(format!(
                "The column \"{column}\" is of type {}, but the ranges do not consist of numbers.",
                column_meta.data_type
            )));
        }
        Ok(None)
    }
}

/// A neighborhood given as a weights matrix must have an odd number of rows,
/// an odd number of columns, and uniform row lengths.
pub struct NeighborhoodAggregateRule;

#[async_trait]
impl OperatorRule for NeighborhoodAggregateRule {
    async fn validate(
        &self,
        instance: &WorkflowOperator,
        _backend: &dyn BackendApi,
    ) -> Result<Option<String>, RuleError> {
        let neighborhood = instance
            .params
            .get("neighborhood")
            .ok_or_else(|| RuleError::invalid("the param 'neighborhood' is missing"))?;

        // Only weights-matrix neighborhoods carry a matrix to check.
        if neighborhood.get("type").and_then(Value::as_str) != Some("weightsMatrix") {
            return Ok(None);
        }
        let weights = neighborhood
            .get("weights")
            .and_then(Value::as_array)
            .ok_or_else(|| RuleError::invalid("the weights matrix must be an array of rows"))?;

        Ok(check_weights_matrix(weights))
    }
}

fn check_weights_matrix(rows: &[Value]) -> Option<String> {
    if rows.len() % 2 == 0 {
        return Some("The weights matrix must have an odd number of rows.".to_string());
    }
    let Some(first_len) = rows.first().and_then(Value::as_array).map(Vec::len) else {
        return Some("The rows of the weights matrix must be arrays of numbers.".to_string());
    };
    if first_len % 2 == 0 {
        return Some("The weights matrix must have an odd number of columns.".to_string());
    }
    for row in rows {
        if row.as_array().map(Vec::len) != Some(first_len) {
            return Some("The rows of the weights matrix must all have the same length.".to_string());
        }
    }
    None
}
