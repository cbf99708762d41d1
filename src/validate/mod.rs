//! Semantic validation: per-operator-type rules that go beyond shape
//! checking.
//!
//! Rules are dispatched on the operator type id; unknown ids are valid.
//! A rule may be purely local (weights-matrix shape) or consult the backend
//! (dataset existence/type, column metadata of an upstream sub-workflow).
//! Whatever a rule returns as an error is caught at the dispatch boundary
//! and downgraded to a summary message, so a broken rule or a dead network
//! never aborts the compiler pass.

pub mod rules;
pub mod summary;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::backend::BackendApi;
use crate::error::RuleError;
use crate::schema::workflow::WorkflowOperator;
pub use summary::{GENERAL_GROUP, ValidationGroup, ValidationSummary};

/// One semantic validation rule, registered for a single operator type id.
///
/// `Ok(None)` means valid; `Ok(Some(message))` is a human-readable failure;
/// `Err` is a fault inside the rule itself and is wrapped generically by the
/// dispatcher.
#[async_trait]
pub trait OperatorRule: Send + Sync {
    async fn validate(
        &self,
        instance: &WorkflowOperator,
        backend: &dyn BackendApi,
    ) -> Result<Option<String>, RuleError>;
}

/// Dispatch table from operator type id to its validation rule.
#[derive(Default)]
pub struct RuleSet {
    rules: HashMap<String, Box<dyn OperatorRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet::default()
    }

    /// The rule set shipped with the editor.
    pub fn with_builtin_rules() -> Self {
        let mut set = RuleSet::new();
        set.register("GdalSource", rules::DatasetTypeRule::raster());
        set.register("OgrSource", rules::DatasetTypeRule::vector());
        set.register("ColumnRangeFilter", rules::ColumnRangeFilterRule);
        set.register("NeighborhoodAggregate", rules::NeighborhoodAggregateRule);
        set
    }

    pub fn register(&mut self, operator_id: impl Into<String>, rule: impl OperatorRule + 'static) {
        self.rules.insert(operator_id.into(), Box::new(rule));
    }

    /// Validate one operator instance. Returns a failure message, or `None`
    /// when the instance is valid or no rule is registered for its type.
    pub async fn validate(
        &self,
        instance: &WorkflowOperator,
        backend: &dyn BackendApi,
    ) -> Option<String> {
        let rule = self.rules.get(&instance.operator)?;

        match rule.validate(instance, backend).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(operator = %instance.operator, error = %err, "validation rule failed");
                Some(format!("Error during validation: {err}"))
            }
        }
    }
}
