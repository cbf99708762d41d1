//! Remote backend seam.
//!
//! The compiler and the semantic validator talk to the processing backend
//! through [`BackendApi`]; [`HttpBackend`] is the reqwest implementation.
//! Tests substitute an in-memory stub.

pub mod http;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;
use crate::schema::workflow::Workflow;
pub use http::HttpBackend;
pub use types::{DatasetKind, TypedResultDescriptor};

/// Connection parameters held by the host widget model.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub server_url: Url,
    pub token: String,
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Base URL of this connection; keys the per-URL schema cache.
    fn server_url(&self) -> &str;

    /// Fetch the operator-type schema document. Called once per connection;
    /// the parsed result is cached by the editor session.
    async fn fetch_operator_schema(&self) -> Result<Value, TransportError>;

    /// Result kind of a stored dataset.
    async fn dataset_type(&self, dataset: &str) -> Result<DatasetKind, TransportError>;

    /// Register a throwaway sub-workflow and resolve its result metadata.
    async fn workflow_metadata(
        &self,
        workflow: &Workflow,
    ) -> Result<TypedResultDescriptor, TransportError>;
}
