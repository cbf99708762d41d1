//! Reqwest implementation of the backend seam.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::types::{ErrorMessageResponse, GetDatasetResponse, IdResponse, TypedResultDescriptor};
use super::{BackendApi, BackendConfig, DatasetKind};
use crate::error::TransportError;
use crate::schema::workflow::Workflow;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        HttpBackend {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.config.server_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| TransportError::Url(self.config.server_url.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.token)
    }

    /// Send a request and decode the body, surfacing error-shaped bodies
    /// (`{error, message}`) as [`TransportError::Backend`] even on 2xx.
    async fn checked_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if let Ok(error) = serde_json::from_str::<ErrorMessageResponse>(&body) {
            return Err(TransportError::Backend {
                error: error.error,
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(TransportError::Decode)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    fn server_url(&self) -> &str {
        self.config.server_url.as_str()
    }

    async fn fetch_operator_schema(&self) -> Result<Value, TransportError> {
        let url = self.endpoint(&["workflow", "schema"])?;
        tracing::debug!(%url, "fetching operator schema");
        self.checked_json(self.client.get(url)).await
    }

    async fn dataset_type(&self, dataset: &str) -> Result<DatasetKind, TransportError> {
        let url = self.endpoint(&["dataset", dataset])?;
        let response: GetDatasetResponse = self.checked_json(self.authorized(self.client.get(url))).await?;
        Ok(response.result_descriptor.kind)
    }

    async fn workflow_metadata(
        &self,
        workflow: &Workflow,
    ) -> Result<TypedResultDescriptor, TransportError> {
        let register_url = self.endpoint(&["workflow"])?;
        let registered: IdResponse = self
            .checked_json(self.authorized(self.client.post(register_url)).json(workflow))
            .await?;

        let metadata_url =
            self.endpoint(&["workflow", &registered.id.to_string(), "metadata"])?;
        self.checked_json(self.authorized(self.client.get(metadata_url)))
            .await
    }
}
