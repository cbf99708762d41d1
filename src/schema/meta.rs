//! Optional revalidation of the whole schema document against an external
//! JSON-Schema meta-schema.
//!
//! The meta-schema is fetched at most once per URL for the lifetime of the
//! process; every later validation reuses the cached copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;

use crate::error::{SchemaError, TransportError};

/// Draft the backend's operator definition files are written against.
pub const DEFAULT_META_SCHEMA_URL: &str = "https://json-schema.org/draft-04/schema";

fn meta_cache() -> &'static Mutex<HashMap<String, Arc<Value>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<Value>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Fetch a meta-schema, consulting the process-wide cache first.
pub async fn fetch_meta_schema(url: &str) -> Result<Arc<Value>, TransportError> {
    if let Ok(cache) = meta_cache().lock()
        && let Some(cached) = cache.get(url)
    {
        return Ok(Arc::clone(cached));
    }

    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let schema: Value = serde_json::from_str(&response.text().await?)?;

    let schema = Arc::new(schema);
    if let Ok(mut cache) = meta_cache().lock() {
        cache.insert(url.to_string(), Arc::clone(&schema));
    }
    Ok(schema)
}

/// Validate `document` against the meta-schema at `url`.
pub async fn ensure_schema_compliant(document: &Value, url: &str) -> Result<(), SchemaError> {
    let meta = fetch_meta_schema(url).await.map_err(SchemaError::Fetch)?;
    validate_against_meta(document, &meta)
}

/// Validation against an already-fetched meta-schema.
pub fn validate_against_meta(document: &Value, meta: &Value) -> Result<(), SchemaError> {
    let compiled = jsonschema::JSONSchema::options()
        .with_draft(jsonschema::Draft::Draft4)
        .compile(meta)
        .map_err(|e| SchemaError::NotSchemaCompliant(e.to_string()))?;

    if let Err(errors) = compiled.validate(document) {
        let detail = errors
            .map(|e| e.to_string())
            .next()
            .unwrap_or_else(|| "unknown validation failure".to_string());
        return Err(SchemaError::NotSchemaCompliant(detail));
    }
    Ok(())
}
