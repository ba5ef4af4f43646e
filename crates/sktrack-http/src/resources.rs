//! CRUD over the backend collections.
//!
//! Records are passed through as opaque JSON; the dashboard's domain models
//! live elsewhere.

use serde_json::Value;
use tracing::{debug, instrument};

use sktrack_core::error::ApiError;
use sktrack_core::types::Collection;

use crate::client::ApiClient;
use crate::request::ApiRequest;

impl ApiClient {
    /// All records in `collection`.
    #[instrument(skip(self))]
    pub async fn list(&self, collection: Collection) -> Result<Vec<Value>, ApiError> {
        let body: Value = self.get_json(collection.path()).await?;
        let records = match body {
            Value::Array(items) => items,
            // Paginated responses wrap the page in `results`.
            Value::Object(mut page) => match page.remove("results") {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(page)],
            },
            Value::Null => Vec::new(),
            other => vec![other],
        };
        debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, collection: Collection, id: &str) -> Result<Value, ApiError> {
        self.get_json(&collection.item_path(id)).await
    }

    #[instrument(skip(self, record))]
    pub async fn create(&self, collection: Collection, record: Value) -> Result<Value, ApiError> {
        self.post_json(collection.path(), record).await
    }

    /// Partially update a record.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        collection: Collection,
        id: &str,
        changes: Value,
    ) -> Result<Value, ApiError> {
        self.patch_json(&collection.item_path(id), changes).await
    }

    /// Delete a record. Some collections (releases) expect a body
    /// describing the deletion.
    #[instrument(skip(self, body))]
    pub async fn remove(
        &self,
        collection: Collection,
        id: &str,
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        let mut request = ApiRequest::delete(collection.item_path(id));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await.map(|_| ())
    }
}
