//! Cimi trait for generic resource operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::entry_point::CloudEntryPoint;
use crate::error::Result;
use crate::value::Value;

/// CRUD and search over any resource type the server advertises.
///
/// Resource types (`add`, `search`) are looked up in the cloud entry point
/// by collection name (`credentials`) or href (`credential`). Resource
/// references (`get`, `edit`, `delete`) are absolute URLs, used as given,
/// or ids such as `credential/123`, resolved against `baseURI`.
///
/// Options are a mapping sent as query parameters.
///
/// # Example
///
/// ```no_run
/// use cimi::{Cimi, CimiClient, Value};
///
/// # async fn example() -> cimi::Result<()> {
/// let client = CimiClient::new()?;
///
/// let template = Value::mapping([(
///     "credentialTemplate",
///     Value::mapping([("href", "credential-template/generate-ssh-key-pair")]),
/// )]);
/// let created = client.add("credentials", &template).await?;
/// let id = created.get_str("resource-id").unwrap_or_default();
///
/// let credential = client.get(id).await?;
/// client.delete(id).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Cimi: Send + Sync {
    /// The cloud entry point, fetched once and cached.
    async fn cloud_entry_point(&self) -> Result<Arc<CloudEntryPoint>>;

    /// Create a resource in a collection; `POST` to the collection.
    async fn add_with_options(
        &self,
        resource_type: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value>;

    /// Replace or update a resource; `PUT` to the resource.
    async fn edit_with_options(
        &self,
        url_or_id: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value>;

    /// Remove a resource; `DELETE` with options as query parameters.
    async fn delete_with_options(&self, url_or_id: &str, options: Option<&Value>)
        -> Result<Value>;

    /// Read a resource; `GET` on the resource.
    async fn get_with_options(&self, url_or_id: &str, options: Option<&Value>) -> Result<Value>;

    /// Query a collection; `GET` on the collection.
    async fn search_with_options(
        &self,
        resource_type: &str,
        options: Option<&Value>,
    ) -> Result<Value>;

    async fn add(&self, resource_type: &str, data: &Value) -> Result<Value> {
        self.add_with_options(resource_type, data, None).await
    }

    async fn edit(&self, url_or_id: &str, data: &Value) -> Result<Value> {
        self.edit_with_options(url_or_id, data, None).await
    }

    async fn delete(&self, url_or_id: &str) -> Result<Value> {
        self.delete_with_options(url_or_id, None).await
    }

    async fn get(&self, url_or_id: &str) -> Result<Value> {
        self.get_with_options(url_or_id, None).await
    }

    async fn search(&self, resource_type: &str) -> Result<Value> {
        self.search_with_options(resource_type, None).await
    }
}
