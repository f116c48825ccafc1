//! Synchronous client.
//!
//! Every call blocks the calling thread until the response has been
//! interpreted. Must not be used from within an async runtime; use
//! [`crate::CimiClient`] there instead.
//!
//! ```no_run
//! use cimi::blocking::CimiClient;
//! use cimi::Value;
//!
//! # fn main() -> cimi::Result<()> {
//! let client = CimiClient::with_endpoint("https://cimi.example.com")?;
//! client.login_internal("alice", "secret")?;
//!
//! let credentials = client.search("credentials")?;
//! println!("{} credentials", credentials.get("count").and_then(Value::as_u64).unwrap_or(0));
//!
//! client.logout()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use url::Url;

use crate::client::{self, CimiClientBuilder};
use crate::config::ClientConfig;
use crate::entry_point::CloudEntryPoint;
use crate::error::{CimiError, Result};
use crate::pagination::{SearchPage, SearchParams};
use crate::session::SessionState;
use crate::traits::{Authn, Cimi};
use crate::value::Value;

/// Blocking counterpart of [`crate::CimiClient`].
pub struct CimiClient {
    inner: client::CimiClient,
    runtime: Runtime,
}

impl fmt::Debug for CimiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("blocking::CimiClient")
            .field(&self.inner)
            .finish()
    }
}

impl CimiClient {
    /// Create a client for the default public endpoint.
    pub fn new() -> Result<Self> {
        Self::from_config(ClientConfig::default())
    }

    /// Create a client for the given server root or cloud entry point URL.
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::from_config(ClientConfig::new(endpoint))
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::from_builder(client::CimiClient::builder(config))
    }

    /// Finish an async client builder and wrap the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the runtime
    /// cannot be started.
    pub fn from_builder(builder: CimiClientBuilder) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CimiError::Runtime)?;
        // reqwest must be built inside a runtime context.
        let inner = {
            let _guard = runtime.enter();
            builder.build()?
        };
        Ok(Self { inner, runtime })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// The underlying async client, sharing this client's session.
    #[must_use]
    pub fn as_async(&self) -> &client::CimiClient {
        &self.inner
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.inner.endpoint()
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.inner.session_state()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id()
    }

    pub fn login(&self, params: &Value) -> Result<Value> {
        self.block_on(self.inner.login(params))
    }

    pub fn login_internal(&self, username: &str, password: &str) -> Result<Value> {
        self.block_on(self.inner.login_internal(username, password))
    }

    pub fn logout(&self) -> Result<Value> {
        self.block_on(self.inner.logout())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.is_authenticated()
    }

    pub fn cloud_entry_point(&self) -> Result<Arc<CloudEntryPoint>> {
        self.block_on(self.inner.cloud_entry_point())
    }

    pub fn refresh_cloud_entry_point(&self) -> Result<Arc<CloudEntryPoint>> {
        self.block_on(self.inner.refresh_cloud_entry_point())
    }

    pub fn add(&self, resource_type: &str, data: &Value) -> Result<Value> {
        self.block_on(self.inner.add(resource_type, data))
    }

    pub fn add_with_options(
        &self,
        resource_type: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value> {
        self.block_on(self.inner.add_with_options(resource_type, data, options))
    }

    pub fn edit(&self, url_or_id: &str, data: &Value) -> Result<Value> {
        self.block_on(self.inner.edit(url_or_id, data))
    }

    pub fn edit_with_options(
        &self,
        url_or_id: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value> {
        self.block_on(self.inner.edit_with_options(url_or_id, data, options))
    }

    pub fn delete(&self, url_or_id: &str) -> Result<Value> {
        self.block_on(self.inner.delete(url_or_id))
    }

    pub fn delete_with_options(&self, url_or_id: &str, options: Option<&Value>) -> Result<Value> {
        self.block_on(self.inner.delete_with_options(url_or_id, options))
    }

    pub fn get(&self, url_or_id: &str) -> Result<Value> {
        self.block_on(self.inner.get(url_or_id))
    }

    pub fn get_with_options(&self, url_or_id: &str, options: Option<&Value>) -> Result<Value> {
        self.block_on(self.inner.get_with_options(url_or_id, options))
    }

    pub fn search(&self, resource_type: &str) -> Result<Value> {
        self.block_on(self.inner.search(resource_type))
    }

    pub fn search_with_options(
        &self,
        resource_type: &str,
        options: Option<&Value>,
    ) -> Result<Value> {
        self.block_on(self.inner.search_with_options(resource_type, options))
    }

    pub fn search_page(&self, resource_type: &str, params: &SearchParams) -> Result<SearchPage> {
        self.block_on(self.inner.search_page(resource_type, params))
    }

    pub fn search_all(&self, resource_type: &str, params: &SearchParams) -> Result<Vec<Value>> {
        self.block_on(self.inner.search_all(resource_type, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_client_construction() {
        let client = CimiClient::with_endpoint("http://localhost:8201").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:8201/api/cloud-entry-point"
        );
        assert!(!client.is_authenticated());
        assert!(format!("{client:?}").contains("blocking::CimiClient"));
    }
}
