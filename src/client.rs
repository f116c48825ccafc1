//! CIMI API client.
//!
//! The facade that ties the session, the entry point cache and the
//! resource operations together. Operations are exposed through the
//! [`Authn`] and [`Cimi`] traits.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::ClientConfig;
use crate::entry_point::{absolute_url, CloudEntryPoint, EntryPointResolver};
use crate::error::Result;
use crate::observer::{NoopObserver, RequestObserver};
use crate::operations::ResourceEngine;
use crate::pagination::{SearchPage, SearchParams};
use crate::session::{self, SessionState};
use crate::traits::{Authn, Cimi};
use crate::transport::{ReqwestTransport, Transport};
use crate::value::Value;

/// Async CIMI client.
///
/// Holds one session and one cloud entry point cache. Clones share both,
/// so a clone is the same logical client rather than a new one; create
/// another client for an independent session.
///
/// # Example
///
/// ```no_run
/// use cimi::{Cimi, CimiClient};
///
/// # async fn example() -> cimi::Result<()> {
/// // Defaults to https://nuv.la/api/cloud-entry-point
/// let client = CimiClient::new()?;
///
/// // Or target another server
/// let client = CimiClient::with_endpoint("https://cimi.example.com")?;
///
/// let cep = client.cloud_entry_point().await?;
/// println!("baseURI: {}", cep.base_uri());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CimiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    entry_point: EntryPointResolver,
    engine: ResourceEngine,
}

impl fmt::Debug for CimiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CimiClient")
            .field("endpoint", &self.inner.entry_point.url().as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl CimiClient {
    /// Create a client for the default public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::from_config(ClientConfig::default())
    }

    /// Create a client for the given server root or cloud entry point URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute URL.
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::from_config(ClientConfig::new(endpoint))
    }

    /// Create a client from environment variables (see [`ClientConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds invalid settings.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Create a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the HTTP client cannot
    /// be constructed.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building a client with a custom transport or observer.
    #[must_use]
    pub fn builder(config: ClientConfig) -> CimiClientBuilder {
        CimiClientBuilder {
            config,
            transport: None,
            observer: None,
        }
    }

    /// URL of the cloud entry point document.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.inner.entry_point.url()
    }

    /// Current authentication state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.inner.engine.session().state()
    }

    /// Resource id of the current session, if known.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.engine.session().session_id()
    }

    /// Discard the cached cloud entry point and fetch it again.
    pub async fn refresh_cloud_entry_point(&self) -> Result<Arc<CloudEntryPoint>> {
        self.inner.entry_point.refresh(&self.inner.engine).await
    }

    /// Log in with the `session-template/internal` username/password method.
    pub async fn login_internal(&self, username: &str, password: &str) -> Result<Value> {
        self.login(&session::internal_login(username, password))
            .await
    }

    /// Fetch one window of a collection.
    pub async fn search_page(&self, resource_type: &str, params: &SearchParams) -> Result<SearchPage> {
        let cep = self.cloud_entry_point().await?;
        let url = cep.collection_url(resource_type)?;
        self.inner
            .engine
            .search_page(url, cep.collection_key(resource_type), params)
            .await
    }

    /// Fetch every resource of a collection matching `params`, paging
    /// through it window by window.
    pub async fn search_all(&self, resource_type: &str, params: &SearchParams) -> Result<Vec<Value>> {
        let cep = self.cloud_entry_point().await?;
        let url = cep.collection_url(resource_type)?;
        self.inner
            .engine
            .search_all(url, cep.collection_key(resource_type), params)
            .await
    }

    /// Absolute URLs bypass the entry point; ids are resolved against `baseURI`.
    async fn resolve_reference(&self, url_or_id: &str) -> Result<Url> {
        if let Some(url) = absolute_url(url_or_id) {
            return Ok(url);
        }
        self.cloud_entry_point()
            .await?
            .resolve_reference(url_or_id)
    }

    fn sessions_url(cep: &CloudEntryPoint) -> Result<Url> {
        match cep.collection_url("sessions") {
            Ok(url) => Ok(url),
            Err(_) => Ok(cep.base_uri().join("session")?),
        }
    }
}

#[async_trait]
impl Authn for CimiClient {
    #[tracing::instrument(skip_all)]
    async fn login(&self, params: &Value) -> Result<Value> {
        let cep = self.cloud_entry_point().await?;
        let url = Self::sessions_url(&cep)?;
        session::login(&self.inner.engine, url, params).await
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self) -> Result<Value> {
        let cep = self.cloud_entry_point().await?;
        let url = Self::sessions_url(&cep)?;
        session::logout(&self.inner.engine, cep.base_uri(), url).await
    }

    fn is_authenticated(&self) -> bool {
        self.inner.engine.session().is_authenticated()
    }
}

#[async_trait]
impl Cimi for CimiClient {
    async fn cloud_entry_point(&self) -> Result<Arc<CloudEntryPoint>> {
        self.inner.entry_point.resolve(&self.inner.engine).await
    }

    async fn add_with_options(
        &self,
        resource_type: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value> {
        let url = self.cloud_entry_point().await?.collection_url(resource_type)?;
        self.inner.engine.add(url, data, options).await
    }

    async fn edit_with_options(
        &self,
        url_or_id: &str,
        data: &Value,
        options: Option<&Value>,
    ) -> Result<Value> {
        let url = self.resolve_reference(url_or_id).await?;
        self.inner.engine.edit(url, data, options).await
    }

    async fn delete_with_options(&self, url_or_id: &str, options: Option<&Value>) -> Result<Value> {
        let url = self.resolve_reference(url_or_id).await?;
        self.inner.engine.delete(url, options).await
    }

    async fn get_with_options(&self, url_or_id: &str, options: Option<&Value>) -> Result<Value> {
        let url = self.resolve_reference(url_or_id).await?;
        self.inner.engine.get(url, options).await
    }

    async fn search_with_options(
        &self,
        resource_type: &str,
        options: Option<&Value>,
    ) -> Result<Value> {
        let url = self.cloud_entry_point().await?.collection_url(resource_type)?;
        self.inner.engine.search(url, options).await
    }
}

/// Builder for [`CimiClient`] with a custom transport or observer.
pub struct CimiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observer: Option<Arc<dyn RequestObserver>>,
}

impl fmt::Debug for CimiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CimiClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_observer", &self.observer.is_some())
            .finish()
    }
}

impl CimiClientBuilder {
    /// Send requests through `transport` instead of `reqwest`.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Report every request and response to `observer`.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the default transport
    /// cannot be constructed.
    pub fn build(self) -> Result<CimiClient> {
        let endpoint = self.config.entry_point_url()?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(NoopObserver));

        Ok(CimiClient {
            inner: Arc::new(ClientInner {
                entry_point: EntryPointResolver::new(endpoint),
                engine: ResourceEngine::new(transport, observer),
            }),
        })
    }
}
