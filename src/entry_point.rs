//! Cloud entry point: the catalog of resource collections.

use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::Method;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{CimiError, Result};
use crate::operations::ResourceEngine;
use crate::value::Value;

/// The catalog document served at the cloud entry point.
///
/// Maps each collection name (e.g. `credentials`) to an href (e.g.
/// `credential`) relative to [`base_uri`](Self::base_uri).
#[derive(Debug, Clone)]
pub struct CloudEntryPoint {
    base_uri: Url,
    collections: IndexMap<String, String>,
    document: Value,
}

impl CloudEntryPoint {
    /// Interpret a decoded entry point document fetched from `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CimiError::EntryPointUnavailable`] if the document is not a
    /// mapping or has no usable `baseURI`.
    pub fn from_document(endpoint: &Url, document: Value) -> Result<Self> {
        let Some(entries) = document.as_mapping() else {
            return Err(CimiError::entry_point(
                "cloud entry point is not a JSON object",
                None,
            ));
        };

        let Some(base) = entries.get("baseURI").and_then(Value::as_str) else {
            return Err(CimiError::entry_point(
                "cloud entry point has no baseURI",
                None,
            ));
        };

        let mut base_uri = endpoint
            .join(base)
            .map_err(|e| CimiError::entry_point(format!("invalid baseURI '{base}'"), Some(e.into())))?;
        if !base_uri.path().ends_with('/') {
            let dir = format!("{}/", base_uri.path());
            base_uri.set_path(&dir);
        }

        let collections = entries
            .iter()
            .filter_map(|(name, value)| {
                value
                    .get_str("href")
                    .map(|href| (name.clone(), href.to_string()))
            })
            .collect();

        Ok(Self {
            base_uri,
            collections,
            document,
        })
    }

    /// Root against which relative hrefs and resource ids are resolved.
    #[must_use]
    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// The full catalog document as served.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Iterate over `(collection name, href)` pairs.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.collections
            .iter()
            .map(|(name, href)| (name.as_str(), href.as_str()))
    }

    /// Catalog key for a resource type given either as the collection name
    /// (`credentials`) or as its href (`credential`).
    #[must_use]
    pub fn collection_key(&self, resource_type: &str) -> Option<&str> {
        if let Some((key, _)) = self.collections.get_key_value(resource_type) {
            return Some(key);
        }
        self.collections
            .iter()
            .find(|(_, href)| href.as_str() == resource_type)
            .map(|(key, _)| key.as_str())
    }

    /// Href of a resource type's collection.
    #[must_use]
    pub fn collection_href(&self, resource_type: &str) -> Option<&str> {
        self.collection_key(resource_type)
            .and_then(|key| self.collections.get(key))
            .map(String::as_str)
    }

    /// Absolute URL of a resource type's collection.
    ///
    /// # Errors
    ///
    /// Returns [`CimiError::UnknownResourceType`] if the catalog does not
    /// list the type.
    pub fn collection_url(&self, resource_type: &str) -> Result<Url> {
        let href = self
            .collection_href(resource_type)
            .ok_or_else(|| CimiError::UnknownResourceType(resource_type.to_string()))?;
        Ok(self.base_uri.join(href)?)
    }

    /// Resolve an absolute URL or a resource id relative to `baseURI`.
    ///
    /// References follow URL resolution rules: `credential/1` lands under
    /// `baseURI`, while `/api/credential/1` is rooted at the server host.
    pub fn resolve_reference(&self, url_or_id: &str) -> Result<Url> {
        match absolute_url(url_or_id) {
            Some(url) => Ok(url),
            None => Ok(self.base_uri.join(url_or_id)?),
        }
    }
}

/// Parse `reference` if it is an absolute http(s) URL.
pub(crate) fn absolute_url(reference: &str) -> Option<Url> {
    Url::parse(reference)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Fetches the cloud entry point once and caches it.
#[derive(Debug)]
pub(crate) struct EntryPointResolver {
    url: Url,
    cache: Mutex<Option<Arc<CloudEntryPoint>>>,
}

impl EntryPointResolver {
    pub(crate) fn new(url: Url) -> Self {
        Self {
            url,
            cache: Mutex::new(None),
        }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Return the cached entry point, fetching it on first use.
    ///
    /// The cache lock is held across the fetch, so concurrent first calls
    /// result in a single request.
    pub(crate) async fn resolve(&self, engine: &ResourceEngine) -> Result<Arc<CloudEntryPoint>> {
        let mut cache = self.cache.lock().await;
        if let Some(cep) = cache.as_ref() {
            return Ok(Arc::clone(cep));
        }

        let cep = Arc::new(self.fetch(engine).await?);
        *cache = Some(Arc::clone(&cep));
        Ok(cep)
    }

    /// Drop the cached entry point and fetch it again.
    pub(crate) async fn refresh(&self, engine: &ResourceEngine) -> Result<Arc<CloudEntryPoint>> {
        let mut cache = self.cache.lock().await;
        *cache = None;

        let cep = Arc::new(self.fetch(engine).await?);
        *cache = Some(Arc::clone(&cep));
        Ok(cep)
    }

    #[tracing::instrument(skip_all, fields(url = %self.url))]
    async fn fetch(&self, engine: &ResourceEngine) -> Result<CloudEntryPoint> {
        let document = engine
            .execute(Method::GET, self.url.clone(), None, None)
            .await
            .map_err(|e| {
                CimiError::entry_point(format!("failed to fetch {}", self.url), Some(e))
            })?;

        let cep = CloudEntryPoint::from_document(&self.url, document)?;
        tracing::debug!(
            base_uri = %cep.base_uri,
            collections = cep.collections.len(),
            "cloud entry point loaded"
        );
        Ok(cep)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    use super::*;
    use crate::observer::NoopObserver;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use crate::value;

    struct StaticTransport {
        status: StatusCode,
        body: String,
        calls: AtomicUsize,
    }

    impl StaticTransport {
        fn new(status: StatusCode, body: String) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: self.body.clone(),
            })
        }
    }

    fn endpoint() -> Url {
        Url::parse("https://nuv.la/api/cloud-entry-point").unwrap()
    }

    fn document() -> Value {
        Value::mapping([
            ("id", Value::from("cloud-entry-point")),
            ("baseURI", Value::from("https://nuv.la/api/")),
            ("credentials", Value::mapping([("href", "credential")])),
            ("sessions", Value::mapping([("href", "session")])),
            ("acl", Value::mapping([("owner", Value::mapping([("principal", "ADMIN")]))])),
        ])
    }

    #[test]
    fn test_parses_collections() {
        let cep = CloudEntryPoint::from_document(&endpoint(), document()).unwrap();
        assert_eq!(cep.base_uri().as_str(), "https://nuv.la/api/");

        let collections: Vec<_> = cep.collections().collect();
        assert_eq!(
            collections,
            vec![("credentials", "credential"), ("sessions", "session")]
        );
    }

    #[test]
    fn test_collection_lookup_by_name_or_href() {
        let cep = CloudEntryPoint::from_document(&endpoint(), document()).unwrap();
        assert_eq!(
            cep.collection_url("credentials").unwrap().as_str(),
            "https://nuv.la/api/credential"
        );
        assert_eq!(cep.collection_key("credential"), Some("credentials"));
        assert!(matches!(
            cep.collection_url("widgets"),
            Err(CimiError::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_resolve_reference() {
        let cep = CloudEntryPoint::from_document(&endpoint(), document()).unwrap();
        assert_eq!(
            cep.resolve_reference("credential/123").unwrap().as_str(),
            "https://nuv.la/api/credential/123"
        );
        // A leading slash is rooted at the host, not at baseURI
        assert_eq!(
            cep.resolve_reference("/api/credential/123").unwrap().as_str(),
            "https://nuv.la/api/credential/123"
        );
        assert_eq!(
            cep.resolve_reference("/credential/123").unwrap().as_str(),
            "https://nuv.la/credential/123"
        );
        assert_eq!(
            cep.resolve_reference("https://other.example/api/credential/9")
                .unwrap()
                .as_str(),
            "https://other.example/api/credential/9"
        );
    }

    #[test]
    fn test_relative_base_uri_resolves_against_endpoint() {
        let mut doc = document();
        doc.as_mapping_mut()
            .unwrap()
            .insert("baseURI".to_string(), Value::from("/api"));
        let cep = CloudEntryPoint::from_document(&endpoint(), doc).unwrap();
        assert_eq!(cep.base_uri().as_str(), "https://nuv.la/api/");
    }

    #[test]
    fn test_missing_base_uri_is_unavailable() {
        let mut doc = document();
        let _ = doc.as_mapping_mut().unwrap().shift_remove("baseURI");
        let err = CloudEntryPoint::from_document(&endpoint(), doc).unwrap_err();
        assert!(matches!(err, CimiError::EntryPointUnavailable { .. }));

        let err = CloudEntryPoint::from_document(&endpoint(), Value::from(vec![1])).unwrap_err();
        assert!(matches!(err, CimiError::EntryPointUnavailable { .. }));
    }

    #[test]
    fn test_absolute_url_detection() {
        assert!(absolute_url("https://nuv.la/api/credential/1").is_some());
        assert!(absolute_url("credential/1").is_none());
        assert!(absolute_url("session/abc-def").is_none());
    }

    #[test]
    fn test_resolver_fetches_once_until_refresh() {
        let transport = StaticTransport::new(StatusCode::OK, value::encode(&document()).unwrap());
        let engine = ResourceEngine::new(transport.clone(), Arc::new(NoopObserver));
        let resolver = EntryPointResolver::new(endpoint());

        tokio_test::block_on(async {
            let first = resolver.resolve(&engine).await.unwrap();
            let second = resolver.resolve(&engine).await.unwrap();
            assert!(Arc::ptr_eq(&first, &second));
        });
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        tokio_test::block_on(resolver.refresh(&engine)).unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolver_wraps_malformed_document() {
        let transport = StaticTransport::new(StatusCode::OK, "{not json".to_string());
        let engine = ResourceEngine::new(transport, Arc::new(NoopObserver));
        let resolver = EntryPointResolver::new(endpoint());

        let err = tokio_test::block_on(resolver.resolve(&engine)).unwrap_err();
        match err {
            CimiError::EntryPointUnavailable { source, .. } => {
                assert!(matches!(
                    source.as_deref(),
                    Some(CimiError::MalformedDocument { .. })
                ));
            }
            other => panic!("expected EntryPointUnavailable, got {other:?}"),
        }
    }
}
