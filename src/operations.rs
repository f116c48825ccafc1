//! Resource operations engine.
//!
//! Turns verb + target URL + optional payload/options into a request,
//! threads the session through it and maps the response onto a value or a
//! typed failure. URL resolution happens before the engine is called.

use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::{CimiError, Result};
use crate::observer::RequestObserver;
use crate::pagination::{SearchPage, SearchParams};
use crate::session::SessionManager;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::value::{self, Value};

/// Window size used when fetching every page of a collection.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u64 = 1000;

const JSON: &str = "application/json";

pub(crate) struct ResourceEngine {
    transport: Arc<dyn Transport>,
    session: SessionManager,
    observer: Arc<dyn RequestObserver>,
}

impl ResourceEngine {
    pub(crate) fn new(transport: Arc<dyn Transport>, observer: Arc<dyn RequestObserver>) -> Self {
        Self {
            transport,
            session: SessionManager::new(),
            observer,
        }
    }

    pub(crate) fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Build and send a request without looking at the response.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        mut url: Url,
        body: Option<&Value>,
        options: Option<&Value>,
    ) -> Result<HttpResponse> {
        if let Some(options) = options {
            apply_options(&mut url, options)?;
        }

        let mut request = HttpRequest::new(method, url);
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static(JSON));
        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
            request.body = Some(value::encode(body)?);
        }
        self.session.attach(&mut request.headers);

        self.observer.on_request(&request);
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        self.observer.on_response(&url, &response);
        Ok(response)
    }

    /// Send a request and let the session see the response.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        options: Option<&Value>,
    ) -> Result<HttpResponse> {
        let response = self.dispatch(method, url, body, options).await?;
        self.session.observe(&response);
        Ok(response)
    }

    /// Send a request and decode a successful response.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        options: Option<&Value>,
    ) -> Result<Value> {
        let had_session = self.session.is_authenticated();
        let target = url.to_string();
        let response = self.request(method, url, body, options).await?;
        interpret(&target, &response, had_session)
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    pub(crate) async fn add(&self, url: Url, data: &Value, options: Option<&Value>) -> Result<Value> {
        self.execute(Method::POST, url, Some(data), options).await
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    pub(crate) async fn edit(&self, url: Url, data: &Value, options: Option<&Value>) -> Result<Value> {
        self.execute(Method::PUT, url, Some(data), options).await
    }

    /// A real `DELETE`; options travel as query parameters.
    #[tracing::instrument(skip_all, fields(url = %url))]
    pub(crate) async fn delete(&self, url: Url, options: Option<&Value>) -> Result<Value> {
        self.execute(Method::DELETE, url, None, options).await
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    pub(crate) async fn get(&self, url: Url, options: Option<&Value>) -> Result<Value> {
        self.execute(Method::GET, url, None, options).await
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    pub(crate) async fn search(&self, url: Url, options: Option<&Value>) -> Result<Value> {
        self.execute(Method::GET, url, None, options).await
    }

    /// Fetch one window of a collection.
    pub(crate) async fn search_page(
        &self,
        url: Url,
        collection_key: Option<&str>,
        params: &SearchParams,
    ) -> Result<SearchPage> {
        let options = params.to_options()?;
        let document = self.search(url, Some(&options)).await?;
        Ok(SearchPage::from_document(
            document,
            collection_key,
            params.first,
            params.last,
        ))
    }

    /// Fetch every resource of a collection, one window at a time.
    ///
    /// When the server reports `count`, windows are requested until that
    /// many resources arrived, starting each one after the last resource
    /// received. Without `count`, a short window ends the walk.
    pub(crate) async fn search_all(
        &self,
        url: Url,
        collection_key: Option<&str>,
        params: &SearchParams,
    ) -> Result<Vec<Value>> {
        let mut all_resources = Vec::new();
        let mut first: u64 = 1;
        let mut page = 1;

        loop {
            let window = params
                .clone()
                .with_window(first, first.saturating_add(DEFAULT_PAGE_SIZE - 1));
            let result = self
                .search_page(url.clone(), collection_key, &window)
                .await?;
            let received = result.len() as u64;
            let count = result.count;
            all_resources.extend(result.resources);

            let done = match count {
                Some(total) => received == 0 || all_resources.len() as u64 >= total,
                None => received < DEFAULT_PAGE_SIZE,
            };
            if done {
                break;
            }
            first = first.saturating_add(received);
            page += 1;

            if page > MAX_PAGES {
                tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
                break;
            }
        }

        Ok(all_resources)
    }
}

/// Map a response onto a decoded document or a typed failure.
fn interpret(url: &str, response: &HttpResponse, had_session: bool) -> Result<Value> {
    let status = response.status;
    if status.is_success() {
        return decode_body(&response.body);
    }

    let body = error_body(&response.body);
    let message = error_message(body.as_ref(), status);
    let code = status.as_u16();
    tracing::debug!(status = code, %message, "request rejected");

    match status {
        StatusCode::NOT_FOUND => Err(CimiError::ResourceNotFound {
            url: url.to_string(),
            body,
        }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if !had_session => {
            Err(CimiError::NotAuthenticated {
                status: code,
                message,
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CimiError::AuthenticationFailed {
            status: code,
            message,
            body,
        }),
        _ => Err(CimiError::ServerRejected {
            status: code,
            message,
            body,
        }),
    }
}

/// Decode a success body; an empty body is `Null`.
pub(crate) fn decode_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    value::decode(text)
}

/// Decode an error body if possible, keeping non-JSON text as a string.
pub(crate) fn error_body(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(value::decode(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

/// Extract a human-readable message from an error body.
pub(crate) fn error_message(body: Option<&Value>, status: StatusCode) -> String {
    match body {
        Some(Value::String(text)) => text.clone(),
        Some(document) => document
            .get_str("message")
            .or_else(|| document.get_str("error"))
            .map_or_else(|| format!("HTTP {status}"), str::to_string),
        None => format!("HTTP {status}"),
    }
}

/// Append options to the query string of `url`.
///
/// Scalars are stringified, `null` members are skipped and sequences become
/// repeated parameters.
pub(crate) fn apply_options(url: &mut Url, options: &Value) -> Result<()> {
    let entries = match options {
        Value::Null => return Ok(()),
        Value::Mapping(entries) => entries,
        other => {
            return Err(CimiError::InvalidOptions(format!(
                "options must be a mapping, got {other}"
            )))
        }
    };

    let mut pairs: Vec<(&str, String)> = Vec::new();
    for (key, value) in entries {
        match value {
            Value::Sequence(items) => {
                for item in items {
                    if let Some(text) = query_scalar(key, item)? {
                        pairs.push((key.as_str(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_scalar(key, other)? {
                    pairs.push((key.as_str(), text));
                }
            }
        }
    }

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(())
}

fn query_scalar(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Sequence(_) | Value::Mapping(_) => Err(CimiError::InvalidOptions(format!(
            "option '{key}' must be a scalar or a list of scalars"
        ))),
    }
}
