//! Request observation hooks.
//!
//! Every request the client sends passes through a [`RequestObserver`]
//! before it reaches the transport, and every response after it returns.
//! The default observer does nothing; `tracing` events are emitted
//! independently.

use url::Url;

use crate::transport::{HttpRequest, HttpResponse};

/// Receives every outgoing request and incoming response.
pub trait RequestObserver: Send + Sync {
    /// Called with the final request, session credentials included.
    fn on_request(&self, _request: &HttpRequest) {}

    /// Called with the raw response for the request sent to `url`.
    fn on_response(&self, _url: &Url, _response: &HttpResponse) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {}
