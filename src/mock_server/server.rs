//! Mock CIMI server.
//!
//! Provides an axum-based HTTP server that simulates a CIMI API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::MockState;

/// A mock CIMI server for testing.
///
/// The server runs in the background and can be used to test the CIMI client
/// against a realistic API implementation.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's root URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with the standard collections but no users or
    /// resources.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    ///
    /// The state's `base_uri` is overwritten with the bound address.
    pub async fn with_state(mut state: MockState) -> Self {
        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");
        let url = format!("http://{addr}");

        state.base_uri = format!("{url}/api/");
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Server error");
        });

        Self {
            url,
            handle,
            state: shared_state,
        }
    }

    /// Get the root URL of the mock server.
    ///
    /// Use this URL when creating a `CimiClient` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL of the cloud entry point document.
    pub fn entry_point_url(&self) -> String {
        format!("{}/api/cloud-entry-point", self.url)
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new();

        for (username, password) in scenario.users {
            state = state.with_user(&username, &password);
        }

        for resource in scenario.resources {
            state = state.with_resource(resource);
        }

        state
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            .route("/api/cloud-entry-point", get(handlers::cloud_entry_point))
            // Session routes
            .route(
                "/api/session",
                get(handlers::list_sessions).post(handlers::create_session),
            )
            .route(
                "/api/session/:uuid",
                get(handlers::get_session).delete(handlers::delete_session),
            )
            // Generic collection routes
            .route(
                "/api/:collection",
                get(handlers::search_resources).post(handlers::add_resource),
            )
            .route(
                "/api/:collection/:uuid",
                get(handlers::get_resource)
                    .put(handlers::edit_resource)
                    .delete(handlers::delete_resource),
            )
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
