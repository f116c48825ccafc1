//! Mock CIMI server for E2E testing.
//!
//! This module provides an in-memory server that simulates a CIMI API for
//! integration and end-to-end testing. Unlike wiremock, which mocks at the
//! HTTP level per test, this server keeps state across requests: sessions
//! opened by login, resources created by `add`, and so on.
//!
//! # Example
//!
//! ```ignore
//! use cimi::mock_server::{Fixtures, MockServer};
//! use cimi::{Authn, Cimi, CimiClient};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = CimiClient::with_endpoint(server.url()).unwrap();
//!
//!     client.login_internal(Fixtures::USERNAME, Fixtures::PASSWORD).await.unwrap();
//!     let credentials = client.search("credentials").await.unwrap();
//!     assert_eq!(credentials.get("count").and_then(|c| c.as_u64()), Some(1));
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::MockServer;
pub use state::{Collection, MockState, SessionRecord, SESSION_COOKIE};
