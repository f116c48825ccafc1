//! CIMI API client library.
//!
//! A Rust client for CIMI-style resource-management APIs: authenticate
//! against a server, discover its resource collections through the cloud
//! entry point, and create, read, update, delete and search resources of
//! any type without per-type code.
//!
//! # Quick Start
//!
//! ```no_run
//! use cimi::{Authn, Cimi, CimiClient, Value};
//!
//! #[tokio::main]
//! async fn main() -> cimi::Result<()> {
//!     let client = CimiClient::with_endpoint("https://cimi.example.com")?;
//!
//!     client.login_internal("alice", "secret").await?;
//!     assert!(client.is_authenticated());
//!
//!     // Create a resource through its collection
//!     let template = Value::mapping([(
//!         "credentialTemplate",
//!         Value::mapping([("href", "credential-template/generate-ssh-key-pair")]),
//!     )]);
//!     let created = client.add("credentials", &template).await?;
//!     let id = created.get_str("resource-id").unwrap_or_default().to_string();
//!
//!     // Read it back, then remove it
//!     let credential = client.get(&id).await?;
//!     println!("{credential}");
//!     client.delete(&id).await?;
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Authn`] - session lifecycle (`login`, `logout`, `is_authenticated`)
//! - [`Cimi`] - resource operations (`add`, `edit`, `delete`, `get`, `search`)
//!
//! [`CimiClient`] implements both. Payloads and results are [`Value`]s,
//! a closed JSON-like value type; [`value::encode`] and [`value::decode`]
//! convert to and from wire text. [`blocking::CimiClient`] offers the same
//! operations as plain blocking calls.
//!
//! # Configuration
//!
//! [`CimiClient::from_env`] reads:
//!
//! - `CIMI_ENDPOINT` (optional) - server root or cloud entry point URL
//!   (defaults to `https://nuv.la/api/cloud-entry-point`)
//! - `CIMI_TIMEOUT_SECS` (optional) - request timeout in seconds
//! - `CIMI_INSECURE` (optional) - accept invalid TLS certificates

pub mod blocking;
pub mod cli;
mod client;
mod config;
mod entry_point;
mod error;
mod observer;
mod operations;
pub mod output;
mod pagination;
mod session;
mod traits;
mod transport;
pub mod value;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{CimiClient, CimiClientBuilder};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use entry_point::CloudEntryPoint;
pub use error::{CimiError, Result};
pub use operations::DEFAULT_PAGE_SIZE;
pub use output::PrettyPrint;
pub use pagination::{SearchPage, SearchParams};
pub use session::{internal_login, SessionState, INTERNAL_SESSION_TEMPLATE};
pub use value::{Mapping, Number, Value};

// Re-export traits
pub use traits::{Authn, Cimi};

// Re-export extension points
pub use observer::{NoopObserver, RequestObserver};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
