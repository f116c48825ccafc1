//! Authn trait for session management.

use async_trait::async_trait;

use crate::error::Result;
use crate::value::Value;

/// Log in to and out of a CIMI server.
///
/// # Example
///
/// ```no_run
/// use cimi::{internal_login, Authn, CimiClient};
///
/// # async fn example() -> cimi::Result<()> {
/// let client = CimiClient::new()?;
/// assert!(!client.is_authenticated());
///
/// client.login(&internal_login("alice", "secret")).await?;
/// assert!(client.is_authenticated());
///
/// client.logout().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Authn: Send + Sync {
    /// Create a session from login parameters.
    ///
    /// The parameters are the session template for the chosen method,
    /// e.g. `{"href": "session-template/internal", "username": ..,
    /// "password": ..}`. They are wrapped as `{"sessionTemplate": params}`.
    /// Returns the server's response document.
    ///
    /// # Errors
    ///
    /// Returns [`CimiError::AuthenticationFailed`](crate::CimiError::AuthenticationFailed)
    /// if the server rejects the credentials; the session state is left as it was.
    async fn login(&self, params: &Value) -> Result<Value>;

    /// Delete the current session and forget the token.
    ///
    /// Returns `Null` when there was no session to delete.
    ///
    /// # Errors
    ///
    /// Returns [`CimiError::NotAuthenticated`](crate::CimiError::NotAuthenticated)
    /// if the server insists on a session to answer and none is held.
    async fn logout(&self) -> Result<Value>;

    /// Whether a session is currently held. Never contacts the server.
    fn is_authenticated(&self) -> bool;
}
