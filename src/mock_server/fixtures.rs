//! Test fixtures for the mock server.
//!
//! Provides pre-built documents for the resources a CIMI server ships with.

use serde_json::{json, Value};

use super::state::timestamp;

/// Factory for test fixtures.
pub struct Fixtures;

/// The default scenario loaded by [`MockServer::start`](super::MockServer::start).
pub struct DefaultScenario {
    pub users: Vec<(String, String)>,
    pub resources: Vec<Value>,
}

impl Fixtures {
    /// Username of the default user.
    pub const USERNAME: &'static str = "test";

    /// Password of the default user.
    pub const PASSWORD: &'static str = "testpass";

    /// One user, the internal session template, the SSH key pair
    /// credential template and one existing credential.
    pub fn default_scenario() -> DefaultScenario {
        DefaultScenario {
            users: vec![(Self::USERNAME.to_string(), Self::PASSWORD.to_string())],
            resources: vec![
                Self::session_template_internal(),
                Self::credential_template_ssh(),
                Self::credential("credential/existing-key", "existing key"),
            ],
        }
    }

    /// The `session-template/internal` resource.
    pub fn session_template_internal() -> Value {
        json!({
            "id": "session-template/internal",
            "method": "internal",
            "name": "Internal",
            "description": "Login with username and password",
            "username": "username",
            "password": "password",
            "created": timestamp(),
            "updated": timestamp(),
        })
    }

    /// The `credential-template/generate-ssh-key-pair` resource.
    pub fn credential_template_ssh() -> Value {
        json!({
            "id": "credential-template/generate-ssh-key-pair",
            "type": "ssh",
            "method": "generate-ssh-key-pair",
            "name": "Generate SSH Key Pair",
            "size": 1024,
            "created": timestamp(),
            "updated": timestamp(),
        })
    }

    /// A minimal credential resource.
    pub fn credential(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "type": "ssh",
            "publicKey": "ssh-rsa AAAAB3NzaC1yc2E test",
            "acl": { "owner": { "principal": "user/test", "type": "USER" } },
            "created": timestamp(),
            "updated": timestamp(),
        })
    }
}
