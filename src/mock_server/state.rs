//! Mock server state management.
//!
//! Provides the in-memory data store for the mock CIMI server.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "com.sixsq.slipstream.cookie";

/// A collection advertised by the cloud entry point.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Path segment of the collection relative to `baseURI`, e.g. `credential`.
    pub href: String,
    /// Whether requests need a valid session.
    pub protected: bool,
}

/// An open session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub token: String,
    pub username: String,
    pub created: String,
}

impl SessionRecord {
    /// The session as served by `GET session/<uuid>`.
    pub fn to_document(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "method": "internal",
            "created": self.created,
            "updated": self.created,
        })
    }
}

/// Shared state for the mock server.
///
/// Wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Root advertised as `baseURI`; set by the server once it is bound.
    pub base_uri: String,

    /// Collections by name (e.g. `credentials`), in catalog order.
    pub collections: IndexMap<String, Collection>,

    /// Known users and their passwords.
    pub users: HashMap<String, String>,

    /// Open sessions indexed by token.
    pub sessions: HashMap<String, SessionRecord>,

    /// Resources indexed by id (e.g. `credential/1f0c...`).
    pub resources: IndexMap<String, Value>,

    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Create a state with the standard collections and no data.
    pub fn new() -> Self {
        let state = Self {
            base_uri: String::new(),
            collections: IndexMap::new(),
            users: HashMap::new(),
            sessions: HashMap::new(),
            resources: IndexMap::new(),
            next_id: 0,
        };
        state
            .with_collection("sessions", "session", false)
            .with_collection("sessionTemplates", "session-template", false)
            .with_collection("credentials", "credential", true)
            .with_collection("credentialTemplates", "credential-template", false)
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Advertise a collection in the cloud entry point.
    pub fn with_collection(mut self, name: &str, href: &str, protected: bool) -> Self {
        self.collections.insert(
            name.to_string(),
            Collection {
                href: href.to_string(),
                protected,
            },
        );
        self
    }

    /// Add a user that can log in with the internal template.
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Add a resource; its `id` member is the key.
    pub fn with_resource(mut self, resource: Value) -> Self {
        if let Some(id) = resource.get("id").and_then(Value::as_str) {
            self.resources.insert(id.to_string(), resource);
        }
        self
    }

    /// Look up a collection by its href.
    pub fn collection(&self, href: &str) -> Option<(&str, &Collection)> {
        self.collections
            .iter()
            .find(|(_, c)| c.href == href)
            .map(|(name, c)| (name.as_str(), c))
    }

    /// The cloud entry point document.
    pub fn entry_point(&self) -> Value {
        let mut document = Map::new();
        document.insert("id".into(), json!("cloud-entry-point"));
        document.insert(
            "resourceURI".into(),
            json!("http://schemas.dmtf.org/cimi/2/CloudEntryPoint"),
        );
        document.insert("baseURI".into(), json!(self.base_uri));
        for (name, collection) in &self.collections {
            document.insert(name.clone(), json!({ "href": collection.href }));
        }
        Value::Object(document)
    }

    /// Check the internal login template against the known users.
    pub fn check_password(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|p| p == password)
    }

    /// Open a session for `username`.
    pub fn create_session(&mut self, username: &str) -> SessionRecord {
        let uuid = self.next_uuid();
        let record = SessionRecord {
            id: format!("session/{uuid}"),
            token: format!("tok-{uuid}"),
            username: username.to_string(),
            created: timestamp(),
        };
        self.sessions.insert(record.token.clone(), record.clone());
        record
    }

    /// The session identified by a cookie token.
    pub fn session_for(&self, token: &str) -> Option<&SessionRecord> {
        self.sessions.get(token)
    }

    /// The session with the given resource id.
    pub fn session_by_id(&self, id: &str) -> Option<&SessionRecord> {
        self.sessions.values().find(|s| s.id == id)
    }

    /// Close a session by resource id.
    pub fn remove_session(&mut self, id: &str) -> Option<SessionRecord> {
        let token = self.session_by_id(id)?.token.clone();
        self.sessions.remove(&token)
    }

    /// Store a new resource built from a creation request; returns its id.
    ///
    /// A body of the form `{"<type>Template": {...}}` is flattened into the
    /// resource, keeping the template href under `template`.
    pub fn create_resource(&mut self, href: &str, body: &Value, owner: Option<&str>) -> String {
        let id = format!("{href}/{}", self.next_uuid());
        let now = timestamp();

        let mut resource = Map::new();
        resource.insert("id".into(), json!(id));
        resource.insert("created".into(), json!(now));
        resource.insert("updated".into(), json!(now));
        if let Some(owner) = owner {
            resource.insert(
                "acl".into(),
                json!({ "owner": { "principal": owner, "type": "USER" } }),
            );
        }

        if let Some(fields) = body.as_object() {
            let template = fields
                .iter()
                .find(|(key, value)| key.ends_with("Template") && value.is_object());
            match template {
                Some((_, Value::Object(template))) => {
                    for (key, value) in template {
                        if key == "href" {
                            resource.insert("template".into(), json!({ "href": value }));
                        } else {
                            resource.insert(key.clone(), value.clone());
                        }
                    }
                }
                _ => {
                    for (key, value) in fields {
                        resource.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        self.resources.insert(id.clone(), Value::Object(resource));
        id
    }

    /// Get a resource by id.
    pub fn get_resource(&self, id: &str) -> Option<&Value> {
        self.resources.get(id)
    }

    /// Merge `changes` into a resource and return the updated version.
    ///
    /// `id` and `created` cannot be changed.
    pub fn update_resource(&mut self, id: &str, changes: &Value) -> Option<&Value> {
        let resource = self.resources.get_mut(id)?.as_object_mut()?;
        if let Some(changes) = changes.as_object() {
            for (key, value) in changes {
                if key != "id" && key != "created" {
                    resource.insert(key.clone(), value.clone());
                }
            }
        }
        resource.insert("updated".into(), json!(timestamp()));
        self.resources.get(id)
    }

    /// Delete a resource; returns whether it existed.
    pub fn delete_resource(&mut self, id: &str) -> bool {
        self.resources.shift_remove(id).is_some()
    }

    /// Resources of a collection, optionally filtered by `attribute='value'`.
    pub fn list_resources(&self, href: &str, filter: Option<&str>) -> Vec<&Value> {
        let prefix = format!("{href}/");
        let condition = filter.and_then(parse_filter);
        self.resources
            .iter()
            .filter(|(id, _)| id.starts_with(&prefix))
            .map(|(_, resource)| resource)
            .filter(|resource| match &condition {
                Some((attribute, expected)) => resource
                    .get(attribute)
                    .and_then(Value::as_str)
                    .is_some_and(|actual| actual == expected),
                None => true,
            })
            .collect()
    }

    fn next_uuid(&mut self) -> String {
        self.next_id += 1;
        format!("{:08x}-0000-4000-8000-{:012x}", self.next_id, self.next_id)
    }
}

/// Current time in the format the server stamps on resources.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse the single-comparison filter `attribute='value'`.
fn parse_filter(filter: &str) -> Option<(String, String)> {
    let (attribute, value) = filter.split_once('=')?;
    let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
    Some((attribute.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_has_standard_collections() {
        let state = MockState::new();
        let (name, collection) = state.collection("credential").unwrap();
        assert_eq!(name, "credentials");
        assert!(collection.protected);
        assert!(!state.collection("session").unwrap().1.protected);
    }

    #[test]
    fn test_entry_point_lists_collections() {
        let mut state = MockState::new();
        state.base_uri = "http://127.0.0.1:1234/api/".to_string();

        let cep = state.entry_point();
        assert_eq!(cep["baseURI"], "http://127.0.0.1:1234/api/");
        assert_eq!(cep["credentials"]["href"], "credential");
    }

    #[test]
    fn test_create_resource_flattens_template() {
        let mut state = MockState::new();
        let body = json!({
            "credentialTemplate": {
                "href": "credential-template/generate-ssh-key-pair",
                "name": "my key"
            }
        });

        let id = state.create_resource("credential", &body, Some("user/test"));
        let resource = state.get_resource(&id).unwrap();

        assert!(id.starts_with("credential/"));
        assert_eq!(resource["name"], "my key");
        assert_eq!(
            resource["template"]["href"],
            "credential-template/generate-ssh-key-pair"
        );
        assert_eq!(resource["acl"]["owner"]["principal"], "user/test");
    }

    #[test]
    fn test_update_and_delete_resource() {
        let mut state = MockState::new();
        let id = state.create_resource("credential", &json!({"name": "a"}), None);

        let updated = state
            .update_resource(&id, &json!({"name": "b", "id": "credential/other"}))
            .unwrap();
        assert_eq!(updated["name"], "b");
        assert_eq!(updated["id"], json!(id));

        assert!(state.delete_resource(&id));
        assert!(!state.delete_resource(&id));
    }

    #[test]
    fn test_list_resources_with_filter() {
        let mut state = MockState::new();
        state.create_resource("credential", &json!({"name": "alpha"}), None);
        state.create_resource("credential", &json!({"name": "beta"}), None);
        state.create_resource("credential-template", &json!({"name": "alpha"}), None);

        assert_eq!(state.list_resources("credential", None).len(), 2);
        assert_eq!(
            state.list_resources("credential", Some("name='alpha'")).len(),
            1
        );
    }

    #[test]
    fn test_sessions() {
        let mut state = MockState::new().with_user("test", "testpass");
        assert!(state.check_password("test", "testpass"));
        assert!(!state.check_password("test", "wrong"));

        let session = state.create_session("test");
        assert_eq!(state.session_for(&session.token).unwrap().id, session.id);

        assert!(state.remove_session(&session.id).is_some());
        assert!(state.session_for(&session.token).is_none());
    }
}
