use crate::error::ControllerError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_IDENTITY_URL: &str = "https://identity.tyo1.conoha.io/v2.0";
pub const DEFAULT_COMPUTE_URL: &str = "https://compute.tyo1.conoha.io/v2";

/// Raw connection settings as collected from flags and environment.
/// Required values are optional here so that validation can report all of them at once.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub identity_url: Option<String>,
    pub compute_url: Option<String>,
    pub tenant_id: Option<String>,
    pub api_username: Option<String>,
    pub api_password: Option<String>,
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity_url: String,
    pub compute_url: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub username: String,
    pub password: String,
}

// Keep the password out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated, immutable configuration for one controlled instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    pub server_id: String,
}

impl InstanceConfig {
    /// Validate settings, naming every missing required variable.
    pub fn from_settings(settings: &Settings) -> Result<Self, ControllerError> {
        fn present(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        let tenant_id = present(&settings.tenant_id);
        let username = present(&settings.api_username);
        let password = present(&settings.api_password);
        let server_id = present(&settings.server_id);

        let mut missing = Vec::new();
        if tenant_id.is_none() {
            missing.push("CONOHA_TENANT_ID");
        }
        if username.is_none() {
            missing.push("CONOHA_API_USERNAME");
        }
        if password.is_none() {
            missing.push("CONOHA_API_PASSWORD");
        }
        if server_id.is_none() {
            missing.push("CONOHA_SERVER_ID");
        }

        match (tenant_id, username, password, server_id) {
            (Some(tenant_id), Some(username), Some(password), Some(server_id)) => Ok(Self {
                endpoints: Endpoints {
                    identity_url: present(&settings.identity_url)
                        .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string()),
                    compute_url: present(&settings.compute_url)
                        .unwrap_or_else(|| DEFAULT_COMPUTE_URL.to_string()),
                },
                credentials: Credentials {
                    tenant_id,
                    username,
                    password,
                },
                server_id,
            }),
            _ => Err(ControllerError::Configuration { missing }),
        }
    }
}

/// Power state reported by the compute API. Transitional states are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Active,
    Shutoff,
    Other(String),
}

impl From<String> for InstanceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ACTIVE" => InstanceStatus::Active,
            "SHUTOFF" => InstanceStatus::Shutoff,
            _ => InstanceStatus::Other(s),
        }
    }
}

impl From<InstanceStatus> for String {
    fn from(s: InstanceStatus) -> Self {
        s.to_string()
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Active => f.write_str("ACTIVE"),
            InstanceStatus::Shutoff => f.write_str("SHUTOFF"),
            InstanceStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Power actions accepted by `POST /servers/{id}/action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    Start,
    Stop,
}

impl ServerAction {
    pub fn as_key(self) -> &'static str {
        match self {
            ServerAction::Start => "os-start",
            ServerAction::Stop => "os-stop",
        }
    }

    /// Single-key request body, e.g. `{"os-start": null}`.
    pub fn body(self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(self.as_key().to_string(), serde_json::Value::Null);
        serde_json::Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
}

/// Response of `GET /servers/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEnvelope {
    pub server: ServerSnapshot,
}

/// Transient view of one server; re-fetched for every query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<ServerAddress>>,
    #[serde(default, deserialize_with = "named_ref")]
    pub flavor: Option<String>,
    #[serde(default, deserialize_with = "named_ref")]
    pub image: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default, rename = "OS-SRV-USG:launched_at")]
    pub launched_at: Option<String>,
}

impl ServerSnapshot {
    fn private_addr(&self, version: u8) -> Option<&str> {
        self.addresses
            .get("private")?
            .iter()
            .find(|a| a.version == version)
            .map(|a| a.addr.as_str())
    }

    pub fn private_ipv4(&self) -> Option<&str> {
        self.private_addr(4)
    }

    pub fn private_ipv6(&self) -> Option<&str> {
        self.private_addr(6)
    }
}

/// Flavor and image come back as `{ "id": .., "name": .. }`, but image is `""` for
/// volume-booted servers and `name` is often omitted. Anything without a name is `None`.
fn named_ref<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    Ok(v.as_ref()
        .and_then(|v| v.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string))
}
