use thiserror::Error;

/// Failure of a single HTTP exchange with the control plane.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("server id {0:?} is not a usable path segment")]
    InvalidServerId(String),
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("identity response did not include an X-Subject-Token header")]
    MissingToken,
    #[error("identity request failed")]
    Request(#[source] TransportError),
}

/// Errors surfaced by the lifecycle controller. Kinds stay distinct for logging even
/// though the chat layer renders all of them the same way.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("missing required configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },
    #[error("authentication failed")]
    Authentication(#[from] AuthenticationError),
    #[error("failed to query server {instance_id}")]
    RemoteQuery {
        instance_id: String,
        #[source]
        source: TransportError,
    },
    #[error("failed to start server {instance_id}")]
    Start {
        instance_id: String,
        #[source]
        source: TransportError,
    },
    #[error("failed to stop server {instance_id}")]
    Stop {
        instance_id: String,
        #[source]
        source: TransportError,
    },
}

impl ControllerError {
    /// Short kind label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ControllerError::Configuration { .. } => "configuration",
            ControllerError::Authentication(_) => "authentication",
            ControllerError::RemoteQuery { .. } => "remote_query",
            ControllerError::Start { .. } => "start",
            ControllerError::Stop { .. } => "stop",
        }
    }
}
