//! Scripted control plane and settable clock for controller tests.

use crate::clock::Clock;
use crate::conoha::ComputeApi;
use crate::error::TransportError;
use crate::model::{Credentials, InstanceStatus, ServerAction, ServerSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub(crate) struct FakeClock(Arc<Mutex<OffsetDateTime>>);

impl FakeClock {
    pub fn at(t: OffsetDateTime) -> Self {
        Self(Arc::new(Mutex::new(t)))
    }

    pub fn set(&self, t: OffsetDateTime) {
        *self.0.lock().unwrap() = t;
    }

    pub fn advance(&self, d: Duration) {
        *self.0.lock().unwrap() += d;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Auth,
    Fetch { server_id: String, token: String },
    Action { server_id: String, token: String, action: ServerAction },
}

/// What the next `issue_token` call answers.
#[derive(Debug, Clone)]
pub(crate) enum AuthScript {
    Token(String),
    NoHeader,
    Fail(u16),
}

struct FakeState {
    auth: AuthScript,
    auth_count: u32,
    servers: HashMap<String, ServerSnapshot>,
    fail_fetch: Option<u16>,
    fail_action: Option<u16>,
    calls: Vec<Call>,
}

/// In-memory compute API. Actions flip the stored server's status like the real API
/// eventually would.
#[derive(Clone)]
pub(crate) struct FakeComputeApi(Arc<Mutex<FakeState>>);

impl FakeComputeApi {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(FakeState {
            auth: AuthScript::Token("token-1".into()),
            auth_count: 0,
            servers: HashMap::new(),
            fail_fetch: None,
            fail_action: None,
            calls: Vec::new(),
        })))
    }

    pub fn with_server(self, id: &str, status: InstanceStatus) -> Self {
        self.0
            .lock()
            .unwrap()
            .servers
            .insert(id.to_string(), snapshot(id, status));
        self
    }

    pub fn put_server(&self, server: ServerSnapshot) {
        self.0
            .lock()
            .unwrap()
            .servers
            .insert(server.id.clone(), server);
    }

    pub fn set_auth(&self, script: AuthScript) {
        self.0.lock().unwrap().auth = script;
    }

    pub fn fail_fetch(&self, status: Option<u16>) {
        self.0.lock().unwrap().fail_fetch = status;
    }

    pub fn fail_action(&self, status: Option<u16>) {
        self.0.lock().unwrap().fail_action = status;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn auth_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Auth).count()
    }

    pub fn actions(&self) -> Vec<ServerAction> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Action { action, .. } => Some(action),
                _ => None,
            })
            .collect()
    }
}

pub(crate) fn snapshot(id: &str, status: InstanceStatus) -> ServerSnapshot {
    ServerSnapshot {
        id: id.to_string(),
        name: format!("vm-{id}"),
        status,
        addresses: HashMap::new(),
        flavor: None,
        image: None,
        created: None,
        updated: None,
        launched_at: None,
    }
}

fn status_error(status: u16) -> TransportError {
    TransportError::Status {
        status,
        body: "scripted failure".into(),
    }
}

#[async_trait]
impl ComputeApi for FakeComputeApi {
    async fn issue_token(
        &self,
        _credentials: &Credentials,
    ) -> Result<Option<String>, TransportError> {
        let mut st = self.0.lock().unwrap();
        st.calls.push(Call::Auth);
        match st.auth.clone() {
            AuthScript::Token(t) => {
                st.auth_count += 1;
                Ok(Some(format!("{t}#{}", st.auth_count)))
            }
            AuthScript::NoHeader => Ok(None),
            AuthScript::Fail(code) => Err(status_error(code)),
        }
    }

    async fn fetch_server(
        &self,
        token: &str,
        server_id: &str,
    ) -> Result<ServerSnapshot, TransportError> {
        let mut st = self.0.lock().unwrap();
        st.calls.push(Call::Fetch {
            server_id: server_id.to_string(),
            token: token.to_string(),
        });
        if let Some(code) = st.fail_fetch {
            return Err(status_error(code));
        }
        st.servers
            .get(server_id)
            .cloned()
            .ok_or_else(|| status_error(404))
    }

    async fn server_action(
        &self,
        token: &str,
        server_id: &str,
        action: ServerAction,
    ) -> Result<(), TransportError> {
        let mut st = self.0.lock().unwrap();
        st.calls.push(Call::Action {
            server_id: server_id.to_string(),
            token: token.to_string(),
            action,
        });
        if let Some(code) = st.fail_action {
            return Err(status_error(code));
        }
        let server = st.servers.get_mut(server_id).ok_or_else(|| status_error(404))?;
        server.status = match action {
            ServerAction::Start => InstanceStatus::Active,
            ServerAction::Stop => InstanceStatus::Shutoff,
        };
        Ok(())
    }
}
