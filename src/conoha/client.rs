use super::ComputeApi;
use crate::error::TransportError;
use crate::model::{Credentials, Endpoints, ServerAction, ServerEnvelope, ServerSnapshot};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;

const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";
const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// HTTP client for the identity and compute endpoints.
pub struct ConohaClient {
    http: reqwest::Client,
    identity_url: Url,
    compute_url: Url,
}

impl ConohaClient {
    pub fn new(endpoints: &Endpoints) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(format!("conoha-lifecycle/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            identity_url: base_url(&endpoints.identity_url).context("identity endpoint")?,
            compute_url: base_url(&endpoints.compute_url).context("compute endpoint")?,
        })
    }

    fn token_url(&self) -> Url {
        join_segments(&self.identity_url, &["auth", "tokens"])
    }

    /// `<compute>/servers/<id>[/<suffix>...]`. The id is percent-encoded as exactly one
    /// path segment, so `/`, `?` or `#` in it never reach another resource.
    fn server_url(&self, server_id: &str, suffix: &[&str]) -> Result<Url, TransportError> {
        if server_id.is_empty() || server_id == "." || server_id == ".." {
            return Err(TransportError::InvalidServerId(server_id.to_string()));
        }
        let mut segments = vec!["servers", server_id];
        segments.extend_from_slice(suffix);
        Ok(join_segments(&self.compute_url, &segments))
    }
}

fn base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("parse url {raw:?}"))?;
    if url.cannot_be_a_base() {
        bail!("{raw:?} cannot carry a path");
    }
    Ok(url)
}

fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // Bases are checked in `base_url`, so the path is always segmentable.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Password identity scoped to the tenant's project.
pub(crate) fn auth_request_body(credentials: &Credentials) -> serde_json::Value {
    serde_json::json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": credentials.username,
                        "password": credentials.password,
                    }
                }
            },
            "scope": {
                "project": { "id": credentials.tenant_id }
            }
        }
    })
}

/// Turn non-2xx responses into `TransportError::Status`, keeping the body for logs.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ComputeApi for ConohaClient {
    async fn issue_token(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<String>, TransportError> {
        let resp = self
            .http
            .post(self.token_url())
            .json(&auth_request_body(credentials))
            .send()
            .await?;
        let resp = check_status(resp).await?;

        Ok(resp
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    async fn fetch_server(
        &self,
        token: &str,
        server_id: &str,
    ) -> Result<ServerSnapshot, TransportError> {
        let resp = self
            .http
            .get(self.server_url(server_id, &[])?)
            .header(AUTH_TOKEN_HEADER, token)
            .send()
            .await?;
        let envelope: ServerEnvelope = check_status(resp).await?.json().await?;
        Ok(envelope.server)
    }

    async fn server_action(
        &self,
        token: &str,
        server_id: &str,
        action: ServerAction,
    ) -> Result<(), TransportError> {
        let resp = self
            .http
            .post(self.server_url(server_id, &["action"])?)
            .header(AUTH_TOKEN_HEADER, token)
            .json(&action.body())
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
