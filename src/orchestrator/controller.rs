//! Instance lifecycle controller.
//!
//! Owns the cached identity session, the target server id and the running-time
//! accumulator. Every operation validates the session first, reads remote state when it
//! needs it for idempotency, and reports timing/cost through the accumulator.

use super::session::Session;
use crate::accumulator::{Accumulator, Cost, Elapsed};
use crate::clock::{Clock, SystemClock};
use crate::conoha::{ComputeApi, ConohaClient};
use crate::error::{AuthenticationError, ControllerError};
use crate::model::{InstanceConfig, InstanceStatus, ServerAction, ServerSnapshot, Settings};
use crate::text_summary;
use anyhow::Result;
use std::fmt;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOutcome::Started => f.write_str("サーバーを起動しました。"),
            StartOutcome::AlreadyRunning => f.write_str("サーバーは既に起動しています。"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    Stopped { elapsed: Elapsed, cost: Cost },
    AlreadyStopped,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped { elapsed, cost } => write!(
                f,
                "サーバーを停止しました。\n稼働時間: {elapsed}\n料金: {cost}"
            ),
            StopOutcome::AlreadyStopped => f.write_str("サーバーは既に停止しています。"),
        }
    }
}

pub struct LifecycleController {
    config: InstanceConfig,
    api: Box<dyn ComputeApi>,
    clock: Box<dyn Clock>,
    session: Session,
    accumulator: Accumulator,
}

impl LifecycleController {
    pub fn new(
        config: InstanceConfig,
        api: Box<dyn ComputeApi>,
        clock: Box<dyn Clock>,
        accumulator: Accumulator,
    ) -> Self {
        Self {
            config,
            api,
            clock,
            session: Session::None,
            accumulator,
        }
    }

    /// Validate settings and build a controller backed by the real HTTP API.
    /// Fails with [`ControllerError::Configuration`] before any network setup.
    pub fn connect(settings: &Settings, hourly_rate: f64) -> Result<Self> {
        let config = InstanceConfig::from_settings(settings)?;
        let api = ConohaClient::new(&config.endpoints)?;
        debug!(
            server_id = %config.server_id,
            identity_url = %config.endpoints.identity_url,
            compute_url = %config.endpoints.compute_url,
            "controller configured"
        );
        Ok(Self::new(
            config,
            Box::new(api),
            Box::new(SystemClock),
            Accumulator::new(hourly_rate),
        ))
    }

    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Obtain a fresh token. A failed attempt leaves the cached session untouched.
    pub async fn authenticate(&mut self) -> Result<String, ControllerError> {
        let token = match self.api.issue_token(&self.config.credentials).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                error!("identity response had no session token header");
                return Err(AuthenticationError::MissingToken.into());
            }
            Err(e) => {
                error!(error = %e, "identity request failed");
                return Err(AuthenticationError::Request(e).into());
            }
        };

        self.session = Session::issued(token.clone(), self.clock.now());
        if let Some(expires_at) = self.session.expires_at() {
            info!(%expires_at, "authenticated");
        }
        Ok(token)
    }

    /// Return a usable token, re-authenticating when there is none or it is about to expire.
    async fn ensure_valid_session(&mut self) -> Result<String, ControllerError> {
        if let Some(token) = self.session.token_at(self.clock.now()) {
            return Ok(token.to_string());
        }
        debug!("no usable session; authenticating");
        self.authenticate().await
    }

    async fn fetch(&self, token: &str, server_id: &str) -> Result<ServerSnapshot, ControllerError> {
        self.api
            .fetch_server(token, server_id)
            .await
            .map_err(|source| {
                error!(%server_id, error = %source, "server query failed");
                ControllerError::RemoteQuery {
                    instance_id: server_id.to_string(),
                    source,
                }
            })
    }

    pub async fn get_instance_state(&mut self) -> Result<InstanceStatus, ControllerError> {
        let token = self.ensure_valid_session().await?;
        let server_id = self.config.server_id.clone();
        let status = self.fetch(&token, &server_id).await?.status;
        debug!(%server_id, %status, "fetched server state");
        Ok(status)
    }

    pub async fn start(&mut self) -> Result<StartOutcome, ControllerError> {
        let token = self.ensure_valid_session().await?;
        let server_id = self.config.server_id.clone();

        let status = self.fetch(&token, &server_id).await?.status;
        if status == InstanceStatus::Active {
            info!(%server_id, "server already running; nothing to do");
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.api
            .server_action(&token, &server_id, ServerAction::Start)
            .await
            .map_err(|source| {
                error!(%server_id, error = %source, "start action failed");
                ControllerError::Start {
                    instance_id: server_id.clone(),
                    source,
                }
            })?;

        let now = self.clock.now();
        self.accumulator.set_start_time(now);
        info!(%server_id, previous = %status, started_at = %now, "start issued");
        Ok(StartOutcome::Started)
    }

    pub async fn stop(&mut self) -> Result<StopOutcome, ControllerError> {
        let token = self.ensure_valid_session().await?;
        let server_id = self.config.server_id.clone();

        let status = self.fetch(&token, &server_id).await?.status;
        if status == InstanceStatus::Shutoff {
            info!(%server_id, "server already stopped; nothing to do");
            return Ok(StopOutcome::AlreadyStopped);
        }

        // The accumulator is only reset after the action succeeds, so a retried stop
        // still measures from the original start.
        self.api
            .server_action(&token, &server_id, ServerAction::Stop)
            .await
            .map_err(|source| {
                error!(%server_id, error = %source, "stop action failed");
                ControllerError::Stop {
                    instance_id: server_id.clone(),
                    source,
                }
            })?;

        let end = self.clock.now();
        let elapsed = self.accumulator.calculate_elapsed_time(end);
        let cost = self.accumulator.calculate_cost(end);
        if let Some(start) = self.accumulator.start_time() {
            let ran = std::time::Duration::from_secs((end - start).whole_seconds().max(0) as u64);
            info!(
                %server_id,
                ran = %humantime::format_duration(ran),
                billed = ?cost.total(),
                "stop issued"
            );
        } else {
            info!(%server_id, "stop issued; no tracked start time");
        }
        self.accumulator.reset_start_time();

        Ok(StopOutcome::Stopped { elapsed, cost })
    }

    /// State, launch time and the tracked running time/cost of the configured server.
    pub async fn status(&mut self) -> Result<String, ControllerError> {
        let token = self.ensure_valid_session().await?;
        let server_id = self.config.server_id.clone();
        let server = self.fetch(&token, &server_id).await?;

        let now = self.clock.now();
        Ok(text_summary::build_status_text(
            &server,
            self.accumulator.calculate_elapsed_time(now),
            self.accumulator.calculate_cost(now),
        ))
    }

    /// Full snapshot of any server id.
    ///
    /// The running time and cost always come from this controller's own tracking, which
    /// follows the configured server only. For any other id those two lines describe the
    /// configured server, not the one queried.
    pub async fn details(&mut self, server_id: &str) -> Result<String, ControllerError> {
        let token = self.ensure_valid_session().await?;
        let server = self.fetch(&token, server_id).await?;

        let now = self.clock.now();
        Ok(text_summary::build_details_text(
            &server,
            self.accumulator.calculate_elapsed_time(now),
            self.accumulator.calculate_cost(now),
        ))
    }
}
