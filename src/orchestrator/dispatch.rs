//! Chat-command dispatch.
//!
//! Maps one chat command onto one controller operation and renders the result. All
//! controller errors collapse into a single user-facing message; the detail goes to logs.

use super::controller::LifecycleController;
use crate::error::ControllerError;
use std::fmt;
use tracing::{error, info};

pub const FAILURE_MESSAGE: &str = "コマンドの実行中にエラーが発生しました。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Stop,
    Status,
    Info { server_id: String },
}

impl ChatCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ChatCommand::Start => "start",
            ChatCommand::Stop => "stop",
            ChatCommand::Status => "status",
            ChatCommand::Info { .. } => "info",
        }
    }

    /// Acknowledgement shown while the command runs.
    pub fn pending_message(&self) -> &'static str {
        match self {
            ChatCommand::Start => "サーバーを起動中です...",
            ChatCommand::Stop => "サーバーを停止中です...",
            ChatCommand::Status => "サーバーの状態を確認中です...",
            ChatCommand::Info { .. } => "サーバー情報を取得中です...",
        }
    }

    /// Parse a shell line such as `status` or `info <server_id>`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next()?.to_ascii_lowercase().as_str() {
            "start" => ChatCommand::Start,
            "stop" => ChatCommand::Stop,
            "status" => ChatCommand::Status,
            "info" => ChatCommand::Info {
                server_id: parts.next()?.to_string(),
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(String),
    Failure,
}

impl Reply {
    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Success(text) => f.write_str(text),
            Reply::Failure => f.write_str(FAILURE_MESSAGE),
        }
    }
}

async fn execute(
    controller: &mut LifecycleController,
    command: &ChatCommand,
) -> Result<String, ControllerError> {
    Ok(match command {
        ChatCommand::Start => controller.start().await?.to_string(),
        ChatCommand::Stop => controller.stop().await?.to_string(),
        ChatCommand::Status => controller.status().await?,
        ChatCommand::Info { server_id } => controller.details(server_id).await?,
    })
}

pub async fn dispatch(controller: &mut LifecycleController, command: &ChatCommand) -> Reply {
    info!(command = command.name(), "dispatching command");
    match execute(controller, command).await {
        Ok(text) => Reply::Success(text),
        Err(e) => {
            let kind = e.kind();
            let report = anyhow::Error::new(e);
            error!(command = command.name(), kind, "command failed: {report:#}");
            Reply::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::Accumulator;
    use crate::model::{Credentials, Endpoints, InstanceConfig, InstanceStatus};
    use crate::testing::{FakeClock, FakeComputeApi};
    use time::macros::datetime;

    fn controller(api: &FakeComputeApi) -> LifecycleController {
        LifecycleController::new(
            InstanceConfig {
                endpoints: Endpoints {
                    identity_url: "https://identity.invalid".into(),
                    compute_url: "https://compute.invalid".into(),
                },
                credentials: Credentials {
                    tenant_id: "t".into(),
                    username: "u".into(),
                    password: "p".into(),
                },
                server_id: "main".into(),
            },
            Box::new(api.clone()),
            Box::new(FakeClock::at(datetime!(2024-03-01 00:00:00 UTC))),
            Accumulator::default(),
        )
    }

    #[test]
    fn parses_shell_lines() {
        assert_eq!(ChatCommand::parse_line("start"), Some(ChatCommand::Start));
        assert_eq!(ChatCommand::parse_line("  STOP "), Some(ChatCommand::Stop));
        assert_eq!(
            ChatCommand::parse_line("info abc-123"),
            Some(ChatCommand::Info {
                server_id: "abc-123".into()
            })
        );
        assert_eq!(ChatCommand::parse_line("info"), None);
        assert_eq!(ChatCommand::parse_line("status now"), None);
        assert_eq!(ChatCommand::parse_line("reboot"), None);
        assert_eq!(ChatCommand::parse_line(""), None);
    }

    #[tokio::test]
    async fn success_renders_controller_text() {
        let api = FakeComputeApi::new().with_server("main", InstanceStatus::Active);
        let mut ctl = controller(&api);

        let reply = dispatch(&mut ctl, &ChatCommand::Start).await;

        assert_eq!(reply, Reply::Success("サーバーは既に起動しています。".into()));
    }

    #[tokio::test]
    async fn any_error_renders_generic_failure() {
        let api = FakeComputeApi::new().with_server("main", InstanceStatus::Shutoff);
        let mut ctl = controller(&api);

        api.fail_action(Some(503));
        let reply = dispatch(&mut ctl, &ChatCommand::Start).await;
        assert!(reply.is_failure());
        assert_eq!(reply.to_string(), FAILURE_MESSAGE);

        let reply = dispatch(
            &mut ctl,
            &ChatCommand::Info {
                server_id: "missing".into(),
            },
        )
        .await;
        assert_eq!(reply, Reply::Failure);
    }
}
