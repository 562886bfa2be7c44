//! HTTP-triggered interaction entry point.
//!
//! Takes the raw JSON body of a chat-platform interaction and produces the response
//! envelope. Pings are acknowledged without building a controller.

use crate::orchestrator::{dispatch, ChatCommand, LifecycleController, Reply};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const SUB_COMMAND: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

const UNKNOWN_COMMAND_MESSAGE: &str = "不明なコマンドです。";
const ERROR_MESSAGE: &str = "エラーが発生しました。";

#[derive(Debug, Deserialize)]
struct InteractionBody {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<InteractionData>,
}

#[derive(Debug, Default, Deserialize)]
struct InteractionData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
struct CommandOption {
    name: String,
    #[serde(rename = "type", default)]
    kind: u8,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Ping,
    Command(ChatCommand),
    Unknown(String),
}

/// Status code plus JSON body, ready to hand back to the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl InteractionResponse {
    fn pong() -> Self {
        Self {
            status_code: 200,
            body: serde_json::json!({ "type": PING }),
        }
    }

    fn message(status_code: u16, content: &str) -> Self {
        Self {
            status_code,
            body: serde_json::json!({
                "type": CHANNEL_MESSAGE_WITH_SOURCE,
                "data": { "content": content }
            }),
        }
    }
}

fn string_option<'a>(options: &'a [CommandOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_ref())
        .and_then(|v| v.as_str())
}

pub fn parse_interaction(raw: &str) -> Result<Interaction> {
    let body: InteractionBody = serde_json::from_str(raw).context("parse interaction body")?;
    if body.kind == PING {
        return Ok(Interaction::Ping);
    }
    if body.kind != APPLICATION_COMMAND {
        return Ok(Interaction::Unknown(format!("interaction type {}", body.kind)));
    }

    let data = body.data.unwrap_or_default();
    // Commands may arrive as a subcommand of one top-level command, or as the command itself.
    let (name, options) = match data.options.first() {
        Some(sub) if sub.kind == SUB_COMMAND => (Some(sub.name.as_str()), &sub.options),
        _ => (data.name.as_deref(), &data.options),
    };
    let name = name.unwrap_or_default();

    let command = match name {
        "start" => ChatCommand::Start,
        "stop" => ChatCommand::Stop,
        "status" => ChatCommand::Status,
        "info" => match string_option(options, "server_id") {
            Some(id) => ChatCommand::Info {
                server_id: id.to_string(),
            },
            None => return Ok(Interaction::Unknown("info without server_id".into())),
        },
        other => return Ok(Interaction::Unknown(other.to_string())),
    };
    Ok(Interaction::Command(command))
}

/// Handle one interaction body. `connect` is only called for real commands.
pub async fn handle_interaction<F>(raw: &str, connect: F) -> InteractionResponse
where
    F: FnOnce() -> Result<LifecycleController>,
{
    let command = match parse_interaction(raw) {
        Ok(Interaction::Ping) => return InteractionResponse::pong(),
        Ok(Interaction::Unknown(what)) => {
            warn!(%what, "unsupported interaction");
            return InteractionResponse::message(200, UNKNOWN_COMMAND_MESSAGE);
        }
        Ok(Interaction::Command(command)) => command,
        Err(e) => {
            error!("rejecting interaction: {e:#}");
            return InteractionResponse::message(500, ERROR_MESSAGE);
        }
    };

    let mut controller = match connect() {
        Ok(c) => c,
        Err(e) => {
            error!("controller unavailable: {e:#}");
            return InteractionResponse::message(500, ERROR_MESSAGE);
        }
    };

    match dispatch(&mut controller, &command).await {
        Reply::Success(text) => InteractionResponse::message(200, &text),
        Reply::Failure => InteractionResponse::message(500, ERROR_MESSAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::Accumulator;
    use crate::model::{Credentials, Endpoints, InstanceConfig, InstanceStatus};
    use crate::testing::{FakeClock, FakeComputeApi};
    use time::macros::datetime;

    fn connector(api: FakeComputeApi) -> impl FnOnce() -> Result<LifecycleController> {
        move || {
            Ok(LifecycleController::new(
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
                Box::new(api),
                Box::new(FakeClock::at(datetime!(2024-03-01 00:00:00 UTC))),
                Accumulator::default(),
            ))
        }
    }

    #[test]
    fn parses_subcommand_and_top_level_forms() {
        let sub = r#"{"type":2,"data":{"name":"valheim","options":[{"name":"stop","type":1}]}}"#;
        assert_eq!(
            parse_interaction(sub).unwrap(),
            Interaction::Command(ChatCommand::Stop)
        );

        let top = r#"{"type":2,"data":{"name":"info","options":[{"name":"server_id","type":3,"value":"abc"}]}}"#;
        assert_eq!(
            parse_interaction(top).unwrap(),
            Interaction::Command(ChatCommand::Info {
                server_id: "abc".into()
            })
        );

        let bare = r#"{"type":2,"data":{"name":"info"}}"#;
        assert!(matches!(
            parse_interaction(bare).unwrap(),
            Interaction::Unknown(_)
        ));
    }

    #[tokio::test]
    async fn ping_is_acknowledged_without_controller() {
        let resp = handle_interaction(r#"{"type":1}"#, || {
            panic!("ping must not build a controller")
        })
        .await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, serde_json::json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn unknown_command_gets_fixed_message() {
        let api = FakeComputeApi::new();
        let resp = handle_interaction(
            r#"{"type":2,"data":{"name":"reboot"}}"#,
            connector(api.clone()),
        )
        .await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body["data"]["content"], "不明なコマンドです。");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn command_result_is_wrapped_in_envelope() {
        let api = FakeComputeApi::new().with_server("main", InstanceStatus::Shutoff);
        let resp = handle_interaction(
            r#"{"type":2,"data":{"name":"start"}}"#,
            connector(api.clone()),
        )
        .await;
        assert_eq!(resp.status_code, 200);
        assert_eq!(
            resp.body,
            serde_json::json!({ "type": 4, "data": { "content": "サーバーを起動しました。" } })
        );
    }

    #[tokio::test]
    async fn failures_map_to_500() {
        let api = FakeComputeApi::new().with_server("main", InstanceStatus::Active);
        api.fail_fetch(Some(500));
        let resp = handle_interaction(
            r#"{"type":2,"data":{"name":"status"}}"#,
            connector(api),
        )
        .await;
        assert_eq!(resp.status_code, 500);
        assert_eq!(resp.body["data"]["content"], "エラーが発生しました。");

        let resp = handle_interaction("not json", || panic!("never reached")).await;
        assert_eq!(resp.status_code, 500);
    }
}
