//! Slash-command definitions and guild registration.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

const API_BASE: &str = "https://discord.com/api/v10";

// Application command option types.
const OPTION_STRING: u8 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct CommandOptionDef {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionDef>,
}

pub fn command_definitions() -> Vec<CommandDef> {
    vec![
        CommandDef {
            name: "start",
            description: "Valheimサーバーを起動します",
            options: Vec::new(),
        },
        CommandDef {
            name: "stop",
            description: "Valheimサーバーを停止します",
            options: Vec::new(),
        },
        CommandDef {
            name: "status",
            description: "Valheimサーバーの状態を確認します",
            options: Vec::new(),
        },
        CommandDef {
            name: "info",
            description: "サーバーの詳細情報を表示します",
            options: vec![CommandOptionDef {
                kind: OPTION_STRING,
                name: "server_id",
                description: "サーバーID",
                required: true,
            }],
        },
    ]
}

pub struct Registration<'a> {
    pub application_id: &'a str,
    pub guild_id: &'a str,
    pub bot_token: &'a str,
}

/// Replace the guild's command set with [`command_definitions`].
pub async fn register_guild_commands(reg: Registration<'_>) -> Result<usize> {
    let commands = command_definitions();
    let url = format!(
        "{API_BASE}/applications/{}/guilds/{}/commands",
        reg.application_id, reg.guild_id
    );

    info!(count = commands.len(), guild_id = reg.guild_id, "registering slash commands");
    let resp = reqwest::Client::new()
        .put(&url)
        .header(reqwest::header::AUTHORIZATION, format!("Bot {}", reg.bot_token))
        .json(&commands)
        .send()
        .await
        .context("send command registration")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("command registration rejected ({status}): {body}");
    }
    Ok(commands.len())
}
