use crate::accumulator::DEFAULT_HOURLY_RATE;
use crate::discord::{self, Registration};
use crate::interaction::handle_interaction;
use crate::model::{Settings, DEFAULT_COMPUTE_URL, DEFAULT_IDENTITY_URL};
use crate::orchestrator::{dispatch, ChatCommand, LifecycleController};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "conoha-lifecycle",
    version,
    about = "Start, stop and inspect a ConoHa VPS with running-time and cost tracking"
)]
pub struct Cli {
    #[command(flatten)]
    pub conoha: ConohaArgs,

    /// Debug-level logging for this crate (RUST_LOG overrides)
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Clone)]
pub struct ConohaArgs {
    /// Identity service endpoint
    #[arg(long, env = "CONOHA_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL)]
    pub identity_url: String,

    /// Compute service endpoint
    #[arg(long, env = "CONOHA_COMPUTE_URL", default_value = DEFAULT_COMPUTE_URL)]
    pub compute_url: String,

    /// Tenant (project) id
    #[arg(long, env = "CONOHA_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// API user name
    #[arg(long, env = "CONOHA_API_USERNAME")]
    pub api_username: Option<String>,

    /// API user password
    #[arg(long, env = "CONOHA_API_PASSWORD", hide_env_values = true)]
    pub api_password: Option<String>,

    /// Id of the server to control
    #[arg(long, env = "CONOHA_SERVER_ID")]
    pub server_id: Option<String>,

    /// Price per started hour, in yen
    #[arg(
        long,
        env = "CONOHA_HOURLY_RATE",
        default_value_t = DEFAULT_HOURLY_RATE,
        value_parser = parse_hourly_rate
    )]
    pub hourly_rate: f64,
}

fn check_hourly_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() || rate < 0.0 {
        bail!("hourly rate must be a finite, non-negative number of yen, got {rate}");
    }
    Ok(rate)
}

fn parse_hourly_rate(raw: &str) -> std::result::Result<f64, String> {
    let rate: f64 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    check_hourly_rate(rate).map_err(|e| e.to_string())
}

impl ConohaArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            identity_url: Some(self.identity_url.clone()),
            compute_url: Some(self.compute_url.clone()),
            tenant_id: self.tenant_id.clone(),
            api_username: self.api_username.clone(),
            api_password: self.api_password.clone(),
            server_id: self.server_id.clone(),
        }
    }

    fn connect(&self) -> Result<LifecycleController> {
        let rate = check_hourly_rate(self.hourly_rate)?;
        LifecycleController::connect(&self.settings(), rate)
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start the server (no-op when it is already running).
    /// Running time is only tracked inside `shell`
    Start,
    /// Stop the server. Running time and cost are only tracked inside `shell`,
    /// so a one-shot stop reports them as 未計測/未起動
    Stop,
    /// Show state, launch time, running time and cost
    Status,
    /// Show full details for any server id
    Info {
        /// Server id to inspect
        server_id: String,
    },
    /// Read chat commands from stdin, one per line, against one controller
    Shell,
    /// Answer one interaction webhook body with a JSON response envelope
    Interaction {
        /// Read the body from this file instead of stdin
        #[arg(long)]
        body: Option<std::path::PathBuf>,
    },
    /// Register the slash commands for one guild
    RegisterCommands {
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        bot_token: String,
        #[arg(long, env = "CLIENT_ID")]
        application_id: String,
        #[arg(long, env = "GUILD_ID")]
        guild_id: String,
    },
}

pub async fn run(args: Cli) -> Result<()> {
    match &args.command {
        Command::Start => run_once(&args.conoha, ChatCommand::Start).await,
        Command::Stop => run_once(&args.conoha, ChatCommand::Stop).await,
        Command::Status => run_once(&args.conoha, ChatCommand::Status).await,
        Command::Info { server_id } => {
            run_once(
                &args.conoha,
                ChatCommand::Info {
                    server_id: server_id.clone(),
                },
            )
            .await
        }
        Command::Shell => run_shell(&args.conoha).await,
        Command::Interaction { body } => run_interaction(&args.conoha, body.as_deref()).await,
        Command::RegisterCommands {
            bot_token,
            application_id,
            guild_id,
        } => {
            let count = discord::register_guild_commands(Registration {
                application_id,
                guild_id,
                bot_token,
            })
            .await?;
            println!("Registered {count} commands.");
            Ok(())
        }
    }
}

async fn run_once(conoha: &ConohaArgs, command: ChatCommand) -> Result<()> {
    let mut controller = conoha.connect()?;
    eprintln!("{}", command.pending_message());
    let reply = dispatch(&mut controller, &command).await;
    println!("{reply}");
    if reply.is_failure() {
        bail!("{} failed", command.name());
    }
    Ok(())
}

const SHELL_USAGE: &str = "commands: start | stop | status | info <server_id> | quit";

async fn run_shell(conoha: &ConohaArgs) -> Result<()> {
    let mut controller = conoha.connect()?;
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Controlling server {}. {SHELL_USAGE}",
        controller.server_id()
    )));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        let Some(command) = ChatCommand::parse_line(line) else {
            let _ = out_tx.send(OutputLine::Stderr(SHELL_USAGE.to_string()));
            continue;
        };
        let _ = out_tx.send(OutputLine::Stderr(command.pending_message().to_string()));
        let reply = dispatch(&mut controller, &command).await;
        let _ = out_tx.send(OutputLine::Stdout(reply.to_string()));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_interaction(conoha: &ConohaArgs, body: Option<&std::path::Path>) -> Result<()> {
    let raw = match body {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("read stdin")?;
            raw
        }
    };

    let response = handle_interaction(&raw, || conoha.connect()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
