use anyhow::Result;
use clap::Parser;
use conoha_lifecycle::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let args = cli::Cli::parse();
    logging::init(args.verbose);

    cli::run(args).await
}
