use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, Level};

use reviewgate_action::{report, run, Args, Config, Outcome};
use reviewgate_core::Verdict;

async fn gate(args: &Args) -> Result<Verdict> {
    let config = Config::from_env(args)?;
    run(&config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting review gate");

    let outcome = match gate(&args).await {
        Ok(verdict) => Outcome::from_verdict(&verdict),
        Err(e) => {
            error!("Review gate failed: {:#}", e);
            Outcome::from_error(&e)
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = report(&outcome, &mut stdout) {
        error!("Failed to report outcome: {}", e);
        return ExitCode::FAILURE;
    }

    outcome.exit_code()
}
