use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;
use coffer_console::{Command, CofferCli, Config, Console, logging, shell};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = CofferCli::parse();
    logging::init(cli.log_level);

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let console = config.console()?;

    match cli.command {
        Command::Identity => console.load_identity().await,
        Command::List { .. } => {
            require_bucket(&console)?;
            console.load().await;
        }
        Command::Upload => {
            require_bucket(&console)?;
            console.load_identity().await;
            if console.snapshot().identity.value().is_some() {
                console.upload_test_object().await;
            }
        }
        Command::Shell => {
            let input = BufReader::new(tokio::io::stdin());
            shell::run(&console, input, tokio::io::stdout()).await?;
            return Ok(ExitCode::SUCCESS);
        }
    }

    // Failures are already part of the rendered output
    let state = console.snapshot();
    print!("{}", state.render());

    Ok(if state.has_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn require_bucket(console: &Console) -> Result<()> {
    if console.bucket().is_empty() {
        bail!("no bucket given; pass --bucket or set COFFER_BUCKET");
    }
    Ok(())
}
