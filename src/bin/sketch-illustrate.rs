use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sketch_illustrator::{BatchDriver, BatchSettings, Config, Env, ResponsesImageClient};
use tracing_subscriber::EnvFilter;

/// Turn a directory of sketches into illustrated pages, skipping pages that
/// already have an output.
#[derive(Debug, Parser)]
#[command(name = "sketch-illustrate", version)]
struct Cli {
    /// `.env` file layered over the process environment.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
    /// TOML file with model, prompt, directories and timeout.
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long)]
    input_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json_logs: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn run(cli: Cli) -> sketch_illustrator::Result<()> {
    let env = Env::load_dotenv(&cli.env_file).await?;
    let mut settings = match &cli.settings {
        Some(path) => BatchSettings::load(path).await?,
        None => BatchSettings::default(),
    };
    if let Some(dir) = cli.input_dir {
        settings.input_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    let config = Config::from_env(&env, settings)?;
    tracing::debug!(?config, "configuration loaded");

    let client = ResponsesImageClient::from_config(&config)?;
    let report = BatchDriver::new(&config, &client).run().await?;
    print!("{report}");
    tracing::info!(
        attempted = report.attempted(),
        succeeded = report.succeeded(),
        skipped = report.skipped(),
        empty = report.empty(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sketch-illustrate failed: {err}");
            ExitCode::FAILURE
        }
    }
}
