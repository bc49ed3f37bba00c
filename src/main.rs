use clap::{Parser, Subcommand};
use portfolio_service::{
    cache::{Cache, DEFAULT_OPERATION_TIMEOUT},
    loader, logging, Config, PortfolioService,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Portfolio document to read
    #[arg(short, long, global = true, env = "CONFIG_FILE_PATH")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the document parses and validates
    Validate,
    /// Print the enriched configuration as JSON
    Populate {
        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(path) = cli.config {
        config.config_file_path = path;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;
    logging::init(&config.log_level)?;

    match cli.command {
        Command::Validate => {
            let raw = loader::load(&config.config_file_path).await?;
            println!(
                "{} is valid: {} link(s), {} project(s)",
                config.config_file_path.display(),
                raw.links.as_ref().map_or(0, Vec::len),
                raw.projects.as_ref().map_or(0, Vec::len),
            );
        }
        Command::Populate { pretty } => {
            let cache = match &config.redis_url {
                Some(url) => Cache::connect(url, DEFAULT_OPERATION_TIMEOUT).await,
                None => Cache::disabled(),
            };
            let service = PortfolioService::from_config(&config, cache.clone())?;
            let populated = service.configuration().await;
            cache.shutdown().await;

            let populated = populated?;
            let output = if pretty {
                serde_json::to_string_pretty(&populated)?
            } else {
                serde_json::to_string(&populated)?
            };
            println!("{}", output);
        }
    }
    Ok(())
}
