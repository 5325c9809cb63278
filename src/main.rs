use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod config;
mod llm;
mod run;
mod site;
mod telemetry;

#[derive(Parser)]
#[command(name = "digest", about = "RSS summarization pipeline CLI")]
struct Cli {
    /// Path to the TOML config file
    #[arg(global = true, short, long, default_value = "config.toml")]
    config: String,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(run::RunCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and DIGEST_LOG_FORMAT
    telemetry::config::init_tracing();

    let cfg = config::AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run(args) => run::run(&cfg, args).await?,
    }

    Ok(())
}
