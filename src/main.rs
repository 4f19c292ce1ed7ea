use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use herald::config::{Config, KNOWN_KEYS};
use herald::consts::default_db_path;
use herald::report::render;
use herald::runner::{Runner, Strategy};
use herald::sources::Source;
use herald::sources::http::HttpSource;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Ask every server at once. Keep the first answer, or give up on time.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// URLs to query, all at once
    urls: Vec<String>,

    /// How to combine the answers (default: stored config, then race)
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,

    /// Overall timeout in milliseconds (default: stored config, then 3000)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Abort requests still in flight once the result is decided
    #[arg(long, default_value_t = false)]
    abort_losers: bool,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// SQLite database holding stored defaults
    #[arg(short, long)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Read or change stored defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,

        /// SQLite database holding stored defaults
        #[arg(short, long)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print one stored value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Remove a stored value
    Unset { key: String },
    /// Print every stored value
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "herald=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Some(Command::Config { action, db }) = cli.command {
        let config = open_config(db)?;
        handle_config(&config, action)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.urls.is_empty() {
        anyhow::bail!("no URLs given (see herald --help)");
    }

    let config = open_config(cli.db)?;
    let mut runner_config = config.runner_config()?;
    if let Some(strategy) = cli.strategy {
        runner_config.strategy = strategy;
    }
    if let Some(ms) = cli.timeout {
        if ms == 0 {
            anyhow::bail!("--timeout must be greater than zero");
        }
        runner_config.timeout = Duration::from_millis(ms);
    }
    if cli.abort_losers {
        runner_config.abort_losers = true;
    }

    let source: Arc<dyn Source> = Arc::new(HttpSource::new(
        cli.request_timeout.map(Duration::from_millis),
    )?);
    let runner = Runner::new(source, runner_config);
    let report = runner.run(&cli.urls).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report, &cli.urls));
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn open_config(db: Option<PathBuf>) -> anyhow::Result<Config> {
    let path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path = path.to_str().context("database path is not valid UTF-8")?;
    Config::open(path)
}

fn handle_config(config: &Config, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("✓ {} = {}", key, value);
        }
        ConfigAction::Unset { key } => {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                anyhow::bail!("unknown config key: {} (known: {})", key, KNOWN_KEYS.join(", "));
            }
            config.remove(&key)?;
            println!("✓ {} unset", key);
        }
        ConfigAction::List => {
            let entries = config.entries()?;
            if entries.is_empty() {
                println!("no stored values (known keys: {})", KNOWN_KEYS.join(", "));
            }
            for (key, value) in entries {
                println!("{} = {}", key, value);
            }
        }
    }
    Ok(())
}
