//! rollout-watch — entry point.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rollout_watch::StateStore;
use rollout_watch_cli::{ConfigOverrides, WatchConfig, Watcher};

#[derive(Parser)]
#[command(
    name = "rollout-watch",
    about = "Watch a firmware rollout table and send Telegram alerts for new builds and waves",
    version,
    after_help = "Run with no command to perform a single check."
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Rollout page URL. Also reads ROLLOUT_WATCH_URL.
    #[arg(long, global = true)]
    url: Option<String>,

    /// Path to the state file. Also reads ROLLOUT_WATCH_STATE.
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Minimum count growth reported as a wave. Also reads ROLLOUT_WATCH_THRESHOLD.
    #[arg(long, global = true)]
    threshold: Option<u64>,

    /// Telegram bot token. Also reads TELEGRAM_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Telegram chat id. Also reads CHAT_ID.
    #[arg(long, global = true)]
    chat_id: Option<String>,

    /// Telegram Bot API base URL. Also reads TELEGRAM_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl From<SettingsArgs> for ConfigOverrides {
    fn from(args: SettingsArgs) -> Self {
        ConfigOverrides {
            source_url: args.url,
            state_file: args.state_file,
            wave_threshold: args.threshold,
            bot_token: args.token,
            chat_id: args.chat_id,
            api_base: args.api_base,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the rollout table once and alert on changes (default).
    Check {
        /// Classify and log, but do not notify or write state.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the saved version and count.
    Status,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Check { dry_run: false });

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "rollout-watch", &mut std::io::stdout());
        return Ok(());
    }

    let config = WatchConfig::resolve(&cli.settings.into())?;

    match command {
        Commands::Check { dry_run } => {
            if !config.has_credentials() && !dry_run {
                tracing::warn!("TELEGRAM_TOKEN or CHAT_ID not set, alerts will be skipped");
            }

            let watcher = Watcher::new(&config)?;
            match watcher.run_once(dry_run).await {
                Ok(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                }
                Err(e) if e.is_transient() => {
                    // Logged and dropped; the next scheduled run retries.
                    tracing::error!("{e}");
                    if cli.json {
                        let out = serde_json::json!({ "error": true, "message": e.to_string() });
                        println!("{}", serde_json::to_string_pretty(&out)?);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Status => {
            let store = StateStore::new(config.state_file_path.clone());
            let state = store.load()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("  State file: {}", store.path().display());
                if state.is_fresh() {
                    println!("  No version recorded yet.");
                } else {
                    println!("  Version: {}", state.last_version);
                    println!("  Count:   {}", state.last_count);
                }
            }
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
