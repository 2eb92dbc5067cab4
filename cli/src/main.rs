// launchgate — desktop shell for the launch decision core
//
// Persists launch state locally, runs a launch sequence against the configured
// endpoint and prints the state a presentation layer would render.

mod config;
mod provider;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use launchgate_core::push::notification_destination;
use launchgate_core::{
    LaunchOrchestrator, LaunchState, ModeStore, NoPush, OperatingMode, PushProvider, StaticPush,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "launchgate")]
#[command(about = "Launch decision shell: web experience or native", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a launch sequence
    Launch {
        /// Conversion data JSON; without it the provider never reports
        #[arg(short, long)]
        conversion: Option<PathBuf>,
        /// Deep-link click event JSON
        #[arg(short, long)]
        deep_link: Option<PathBuf>,
        /// Retries after a connectivity failure
        #[arg(short, long, default_value = "0")]
        retries: u32,
        /// Seconds between retries
        #[arg(long, default_value = "3")]
        retry_delay: u64,
    },
    /// Show persisted launch state
    Status,
    /// Forget the persisted decision; the next launch is a first launch
    Reset,
    /// Push permission prompt cooldown
    Push {
        #[command(subcommand)]
        action: PushAction,
    },
    /// Resolve the destination carried by a notification payload
    Notification { payload: PathBuf },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PushAction {
    /// Would the permission prompt be offered now?
    Check,
    /// Record that the user deferred the prompt
    Defer,
    /// Clear the deferral marker
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Launch {
            conversion,
            deep_link,
            retries,
            retry_delay,
        } => cmd_launch(conversion, deep_link, retries, retry_delay).await,
        Commands::Status => cmd_status(),
        Commands::Reset => cmd_reset(),
        Commands::Push { action } => cmd_push(action),
        Commands::Notification { payload } => cmd_notification(&payload),
        Commands::Config { action } => cmd_config(action),
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().context("Log file needs a file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

async fn cmd_launch(
    conversion: Option<PathBuf>,
    deep_link: Option<PathBuf>,
    retries: u32,
    retry_delay: u64,
) -> Result<()> {
    let config = config::Config::load()?;
    let store = config.open_store()?;

    let conversion = conversion.as_deref().map(provider::load_payload).transpose()?;
    let deep_link = deep_link.as_deref().map(provider::load_payload).transpose()?;
    let attribution = Arc::new(provider::ScriptedProvider::new(
        conversion,
        deep_link,
        config.attribution_id.clone(),
    ));

    let push: Arc<dyn PushProvider> = if config.push_token.is_some() || config.project_id.is_some() {
        Arc::new(StaticPush {
            token: config.push_token.clone(),
            project_id: config.project_id.clone(),
        })
    } else {
        Arc::new(NoPush)
    };

    let orchestrator = LaunchOrchestrator::from_settings(
        &config.settings,
        store.clone(),
        attribution,
        push,
        config.device_profile(),
    )
    .context("Invalid launch settings")?;

    println!("{}", "Launching...".bold());
    if store.is_first_launch() {
        println!(
            "  {} First launch, waiting up to {}ms for attribution",
            "•".bright_blue(),
            config.settings.attribution_timeout_ms
        );
    } else {
        println!("  {} Persisted mode: {}", "•".bright_blue(), store.get_mode());
    }

    let mut state = orchestrator.start().await?;
    let mut attempt = 0;
    while state == LaunchState::NoConnectivity && attempt < retries {
        attempt += 1;
        println!(
            "  {} No connectivity, retrying in {}s ({}/{})",
            "!".yellow(),
            retry_delay,
            attempt,
            retries
        );
        tokio::time::sleep(Duration::from_secs(retry_delay)).await;
        state = orchestrator.retry().await?;
    }

    println!();
    print_state(&state);

    if matches!(state, LaunchState::ResolvedWeb(_)) && store.should_offer_push_prompt() {
        println!(
            "  {} Push permission prompt would be offered",
            "•".bright_blue()
        );
    }

    Ok(())
}

fn print_state(state: &LaunchState) {
    match state {
        LaunchState::ResolvedWeb(url) => {
            println!("{} Web experience: {}", "✓".green(), url.bright_cyan());
        }
        LaunchState::ResolvedNative => {
            println!("{} Native experience", "✓".green());
        }
        LaunchState::NoConnectivity => {
            println!(
                "{} No connectivity. Run {} again to retry.",
                "✗".red(),
                "launchgate launch".bright_green()
            );
        }
        LaunchState::Loading => println!("{} Still loading", "…".yellow()),
    }
}

fn cmd_status() -> Result<()> {
    let config = config::Config::load()?;
    let store = config.open_store()?;

    println!("{}", "Launch State".bold());
    print_store(&store);
    Ok(())
}

fn print_store(store: &ModeStore) {
    let mode = store.get_mode();
    let mode_label = match mode {
        OperatingMode::Undetermined => mode.to_string().yellow(),
        _ => mode.to_string().bright_cyan(),
    };
    println!("  Mode:        {}", mode_label);

    match store.get_destination() {
        Some(destination) => {
            let expiry = chrono::DateTime::from_timestamp(destination.expires_at as i64, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| destination.expires_at.to_string());
            let freshness = if destination.is_expired_at(store.now()) {
                "expired".red()
            } else {
                "fresh".green()
            };
            println!("  Destination: {}", destination.url.bright_cyan());
            println!("  Expires:     {} ({})", expiry, freshness);
        }
        None => println!("  Destination: {}", "(none)".dimmed()),
    }

    let prompt = if store.should_offer_push_prompt() {
        "available".green()
    } else {
        "cooling down".yellow()
    };
    println!("  Push prompt: {}", prompt);
}

fn cmd_reset() -> Result<()> {
    let config = config::Config::load()?;
    let store = config.open_store()?;
    store.reset_all();
    println!("{} Launch state cleared", "✓".green());
    Ok(())
}

fn cmd_push(action: PushAction) -> Result<()> {
    let config = config::Config::load()?;
    let store = config.open_store()?;

    match action {
        PushAction::Check => {
            if store.should_offer_push_prompt() {
                println!("{} Push prompt may be offered", "✓".green());
            } else {
                println!("{} Push prompt deferred recently", "•".yellow());
            }
        }
        PushAction::Defer => {
            store.record_push_deferral();
            println!("{} Push prompt deferred for 3 days", "✓".green());
        }
        PushAction::Clear => {
            store.clear_push_deferral();
            println!("{} Push deferral cleared", "✓".green());
        }
    }

    Ok(())
}

fn cmd_notification(payload: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(payload)
        .with_context(|| format!("Failed to read {}", payload.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).context("Notification payload is not JSON")?;

    match notification_destination(&value) {
        Some(url) => println!("{} Open: {}", "✓".green(), url.bright_cyan()),
        None => println!("{} Notification carries no destination", "•".yellow()),
    }
    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Unknown config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<26} {}", key.bright_cyan(), value);
            }
        }
    }

    Ok(())
}
