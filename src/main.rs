//! ghostshell - AI ghost-text completions for your shell
//!
//! USAGE:
//!   ghostshell                     # run $SHELL with inline suggestions
//!   ghostshell --model <id>        # pick the completion model
//!   ghostshell doctor              # check config, key, directories
//!   ghostshell config set key <v>  # non-interactive config

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use ghostshell::app::Runtime;
use ghostshell::audit::{self, AuditLog};
use ghostshell::completion::{CompletionClient, OpenAiBackend};
use ghostshell::config::{self, Config};
use ghostshell::logging::{self, LogConfig, LogLevel};
use ghostshell::terminal::RawModeGuard;

// ═══════════════════════════════════════════════════════════════
// CLI
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Parser)]
#[command(name = "ghostshell", version, about = "Inline AI completions for your shell")]
struct Cli {
    /// Completion model
    #[arg(short, long)]
    model: Option<String>,

    /// Shell to run (default: $SHELL)
    #[arg(short, long)]
    shell: Option<String>,

    /// Quiet period before asking for a suggestion
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Don't write completion records to the state directory
    #[arg(long)]
    no_audit: bool,

    #[arg(long, value_enum, env = "GHOSTSHELL_LOG_LEVEL", default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Log file (default: ~/.local/state/ghostshell/ghostshell.log)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check config, key and directories
    Doctor,
    /// Edit the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Set a value: key, api_base, model, shell, debounce_ms
    Set { key: String, value: String },
}

// ═══════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    // .env in the working directory, like most API-key tools
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Doctor) => run_doctor(),
        Some(Command::Config { action: ConfigAction::Set { key, value } }) => {
            run_config_set(key, value)
        }
        None => {
            let code = run_shell(&cli)?;
            std::process::exit(code);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════

fn run_shell(cli: &Cli) -> Result<i32> {
    let mut cfg = Config::load()?;
    if let Some(model) = &cli.model {
        cfg.model = model.clone();
    }
    if let Some(shell) = &cli.shell {
        cfg.shell = Some(shell.clone());
    }
    if let Some(ms) = cli.debounce_ms {
        cfg.debounce_ms = ms;
    }
    if cli.no_audit {
        cfg.audit = false;
    }

    let log_file = match &cli.log_file {
        Some(path) => path.clone(),
        None => config::log_path()?,
    };
    // dropped when this returns, before main calls exit
    let _log_guard = logging::init(&LogConfig {
        level: cli.log_level,
        file: log_file,
    })?;

    let api_key = cfg.resolve_api_key().unwrap_or_else(|| {
        warn!("no API key configured; suggestions are disabled");
        String::new()
    });
    let audit = if cfg.audit {
        Some(AuditLog::open_default()?)
    } else {
        None
    };
    let backend = OpenAiBackend::new(&cfg.api_base, &api_key, &cfg.model, cfg.max_tokens);
    let client = CompletionClient::new(Arc::new(backend), audit, cfg.request_timeout());

    let runtime = Runtime {
        shell: cfg.resolve_shell(),
        debounce: cfg.debounce(),
        scrollback_chars: cfg.scrollback_chars,
        client,
    };
    info!(shell = %runtime.shell, model = %cfg.model, "starting session");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let mut guard = RawModeGuard::enter()?;
    let result = rt.block_on(runtime.run());
    guard.restore();

    let code = result?;
    println!("Shell process exited with code {}", code);
    Ok(code)
}

fn run_doctor() -> Result<()> {
    println!("ghostshell doctor\n");

    let cfg = Config::load()?;
    println!("[✓] Config: {}", config::config_path()?.display());

    let has_key = cfg.resolve_api_key().is_some();
    println!(
        "[{}] API key: {}",
        if has_key { "✓" } else { "✗" },
        if has_key {
            "configured".to_string()
        } else {
            format!("missing (set {} or run: ghostshell config set key <key>)", config::API_KEY_ENV)
        }
    );

    println!("[✓] Shell: {}", cfg.resolve_shell());
    println!("[✓] Model: {} via {}", cfg.model, cfg.api_base);

    match AuditLog::open(audit::completions_dir()?) {
        Ok(log) => println!("[✓] Audit records: {}", log.dir().display()),
        Err(e) => println!("[✗] Audit records: {}", e),
    }
    println!("[✓] Log file: {}", config::log_path()?.display());

    Ok(())
}

fn run_config_set(key: &str, value: &str) -> Result<()> {
    let mut cfg = Config::load()?;
    cfg.set(key, value)?;
    cfg.save()?;
    println!("{} saved to {}", key, config::config_path()?.display());
    Ok(())
}
