//! ScriptDev command line
//!
//! Runs script snippets through the worker pool and shared session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scriptdev::shell::{format_result, parse_args, run_shell};
use scriptdev::{ScriptArgs, ScriptDevConfig, ScriptHost, Variant};

/// Asynchronous script execution engine
#[derive(Parser, Debug)]
#[command(name = "scriptdev")]
#[command(about = "Run scripts through a worker pool and shared interpreter session", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./scriptdev.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long, global = true)]
    threads: Option<i64>,

    /// Report script diagnostics as warnings
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one snippet and print the result
    Exec {
        /// Script text
        code: String,

        /// Bind a named argument (repeatable)
        #[arg(short, long = "arg", value_name = "NAME=VALUE")]
        args: Vec<String>,
    },

    /// Execute a script file
    Run {
        /// Path to the script
        file: PathBuf,
    },

    /// Read scripts from stdin, one per line
    Shell,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("scriptdev=info,scriptdev_runtime=info,scriptdev_scheduler=info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = ScriptDevConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(threads) = args.threads {
        config.num_threads = threads;
    }
    config.debug |= args.debug;

    match args.command {
        Command::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
            Ok(())
        }
        Command::Exec { code, args: bindings } => {
            let bindings = parse_args(bindings.iter().map(String::as_str))?;
            let host = start(config)?;
            let ok = print_outcome(&host, &code, bindings, args.json);
            host.shutdown()?;
            exit_status(ok)
        }
        Command::Run { file } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let host = start(config)?;
            info!("Running {}", file.display());
            let ok = print_outcome(&host, &code, ScriptArgs::new(), args.json);
            host.shutdown()?;
            exit_status(ok)
        }
        Command::Shell => {
            let host = start(config)?;
            let stdin = std::io::stdin();
            let failures = run_shell(&host, stdin.lock(), std::io::stdout(), args.json)?;
            host.shutdown()?;
            exit_status(failures == 0)
        }
    }
}

fn start(config: ScriptDevConfig) -> Result<ScriptHost> {
    info!(
        "Starting scriptdev v{} with {} workers",
        env!("CARGO_PKG_VERSION"),
        config.worker_threads()
    );
    ScriptHost::start(config).context("Failed to start script host")
}

/// Print the outcome of one script. Absent results print nothing in text mode.
fn print_outcome(host: &ScriptHost, code: &str, bindings: ScriptArgs, json: bool) -> bool {
    let result = host.run(code, bindings);
    let ok = result.is_ok();

    if json || !matches!(result, Ok(Variant::None)) {
        let line = format_result(&result, json);
        if ok {
            println!("{}", line);
        } else {
            eprintln!("{}", line);
        }
    }
    let _ = std::io::stdout().flush();
    ok
}

fn exit_status(ok: bool) -> Result<()> {
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
