//! Scratchrun CLI
//!
//! A command-line tool for compiling and running source files in
//! declaratively-configured languages, streaming the toolchain's output to
//! the terminal as it is produced.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scratchrun::{Appender, Config, Controller, EXAMPLE_CONFIG, OutputSinks, RunRequest};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scratchrun")]
#[command(about = "A tool for compiling and running code in configurable languages")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: scratchrun.toml)
        #[arg(short, long, default_value = "scratchrun.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Compile and run a source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., python3, java)
        #[arg(short, long)]
        language: String,

        /// File whose contents become the program's standard input
        /// (default: the language's default input, or empty)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List available languages
    Languages,

    /// Show default configuration
    ShowConfig,
}

/// ANSI-colored terminal sink.
///
/// Program output stays uncolored on stdout; program errors and pipeline
/// diagnostics go to stderr in red and blue respectively.
struct TerminalSink {
    color: Option<&'static str>,
    to_stderr: bool,
}

const COLOR_RED: &str = "\u{1b}[31m";
const COLOR_BLUE: &str = "\u{1b}[34m";
const COLOR_OFF: &str = "\u{1b}[0m";

impl Appender for TerminalSink {
    fn append(&self, text: &str) {
        match (self.to_stderr, self.color) {
            (false, None) => print!("{text}"),
            (false, Some(color)) => print!("{color}{text}{COLOR_OFF}"),
            (true, None) => eprint!("{text}"),
            (true, Some(color)) => eprint!("{color}{text}{COLOR_OFF}"),
        }
    }
}

fn terminal_sinks() -> OutputSinks {
    OutputSinks::new(
        Arc::new(TerminalSink {
            color: None,
            to_stderr: false,
        }),
        Arc::new(TerminalSink {
            color: Some(COLOR_RED),
            to_stderr: true,
        }),
        Arc::new(TerminalSink {
            color: Some(COLOR_BLUE),
            to_stderr: true,
        }),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            input,
        } => run_program(&config, &source, &language, input.as_deref()).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
    }
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Wrote {}", output.display());
    Ok(())
}

async fn run_program(
    config: &Config,
    source: &std::path::Path,
    language_id: &str,
    input: Option<&std::path::Path>,
) -> Result<()> {
    let language = config
        .get_language(language_id)
        .context("unknown language")?
        .clone();

    let source_text = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let input_text = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read input file")?,
        None => language.default_input.clone().unwrap_or_default(),
    };

    info!(language = %language.name, "running program");

    let mut controller = Controller::new().context("failed to create dependency cache")?;
    let request = RunRequest {
        source: source_text,
        input: input_text,
        language,
        sinks: terminal_sinks(),
    };

    let handle = controller.submit(request, || {});

    // Ctrl-C cancels the run; the pipeline still cleans up and the wait
    // below returns normally.
    let canceller = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling run");
            canceller.cancel();
        }
    });

    handle.wait().await;
    Ok(())
}

fn list_languages(config: &Config) {
    for id in config.language_ids() {
        // Registry lookups by id cannot fail for ids the registry produced.
        let Ok(language) = config.get_language(id) else {
            continue;
        };
        let mode = if language.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };
        println!("{id:<12} {} ({mode})", language.name);
    }
}
