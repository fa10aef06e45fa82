//! # Sahayak CLI (`sahayak`)
//!
//! ## Usage
//!
//! ```bash
//! sahayak --config ./config/sahayak.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sahayak ingest <path>` | Extract a file, or every file under a directory |
//! | `sahayak scrape <url>` | Fetch a web page and store its visible text |
//! | `sahayak ask "<question>"` | Answer from the knowledge base |
//! | `sahayak generate` | Generate a worksheet or assessment |
//! | `sahayak sources` | List ingested records |
//! | `sahayak serve` | Start the HTTP API |
//! | `sahayak completions <shell>` | Print shell completions |
//!
//! A missing config file means built-in defaults. Logs go to stderr and are
//! filtered by `RUST_LOG` (default `info`).

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sahayak::config::Config;
use sahayak::models::Mode;
use sahayak::pipeline::Pipeline;
use sahayak::server;

/// Sahayak: ingest course material, answer questions from it, and generate
/// worksheets and assessments grounded in it.
#[derive(Parser)]
#[command(name = "sahayak", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/sahayak.toml`; built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/sahayak.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Extract a file, or every matching file under a directory, into the
    /// knowledge store.
    Ingest {
        /// File or directory to ingest.
        path: PathBuf,
    },

    /// Fetch a web page and store its visible text.
    Scrape {
        url: String,
    },

    /// Answer a question from the knowledge base.
    Ask {
        question: String,
    },

    /// Generate a worksheet or assessment from the knowledge base.
    Generate {
        /// Difficulty label, passed to the model verbatim.
        #[arg(long, default_value = "Medium")]
        difficulty: String,

        /// `worksheet` or `assessment`.
        #[arg(long, default_value = "worksheet")]
        mode: Mode,
    },

    /// List ingested records.
    Sources,

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "sahayak", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
        Commands::Ingest { path } => {
            let pipeline = Pipeline::from_config(cfg)?;
            if path.is_dir() {
                let records = pipeline.ingest_dir(&path).await?;
                for record in &records {
                    println!("{}  {}  {}", record.source_id, record.source_type, record.source_path);
                }
                println!("Ingested {} files.", records.len());
            } else {
                let record = pipeline.ingest_file(&path).await?;
                println!("{}  {}  {}", record.source_id, record.source_type, record.source_path);
            }
        }
        Commands::Scrape { url } => {
            let pipeline = Pipeline::from_config(cfg)?;
            let record = pipeline.ingest_url(&url).await?;
            println!(
                "{}  {}  {} ({} chars)",
                record.source_id,
                record.source_type,
                record.source_path,
                record.content.chars().count()
            );
        }
        Commands::Ask { question } => {
            let pipeline = Pipeline::from_config(cfg)?;
            let response = pipeline.ask(&question).await?;
            println!("{}", response.answer);
        }
        Commands::Generate { difficulty, mode } => {
            let pipeline = Pipeline::from_config(cfg)?;
            let response = pipeline.generate(&difficulty, mode).await?;
            println!("{}", response.result);
        }
        Commands::Sources => {
            let pipeline = Pipeline::from_config(cfg)?;
            let records = pipeline.records().await?;
            if records.is_empty() {
                println!("No sources ingested.");
            }
            for record in records {
                println!(
                    "{:<8} {:>8} chars  {}",
                    record.source_type.as_str().to_uppercase(),
                    record.content.chars().count(),
                    record.source_path
                );
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
