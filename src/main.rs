//! # Local Wisdom CLI (`wisdom`)
//!
//! Collect proverbs and life lessons, flag near-duplicates with a
//! multilingual sentence-embedding model, and browse or export the corpus.
//!
//! ## Usage
//!
//! ```bash
//! wisdom --config ./config/wisdom.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wisdom init` | Create the store (directories or schema) |
//! | `wisdom submit <category> "<text>"` | Submit a contribution |
//! | `wisdom check <category> "<text>"` | Preview the duplicate check |
//! | `wisdom browse [category]` | List contributions, newest first |
//! | `wisdom export <category>` | Export a corpus as CSV or JSON |
//! | `wisdom languages` | List language options |
//! | `wisdom model` | Load the embedding model and report its status |
//! | `wisdom serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! wisdom submit proverb "కష్టే ఫలి" --language Telugu --region "Andhra Pradesh"
//! wisdom submit life-lesson "Always listen to your elders." --contributor Ravi
//! wisdom browse proverbs
//! wisdom export proverbs --format csv --output ./out/proverbs.csv
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use local_wisdom::browse;
use local_wisdom::config::{self, Config};
use local_wisdom::dedup::{SkipReason, Verdict};
use local_wisdom::embedding::{self, EmbedderHandle, SharedEmbedder};
use local_wisdom::export::{self, ExportFormat};
use local_wisdom::models::{Category, LANGUAGE_OPTIONS, OTHER_LANGUAGE};
use local_wisdom::server;
use local_wisdom::store;
use local_wisdom::submit::{Collector, Outcome, SubmitRequest};

/// Exit status when a submission is blocked as a duplicate.
const EXIT_DUPLICATE: u8 = 3;

/// Local Wisdom: a crowdsourced collection of proverbs and life lessons.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "wisdom",
    about = "Local Wisdom: collect proverbs and life lessons with duplicate detection",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wisdom.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store (data directory or database schema). Idempotent.
    Init,

    /// Submit a proverb or life lesson.
    ///
    /// Exits with status 3 when the text is blocked as a likely duplicate.
    Submit {
        /// `proverb` or `life-lesson`.
        category: Category,

        /// The proverb or lesson itself.
        text: String,

        /// One of the listed languages, `Other`, or any language name.
        #[arg(long, default_value = "")]
        language: String,

        /// Language name to use when `--language Other`.
        #[arg(long)]
        other_language: Option<String>,

        /// Region or community the text comes from.
        #[arg(long)]
        region: Option<String>,

        /// Contributor name. Defaults to Anonymous.
        #[arg(long)]
        contributor: Option<String>,

        /// Save even if a similar entry already exists.
        #[arg(long)]
        force: bool,
    },

    /// Check a text for duplicates without saving it.
    Check {
        category: Category,
        text: String,
    },

    /// List stored contributions, newest first.
    Browse {
        /// Limit to one category. Both are shown when omitted.
        category: Option<Category>,

        /// Print items as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Export a category's corpus.
    Export {
        category: Category,

        /// `csv` or `json`.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the language options offered to contributors.
    Languages,

    /// Load the embedding model and report whether it is available.
    Model,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Languages = cli.command {
        print_languages();
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = store::open_store(&cfg.store).await?;
            store.prepare().await?;
            println!(
                "Store initialized ({} at {}).",
                store.backend_name(),
                cfg.store.path.display()
            );
        }
        Commands::Submit {
            category,
            text,
            language,
            other_language,
            region,
            contributor,
            force,
        } => {
            let collector = collector(&cfg).await?;
            let request = SubmitRequest {
                category,
                text,
                language,
                other_language,
                region_hint: region,
                contributor,
                force,
            };
            let report = collector.submit(request).await?;

            if let Some(warning) = &report.corpus_warning {
                eprintln!("Warning: {}", warning);
            }
            print_verdict_notes(&report.verdict);

            match report.outcome {
                Outcome::Blocked => {
                    println!(
                        "Potential duplicate found! A very similar {} already exists:",
                        category.label().to_lowercase()
                    );
                    if let Some(matched) = &report.verdict.matched_text {
                        println!("  \"{}\"", matched);
                    }
                    if let Some(score) = report.verdict.score {
                        println!("  (similarity {:.2})", score);
                    }
                    println!("Not saved. Use --force to save it anyway.");
                    return Ok(ExitCode::from(EXIT_DUPLICATE));
                }
                Outcome::Accepted => {
                    if report.verdict.is_duplicate {
                        println!(
                            "Saved despite similarity to: \"{}\"",
                            report.verdict.matched_text.as_deref().unwrap_or("")
                        );
                    }
                    if let Some(item) = &report.item {
                        println!("Thank you! Your {} was saved.", category.label().to_lowercase());
                        println!("  id: {}", item.id);
                    }
                }
            }
        }
        Commands::Check { category, text } => {
            let collector = collector(&cfg).await?;
            let report = collector.preview(category, &text).await?;
            if let Some(warning) = &report.corpus_warning {
                eprintln!("Warning: {}", warning);
            }
            print_verdict_notes(&report.verdict);
            if report.verdict.is_duplicate {
                println!(
                    "Likely duplicate (threshold {:.2}): \"{}\"",
                    report.threshold,
                    report.verdict.matched_text.as_deref().unwrap_or("")
                );
            } else {
                match report.verdict.best_score {
                    Some(best) => println!(
                        "No duplicate found (best similarity {:.2}, threshold {:.2}).",
                        best, report.threshold
                    ),
                    None => println!("No duplicate found."),
                }
            }
        }
        Commands::Browse { category, json } => {
            let store = store::open_store(&cfg.store).await?;
            browse::run_browse(store.as_ref(), category, json).await?;
        }
        Commands::Export {
            category,
            format,
            output,
        } => {
            let store = store::open_store(&cfg.store).await?;
            export::run_export(store.as_ref(), category, format, output.as_deref()).await?;
        }
        Commands::Model => match embedding::load(&cfg.embedding).await {
            EmbedderHandle::Ready(embedder) => {
                println!("Model:      {}", embedder.model_name());
                match embedder.dims() {
                    Some(dims) => println!("Dimensions: {}", dims),
                    None => println!("Dimensions: unknown"),
                }
                println!("Status:     ready");
            }
            EmbedderHandle::Unavailable { reason } => {
                println!("Status:     unavailable");
                println!("Reason:     {}", reason);
                println!("Duplicate detection will be skipped.");
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Languages => unreachable!("handled before config loading"),
    }

    Ok(ExitCode::SUCCESS)
}

fn load_or_default(path: &std::path::Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

async fn collector(cfg: &Config) -> anyhow::Result<Collector> {
    let store = store::open_store(&cfg.store).await?;
    store.prepare().await?;
    Ok(Collector::new(
        store,
        SharedEmbedder::new(cfg.embedding.clone()),
        cfg.dedup.clone(),
    ))
}

fn print_verdict_notes(verdict: &Verdict) {
    match &verdict.skipped {
        None | Some(SkipReason::EmptyCorpus) => {}
        Some(reason) => eprintln!("Note: duplicate check skipped ({}).", reason),
    }
}

fn print_languages() {
    for language in LANGUAGE_OPTIONS {
        println!("{}", language);
    }
    println!("{}", OTHER_LANGUAGE);
}
