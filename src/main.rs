use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, warn};

use job_scraper::convert::{DocumentConverter, PandocRenderer};
use job_scraper::fetch::HttpFetcher;
use job_scraper::output;
use job_scraper::pipeline::{self, ExecutionMode, Pipeline, PipelineConfig};
use job_scraper::registry::JobEntry;

#[derive(Parser)]
#[command(name = "job_scraper", about = "Job listings crawler that saves each posting as a .docx")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover categories and postings, then convert every posting
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        /// Don't write jobs.csv
        #[arg(long)]
        no_csv: bool,
    },
    /// Discover categories and postings only; writes jobs.csv
    Discover {
        #[command(flatten)]
        crawl: CrawlArgs,
        /// Print the accepted postings as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the fallback converter (pandoc) is installed
    Check,
}

#[derive(Args)]
struct CrawlArgs {
    /// Site root to start from
    #[arg(long, default_value = pipeline::ROOT_URL)]
    root: String,
    /// Directory the category folders are created in
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
    /// Fetch one page at a time, or fan out
    #[arg(long, value_enum, default_value_t = Mode::Concurrent)]
    mode: Mode,
    /// Max requests/conversions in flight in concurrent mode
    #[arg(short, long, default_value_t = pipeline::DEFAULT_WORKERS)]
    workers: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Sequential,
    Concurrent,
}

impl CrawlArgs {
    fn into_config(self, write_csv: bool) -> PipelineConfig {
        let mode = match self.mode {
            Mode::Sequential => ExecutionMode::Sequential,
            Mode::Concurrent => ExecutionMode::Concurrent {
                workers: self.workers,
            },
        };
        PipelineConfig {
            root_url: self.root,
            out_dir: self.out,
            mode,
            write_csv,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { crawl, no_csv } => {
            if !PandocRenderer::default().is_available() {
                error!("pandoc not found; postings the primary converter rejects will fail");
            }
            let config = crawl.into_config(!no_csv);
            let pipeline = Pipeline::new(HttpFetcher::new()?, DocumentConverter::standard(), config);
            println!(
                "Crawling {} into {}",
                pipeline.config().root_url,
                pipeline.config().out_dir.display()
            );

            let report = pipeline.run().await?;
            println!(
                "Done: {} categories, {} postings, {} converted ({} via fallback).",
                report.categories, report.postings, report.converted, report.via_fallback
            );
            if report.fetch_failed + report.not_found + report.conversion_failed > 0 {
                println!(
                    "Skipped: {} fetch errors, {} without content, {} conversion failures.",
                    report.fetch_failed, report.not_found, report.conversion_failed
                );
            }
            Ok(())
        }
        Commands::Discover { crawl, json } => {
            let config = crawl.into_config(true);
            let out_dir = config.out_dir.clone();
            let pipeline = Pipeline::new(HttpFetcher::new()?, DocumentConverter::standard(), config);
            let discovery = pipeline.discover().await?;
            let rejected = discovery.registry.rejected().len();
            let entries = discovery.registry.into_entries();
            let csv = save_csv(&out_dir, &entries);

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{:>3} | {:<16} | URL", "#", "Category");
                println!("{}", "-".repeat(80));
                for (i, e) in entries.iter().enumerate() {
                    println!("{:>3} | {:<16} | {}", i + 1, truncate(&e.category, 16), e.url);
                }
                print!(
                    "\n{} postings in {} categories ({} filtered out)",
                    entries.len(),
                    discovery.categories.len(),
                    rejected
                );
                match &csv {
                    Some(path) => println!(" | saved to {}", path.display()),
                    None => println!(" | {} not written", output::JOBS_CSV),
                }
            }
            Ok(())
        }
        Commands::Check => {
            if PandocRenderer::default().is_available() {
                println!("pandoc found.");
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "pandoc not found. Install it (e.g. `brew install pandoc` or `apt install pandoc`)"
                ))
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// The listing is already in hand, so a failed write is reported, not fatal.
fn save_csv(out_dir: &Path, entries: &[JobEntry]) -> Option<PathBuf> {
    match output::save_jobs_csv(out_dir, entries) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Failed to write {}: {}", output::JOBS_CSV, e);
            None
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
