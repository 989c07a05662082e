use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::convert::{Conversion, DocumentConverter};
use crate::fetch::{FetchError, PageFetcher};
use crate::output;
use crate::parser::{self, content, sections, ExtractError};
use crate::registry::{JobEntry, JobRegistry};

pub const ROOT_URL: &str = "https://rsrglobal.org/";
pub const DEFAULT_WORKERS: usize = 15;

/// How per-item work inside a phase is scheduled. Phases themselves always
/// run one after another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Concurrent { workers: usize },
}

impl ExecutionMode {
    fn concurrency(self) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Concurrent { workers } => workers.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root_url: String,
    pub out_dir: PathBuf,
    pub mode: ExecutionMode,
    pub write_csv: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_url: ROOT_URL.to_string(),
            out_dir: PathBuf::from("."),
            mode: ExecutionMode::Concurrent {
                workers: DEFAULT_WORKERS,
            },
            write_csv: true,
        }
    }
}

/// The only errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("site root unavailable: {0}")]
    RootUnavailable(#[source] FetchError),
    #[error("site root {url} has unexpected markup: {source}")]
    RootMalformed {
        url: String,
        #[source]
        source: ExtractError,
    },
}

/// Outcome of the discovery phases.
pub struct Discovery {
    pub categories: Vec<String>,
    pub registry: JobRegistry,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub categories: usize,
    pub postings: usize,
    pub converted: usize,
    pub via_fallback: usize,
    pub fetch_failed: usize,
    pub not_found: usize,
    pub conversion_failed: usize,
}

enum PostingOutcome {
    Converted(Conversion),
    FetchFailed,
    NotFound,
    ConversionFailed,
}

impl RunReport {
    fn record(&mut self, outcome: PostingOutcome) {
        match outcome {
            PostingOutcome::Converted(via) => {
                self.converted += 1;
                if via == Conversion::Fallback {
                    self.via_fallback += 1;
                }
            }
            PostingOutcome::FetchFailed => self.fetch_failed += 1,
            PostingOutcome::NotFound => self.not_found += 1,
            PostingOutcome::ConversionFailed => self.conversion_failed += 1,
        }
    }
}

/// Run `f` over every item with at most `limit` in flight, waiting for all of
/// them. Completion order is unspecified.
async fn fan_out<T, R, Fut>(
    items: impl IntoIterator<Item = T>,
    limit: usize,
    f: impl FnMut(T) -> Fut,
) -> Vec<R>
where
    Fut: Future<Output = R>,
{
    stream::iter(items).map(f).buffer_unordered(limit).collect().await
}

pub struct Pipeline<F> {
    fetcher: F,
    converter: Arc<DocumentConverter>,
    config: PipelineConfig,
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(fetcher: F, converter: DocumentConverter, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            converter: Arc::new(converter),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Category pages linked from the site root.
    pub async fn discover_categories(&self) -> Result<Vec<String>, PipelineError> {
        let url = &self.config.root_url;
        info!("Getting job sections from {}", url);
        let html = self
            .fetcher
            .fetch(url)
            .await
            .map_err(PipelineError::RootUnavailable)?;

        let categories = sections::extract_links(&html, parser::CATEGORY_MARKER).map_err(|source| {
            PipelineError::RootMalformed {
                url: url.clone(),
                source,
            }
        })?;
        info!("Found {} urls in job section", categories.len());
        Ok(categories)
    }

    /// Categories, their folders, and every admitted posting. Returns once
    /// every category scan has finished.
    pub async fn discover(&self) -> Result<Discovery, PipelineError> {
        let categories = self.discover_categories().await?;
        output::ensure_folders(&self.config.out_dir, &categories);

        let registry = JobRegistry::new();
        let shared = &registry;
        fan_out(categories.iter(), self.config.mode.concurrency(), move |url| {
            self.scan_category(url, shared)
        })
        .await;

        info!("Total Jobs Posting: {}", registry.len());
        Ok(Discovery {
            categories,
            registry,
        })
    }

    async fn scan_category(&self, url: &str, registry: &JobRegistry) {
        let category = output::category_name(url);
        info!("Starting scraping jobs for category: {}", category);

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch jobs for category {}: {}", category, e);
                return;
            }
        };

        match sections::extract_links(&html, parser::ITEM_MARKER) {
            Ok(links) if links.is_empty() => info!("No job postings found for category {}", category),
            Ok(links) => {
                for link in links {
                    registry.offer(category, &link);
                }
            }
            Err(e) => warn!("Failed to parse jobs for category {}: {}", category, e),
        }
    }

    /// Full run: discovery, then conversion of every registered posting.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let discovery = self.discover().await?;
        let categories = discovery.categories.len();
        // Frozen from here on: conversion only ever sees the final list.
        let entries = discovery.registry.into_entries();

        if self.config.write_csv {
            match output::save_jobs_csv(&self.config.out_dir, &entries) {
                Ok(path) => info!("Wrote {} jobs to {}", entries.len(), path.display()),
                Err(e) => warn!("Failed to write {}: {}", output::JOBS_CSV, e),
            }
        }

        let pb = ProgressBar::new(entries.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        let progress = &pb;
        let outcomes = fan_out(entries.iter(), self.config.mode.concurrency(), move |entry| {
            async move {
                let outcome = self.process_posting(entry).await;
                progress.inc(1);
                outcome
            }
        })
        .await;
        pb.finish_and_clear();

        let mut report = RunReport {
            categories,
            postings: entries.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            report.record(outcome);
        }

        info!(
            "Script completed: {} of {} postings converted ({} via fallback)",
            report.converted, report.postings, report.via_fallback
        );
        Ok(report)
    }

    async fn process_posting(&self, entry: &JobEntry) -> PostingOutcome {
        info!("Fetching {} for category {}", entry.url, entry.category);
        let Some(job) = output::job_name(&entry.url) else {
            warn!("Cannot derive a document name from {}", entry.url);
            return PostingOutcome::NotFound;
        };

        let html = match self.fetcher.fetch(&entry.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to scrape job {}: {}", entry.url, e);
                return PostingOutcome::FetchFailed;
            }
        };

        let content = match content::extract_content(&html) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {}", entry.url, e);
                return PostingOutcome::NotFound;
            }
        };

        let path = output::document_path(&self.config.out_dir, &entry.category, job);
        // Rendering and the pandoc subprocess block; keep them off the
        // runtime threads so fetches stay in flight.
        let converter = Arc::clone(&self.converter);
        let title = job.to_string();
        let converted =
            tokio::task::spawn_blocking(move || converter.convert(&content, &title, &path)).await;

        match converted {
            Ok(Ok(via)) => PostingOutcome::Converted(via),
            Ok(Err(e)) => {
                error!("Giving up on {}: {}", entry.url, e);
                PostingOutcome::ConversionFailed
            }
            Err(e) => {
                error!("Conversion of {} aborted: {}", entry.url, e);
                PostingOutcome::ConversionFailed
            }
        }
    }
}

// ── Tests ──
