//! End-to-end `enhance` pipeline: oldest articles → competitors → rewrite → persist.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use copyforge_crawler::{CompetitorBodyExtractor, HttpFetcher};
use copyforge_discovery::CompetitorFinder;
use copyforge_shared::{
    AppConfig, Article, ArticleId, CompetitorExcerpt, CopyforgeError, MAX_COMPETITORS,
    MAX_REFERENCES, ProviderUsed, Result, RewriteRequest,
};
use copyforge_storage::Storage;

use crate::rewrite::RewriteOrchestrator;

// ---------------------------------------------------------------------------
// Record store seam
// ---------------------------------------------------------------------------

/// The two record-store operations the runner needs.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// The `limit` oldest articles, oldest first.
    async fn find_oldest(&self, limit: usize) -> Result<Vec<Article>>;

    /// Persist an enhancement result.
    async fn update(
        &self,
        id: &ArticleId,
        updated_content: &str,
        references: &[String],
    ) -> Result<()>;
}

#[async_trait]
impl ArticleStore for Storage {
    async fn find_oldest(&self, limit: usize) -> Result<Vec<Article>> {
        Storage::find_oldest(self, limit).await
    }

    async fn update(
        &self,
        id: &ArticleId,
        updated_content: &str,
        references: &[String],
    ) -> Result<()> {
        self.update_enhancement(id, updated_content, references).await
    }
}

// ---------------------------------------------------------------------------
// Progress + report
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an article is processed (1-based `current`).
    fn article_started(&self, title: &str, current: usize, total: usize);
    /// Called when a pipeline finishes its batch.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_started(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}

/// How many rewrites each path produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderCounts {
    pub primary: usize,
    pub secondary: usize,
    pub passthrough: usize,
}

impl ProviderCounts {
    pub fn record(&mut self, provider: ProviderUsed) {
        match provider {
            ProviderUsed::Primary => self.primary += 1,
            ProviderUsed::Secondary => self.secondary += 1,
            ProviderUsed::Passthrough => self.passthrough += 1,
        }
    }
}

/// Outcome of [`PipelineRunner::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Articles taken through rewrite.
    pub processed: usize,
    /// Articles whose result was persisted.
    pub updated: usize,
    /// Articles whose result could not be persisted.
    pub persist_failures: usize,
    pub provider_counts: ProviderCounts,
    /// Whether the run stopped early on a cancellation request.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} updated, {} persist failures (primary {}, secondary {}, passthrough {}){}",
            self.processed,
            self.updated,
            self.persist_failures,
            self.provider_counts.primary,
            self.provider_counts.secondary,
            self.provider_counts.passthrough,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Drives the per-article enhancement pass over the oldest stored articles.
pub struct PipelineRunner {
    store: Arc<dyn ArticleStore>,
    finder: CompetitorFinder,
    competitors: CompetitorBodyExtractor,
    orchestrator: RewriteOrchestrator,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        finder: CompetitorFinder,
        competitors: CompetitorBodyExtractor,
        orchestrator: RewriteOrchestrator,
    ) -> Self {
        Self {
            store,
            finder,
            competitors,
            orchestrator,
        }
    }

    /// Wire every component from config around an existing store.
    pub fn from_config(config: &AppConfig, store: Arc<dyn ArticleStore>) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::for_competitors(&config.http)?);
        Ok(Self::new(
            store,
            CompetitorFinder::from_config(config)?,
            CompetitorBodyExtractor::new(fetcher),
            RewriteOrchestrator::from_config(config)?,
        ))
    }

    /// Enhance the `limit` oldest articles, one at a time.
    ///
    /// Fails only when the batch cannot be obtained or is empty. Everything
    /// after that degrades per article: a persist failure is counted and the
    /// run moves on. `cancel` is checked between articles.
    #[instrument(skip_all, fields(limit))]
    pub async fn run(
        &self,
        limit: usize,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();

        progress.phase("Loading oldest articles");
        let articles = self.store.find_oldest(limit).await.map_err(|e| {
            error!(error = %e, "could not load article batch");
            e
        })?;

        if articles.is_empty() {
            return Err(CopyforgeError::validation("no articles found to enhance"));
        }
        info!(count = articles.len(), "enhancing articles");

        let mut report = RunReport::default();
        let total = articles.len();

        for (i, article) in articles.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(remaining = total - i, "cancellation requested, stopping early");
                report.cancelled = true;
                break;
            }

            progress.article_started(&article.title, i + 1, total);
            let (provider, persisted) = self.enhance_one(article).await;

            report.processed += 1;
            report.provider_counts.record(provider);
            if persisted {
                report.updated += 1;
            } else {
                report.persist_failures += 1;
            }
        }

        report.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        progress.done(&report.summary());
        info!(
            processed = report.processed,
            updated = report.updated,
            persist_failures = report.persist_failures,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "enhance pipeline complete"
        );

        Ok(report)
    }

    /// One article: search → competitor text → rewrite → persist.
    #[instrument(skip_all, fields(id = %article.id, title = %article.title))]
    async fn enhance_one(&self, article: &Article) -> (ProviderUsed, bool) {
        let mut links = self.finder.find(&article.title).await;
        links.truncate(MAX_COMPETITORS.min(MAX_REFERENCES));

        let excerpts = self.collect_excerpts(&links).await;
        info!(
            competitors = links.len(),
            excerpts = excerpts.len(),
            "competitor content collected"
        );

        let request = RewriteRequest::new(article.original_content.clone(), excerpts);
        let result = self.orchestrator.rewrite(&request).await;

        let persisted = match self.store.update(&article.id, &result.text, &links).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist enhancement, continuing");
                false
            }
        };

        (result.provider_used, persisted)
    }

    /// Extract competitor text concurrently (at most two in flight), keeping
    /// search-ranked order and dropping empty results.
    async fn collect_excerpts(&self, links: &[String]) -> Vec<CompetitorExcerpt> {
        stream::iter(links)
            .map(|url| async move {
                let text = self.competitors.extract(url).await;
                CompetitorExcerpt {
                    source_url: url.clone(),
                    text,
                }
            })
            .buffered(MAX_COMPETITORS)
            .filter(|excerpt| futures::future::ready(!excerpt.text.is_empty()))
            .collect()
            .await
    }
}
