//! `seed` pipeline: oldest listing articles → scrape → replace the store contents.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use copyforge_crawler::{ArticleScraper, HttpFetcher, PageFetcher};
use copyforge_discovery::OldestArticleSelector;
use copyforge_shared::{AppConfig, Article, CopyforgeError, Result};
use copyforge_storage::{NewArticle, Storage};

use crate::pipeline::ProgressReporter;

/// Outcome of [`Seeder::seed`].
#[derive(Debug, Clone)]
pub struct SeedReport {
    /// Links selected on the listing.
    pub discovered: usize,
    /// Links dropped because the fetch failed or no body text was found.
    pub skipped: usize,
    /// Stored articles, oldest first.
    pub articles: Vec<Article>,
}

/// Scrapes the oldest listing articles into the record store.
pub struct Seeder {
    selector: OldestArticleSelector,
    scraper: ArticleScraper,
}

impl Seeder {
    pub fn new(selector: OldestArticleSelector, scraper: ArticleScraper) -> Self {
        Self { selector, scraper }
    }

    /// Wire a listing walker and scraper sharing one page fetcher.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::for_pages(&config.http)?);
        Ok(Self::new(
            OldestArticleSelector::from_config(fetcher.clone(), &config.listing)?,
            ArticleScraper::new(fetcher),
        ))
    }

    /// Scrape up to `limit` of the oldest articles and replace everything in `store`.
    ///
    /// A link that fails to fetch or yields no body is skipped. Nothing is
    /// written when no article survives.
    #[instrument(skip_all, fields(limit))]
    pub async fn seed(
        &self,
        store: &Storage,
        limit: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<SeedReport> {
        progress.phase("Discovering oldest articles");
        let links = self.selector.select_oldest(limit).await?;
        let total = links.len();

        let mut scraped = Vec::with_capacity(total);
        for (i, url) in links.iter().enumerate() {
            progress.article_started(url, i + 1, total);

            match self.scraper.scrape(url).await {
                Ok(doc) if doc.is_empty() => {
                    warn!(%url, "no article body found, skipping");
                }
                Ok(doc) => {
                    let title = if doc.title.is_empty() {
                        url.clone()
                    } else {
                        doc.title
                    };
                    scraped.push(NewArticle {
                        title,
                        original_content: doc.body,
                        original_url: url.clone(),
                    });
                }
                Err(e) => {
                    warn!(%url, error = %e, "article fetch failed, skipping");
                }
            }
        }

        if scraped.is_empty() {
            return Err(CopyforgeError::validation(format!(
                "no articles could be scraped from {total} discovered links"
            )));
        }

        progress.phase("Storing articles");
        let articles = store.replace_all(&scraped).await?;

        let report = SeedReport {
            discovered: total,
            skipped: total - articles.len(),
            articles,
        };
        progress.done(&format!(
            "{} articles seeded ({} skipped)",
            report.articles.len(),
            report.skipped
        ));
        info!(
            stored = report.articles.len(),
            skipped = report.skipped,
            "seed complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use copyforge_shared::{HttpConfig, ListingConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_page(posts: &[&str], pages: u32) -> String {
        let links: String = posts
            .iter()
            .map(|slug| {
                format!(
                    r#"<article><h2 class="entry-title"><a href="/blogs/{slug}/">{slug}</a></h2></article>"#
                )
            })
            .collect();
        let pagination: String = (1..=pages)
            .map(|n| format!(r#"<a class="page-numbers">{n}</a>"#))
            .collect();
        format!("<html><body>{links}<nav>{pagination}</nav></body></html>")
    }

    fn article_page(title: &str, body: &str) -> String {
        format!(
            "<html><body><header>Site</header><h1>{title}</h1><article><p>{body}</p></article></body></html>"
        )
    }

    async fn mount(server: &MockServer, at: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    /// Two listing pages; `post-a` is the oldest, `post-d` the newest.
    async fn blog(server: &MockServer) {
        mount(server, "/blogs/", 200, listing_page(&["post-d", "post-c"], 2)).await;
        mount(server, "/blogs/page/2/", 200, listing_page(&["post-b", "post-a"], 2)).await;
        mount(server, "/blogs/post-a/", 200, article_page("Post A", "Oldest body.")).await;
        mount(server, "/blogs/post-c/", 200, article_page("Post C", "Newer body.")).await;
        mount(server, "/blogs/post-d/", 200, "<html><body></body></html>".into()).await;
        // post-b is not mounted: wiremock answers 404.
    }

    fn seeder_for(server: &MockServer) -> Seeder {
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::for_pages(&HttpConfig::default()).unwrap());
        let listing = ListingConfig {
            root_url: format!("{}/blogs/", server.uri()),
            ..ListingConfig::default()
        };
        Seeder::new(
            OldestArticleSelector::from_config(fetcher.clone(), &listing).unwrap(),
            ArticleScraper::new(fetcher),
        )
    }

    async fn temp_storage() -> Storage {
        let path = std::env::temp_dir().join(format!("cf_seed_{}.db", uuid::Uuid::now_v7()));
        Storage::open(&path).await.expect("open test db")
    }

    #[tokio::test]
    async fn seeds_oldest_articles_in_order() {
        let server = MockServer::start().await;
        blog(&server).await;
        let storage = temp_storage().await;

        let report = seeder_for(&server)
            .seed(&storage, 4, &SilentProgress)
            .await
            .expect("seed");

        assert_eq!(report.discovered, 4);
        // post-b 404s and post-d has no body.
        assert_eq!(report.skipped, 2);

        let stored = storage.find_oldest(10).await.unwrap();
        let titles: Vec<_> = stored.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Post A", "Post C"]);
        assert_eq!(stored[0].original_content, "Oldest body.");
        assert_eq!(
            stored[0].original_url,
            format!("{}/blogs/post-a/", server.uri())
        );
        assert!(stored.iter().all(|a| a.updated_content.is_none()));
    }

    #[tokio::test]
    async fn reseeding_replaces_previous_contents() {
        let server = MockServer::start().await;
        blog(&server).await;
        let storage = temp_storage().await;
        storage
            .insert_article(&NewArticle {
                title: "Stale".into(),
                original_content: "Old.".into(),
                original_url: "https://stale.example.com/".into(),
            })
            .await
            .unwrap();

        seeder_for(&server)
            .seed(&storage, 1, &SilentProgress)
            .await
            .unwrap();

        let stored = storage.list_articles().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Post A");
    }

    #[tokio::test]
    async fn nothing_scraped_is_an_error_and_store_is_untouched() {
        let server = MockServer::start().await;
        mount(&server, "/blogs/", 200, listing_page(&["gone"], 1)).await;
        let storage = temp_storage().await;
        storage
            .insert_article(&NewArticle {
                title: "Keep".into(),
                original_content: "Body.".into(),
                original_url: "https://keep.example.com/".into(),
            })
            .await
            .unwrap();

        let err = seeder_for(&server)
            .seed(&storage, 5, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CopyforgeError::Validation { .. }));
        assert_eq!(storage.list_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_listing_is_fatal() {
        let server = MockServer::start().await;
        let storage = temp_storage().await;
        let err = seeder_for(&server)
            .seed(&storage, 5, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
