//! Integration tests for the pipeline
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! ingest, crawl and scrape cycle end-to-end against a SQLite database.

use async_trait::async_trait;
use polite_crawl::config::{
    Config, CrawlDelayUnit, LinkRouting, PipelineConfig, PolitenessConfig, RendererConfig,
    StorageConfig, UserAgentConfig,
};
use polite_crawl::pipeline::{HttpFetcher, Pipeline, PipelineDeps};
use polite_crawl::render::{build_renderer, CookieRecord, RenderError, RenderSession, Renderer};
use polite_crawl::storage::{ExtractedStore, SqliteStorage, VisitedStore};
use polite_crawl::url::normalize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to `db_path`
fn create_test_config(db_path: &Path) -> Config {
    Config {
        seeds: vec![],
        pipeline: PipelineConfig {
            ingest_workers: 1,
            crawl_workers: 2,
            scrape_workers: 2,
            max_attempts: 2,
            retry_backoff_ms: 10,
            task_timeout_secs: Some(30),
            fetch_timeout_secs: 5,
            link_routing: LinkRouting::Scrape,
        },
        politeness: PolitenessConfig {
            default_crawl_delay_ms: 1000,
            max_crawl_delay_ms: 60_000,
            crawl_delay_unit: CrawlDelayUnit::Millis,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        renderer: RendererConfig {
            navigation_timeout_secs: 5,
            ..Default::default()
        },
        storage: StorageConfig {
            database_path: db_path.display().to_string(),
        },
    }
}

fn start_pipeline(
    config: &Config,
    storage: Arc<SqliteStorage>,
    renderer: Arc<dyn Renderer>,
) -> Pipeline {
    let fetcher = HttpFetcher::from_config(&config.user_agent, Duration::from_secs(5))
        .expect("Failed to build fetcher");

    Pipeline::start(
        config,
        PipelineDeps {
            fetcher: Arc::new(fetcher),
            renderer,
            visited: storage.clone(),
            extracted: storage,
        },
    )
}

/// Mounts a robots policy on the mock server
async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_pipeline_single_site() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&temp_dir.path().join("crawl.db"));

    mount_robots(&server, "User-agent: *\nCrawl-delay: 0").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <a href="/page1">Page 1</a>
                    <a href="/page2">Page 2</a>
                    </body></html>"#,
                )
                .append_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>one</p>"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>two</p>"))
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let renderer = build_renderer(&config).unwrap();
    let pipeline = start_pipeline(&config, storage.clone(), renderer);

    pipeline.submit(&base_url).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.ingested, 1);
    assert_eq!(stats.crawled, 1);
    assert_eq!(stats.links_discovered, 2);
    assert_eq!(stats.scraped, 3);
    assert_eq!(stats.failures, 0);

    // One visited record with the frozen policy
    let seed = normalize(&base_url).unwrap();
    let record = storage.get(&seed).unwrap().expect("seed should be recorded");
    assert_eq!(record.politeness.crawl_delay_ms, 0);
    assert_eq!(record.politeness.raw_policy_text, "User-agent: *\nCrawl-delay: 0");
    assert_eq!(storage.count_visited().unwrap(), 1);

    // Seed page scraped with its cookie before and after reload
    let scraped = storage.records_for(seed.as_str()).unwrap();
    assert_eq!(scraped.len(), 1);
    assert_eq!(scraped[0].payload.before_reload.len(), 1);
    assert_eq!(scraped[0].payload.before_reload[0].name, "session");
    assert_eq!(scraped[0].payload.after_reload.len(), 1);

    // Discovered links scraped as raw URLs
    let page1 = format!("{}/page1", base_url);
    assert_eq!(storage.records_for(&page1).unwrap().len(), 1);
    assert_eq!(storage.count_extracted().unwrap(), 3);
}

#[tokio::test]
async fn test_duplicate_submissions_ingested_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&temp_dir.path().join("crawl.db"));

    mount_robots(&server, "Crawl-delay: 0").await;

    // One crawl fetch plus navigate and reload for one scrape
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>no links</p>"))
        .expect(3)
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), build_renderer(&config).unwrap());

    pipeline.submit(&base_url).unwrap();
    pipeline.submit(&format!("{}//", base_url)).unwrap();
    pipeline.submit(&format!("  {}/ ", base_url)).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.ingested, 1);
    assert_eq!(stats.duplicates, 2);
    assert_eq!(storage.count_visited().unwrap(), 1);
    assert_eq!(storage.count_extracted().unwrap(), 1);
}

#[tokio::test]
async fn test_disallow_all_writes_nothing() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&temp_dir.path().join("crawl.db"));

    mount_robots(&server, "User-agent: *\nDisallow: /").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), build_renderer(&config).unwrap());

    pipeline.submit(&server.uri()).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.disallowed, 1);
    assert_eq!(stats.crawled, 0);
    assert_eq!(stats.scraped, 0);
    assert_eq!(storage.count_visited().unwrap(), 0);
    assert_eq!(storage.count_extracted().unwrap(), 0);
}

#[tokio::test]
async fn test_robots_failure_uses_default_delay() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&temp_dir.path().join("crawl.db"));

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), build_renderer(&config).unwrap());

    pipeline.submit(&base_url).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.crawled, 1);
    let record = storage
        .get(&normalize(&base_url).unwrap())
        .unwrap()
        .expect("URL should be recorded");
    assert_eq!(record.politeness.crawl_delay_ms, 1000);
    assert!(!record.politeness.disallow_all);
    assert!(record.politeness.raw_policy_text.is_empty());
}

#[tokio::test]
async fn test_every_link_becomes_a_scrape() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&temp_dir.path().join("crawl.db"));

    mount_robots(&server, "Crawl-delay: 0").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r##"<a href="/a">A</a>
                <a href="/a">A again</a>
                <a href="b">B</a>
                <a href="/missing">Gone</a>
                <a href="#top">Top</a>
                <a href="mailto:x@example.com">Mail</a>"##,
        ))
        .mount(&server)
        .await;

    // Everything else answers 404, which still renders
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), build_renderer(&config).unwrap());

    pipeline.submit(&base_url).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.links_discovered, 4);
    assert_eq!(stats.scraped, 5);
    assert_eq!(
        storage.records_for(&format!("{}/a", base_url)).unwrap().len(),
        2
    );
    // Discovered links bypass ingestion
    assert_eq!(storage.count_visited().unwrap(), 1);
}

/// Wraps a renderer and counts sessions opened and closed
struct CountingRenderer {
    inner: Arc<dyn Renderer>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

struct CountingSession {
    inner: Box<dyn RenderSession>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for CountingRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let inner = self.inner.open().await?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            inner,
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[async_trait]
impl RenderSession for CountingSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.inner.navigate(url).await
    }

    async fn cookies(&mut self) -> Result<Vec<CookieRecord>, RenderError> {
        self.inner.cookies().await
    }

    async fn reload(&mut self) -> Result<(), RenderError> {
        self.inner.reload().await
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_failed_scrapes_release_sessions() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&temp_dir.path().join("crawl.db"));
    config.politeness.default_crawl_delay_ms = 0;
    config.pipeline.max_attempts = 3;

    let opened = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let renderer = Arc::new(CountingRenderer {
        inner: build_renderer(&config).unwrap(),
        opened: Arc::clone(&opened),
        closed: Arc::clone(&closed),
    });

    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), renderer);

    // Nothing listens on port 9: robots falls back, crawl and scrape both fail
    pipeline.submit("http://127.0.0.1:9/").unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.ingested, 1);
    assert_eq!(stats.failures, 2);
    assert_eq!(opened.load(Ordering::SeqCst), 3);
    assert_eq!(closed.load(Ordering::SeqCst), 3);
    assert_eq!(storage.count_extracted().unwrap(), 0);
}

#[tokio::test]
async fn test_resubmission_after_restart_is_noop() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(&db_path);

    mount_robots(&server, "Crawl-delay: 0").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
        .mount(&server)
        .await;

    // First run
    {
        let storage = Arc::new(SqliteStorage::new(&db_path).unwrap());
        let pipeline = start_pipeline(&config, storage, build_renderer(&config).unwrap());
        pipeline.submit(&base_url).unwrap();
        pipeline.run_until_idle().await;
    }

    // Second run against the same database sees the URL as visited
    let storage = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let pipeline = start_pipeline(&config, storage.clone(), build_renderer(&config).unwrap());
    pipeline.submit(&base_url).unwrap();
    let stats = pipeline.run_until_idle().await;

    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.ingested, 0);
    assert_eq!(storage.count_visited().unwrap(), 1);
    assert_eq!(storage.count_extracted().unwrap(), 1);
}
