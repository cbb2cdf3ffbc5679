use price_sweep::config::{parse_config, Config};
use price_sweep::runner::{build_http_client, run_retailer, BatchRunner, Fetcher, RetryPolicy};
use price_sweep::sink::{Database, Sink, SinkError, SinkResult};
use price_sweep::{
    FetchOutcome, ItemRecord, OutcomeKind, OutcomeRecord, SelectorAdapter, StockState, SweepError,
};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PAGE: &str = r#"<html><body>
    <h1 class="name">Ergonomic Chair</h1>
    <div class="price"><span class="d">$249</span><span class="c">99</span></div>
    <button class="add-to-cart">Add to cart</button>
</body></html>"#;

const OUT_OF_STOCK_PAGE: &str = r#"<html><body>
    <h1 class="name">Filing Cabinet</h1>
    <div class="price"><span class="d">$89</span><span class="c">00</span></div>
</body></html>"#;

const NOT_FOUND_PAGE: &str = r#"<html><body>
    <h1 class="error">Sorry, this product was not found</h1>
</body></html>"#;

/// Writes an identifier CSV and a config pointing at it, all inside `dir`
fn create_test_config(dir: &TempDir, input_csv: &str, extra: &str) -> Config {
    let input = dir.path().join("items.csv");
    std::fs::write(&input, input_csv).expect("Failed to write input CSV");

    let toml = format!(
        r#"
[runner]
batch-size = 2
max-attempts = 3
retry-delay-ms = 1
request-timeout-ms = 2000

[user-agent]
crawler-name = "TestSweep"
crawler-version = "1.0"

[output]
database-path = "{db}"
csv-dir = "{csv}"

[[retailer]]
name = "acme"
input = "{input}"
id-column = "Item"
url-column = "Link"
metadata-columns = ["Brand"]
terminal-statuses = [410]
{extra}

[retailer.selectors]
title = "h1.name"
price = {{ dollars = ".price .d", cents = ".price .c" }}
not-found = [{{ selector = "h1.error", contains = "not found" }}]
stock = {{ in-stock-markers = [{{ selector = "button.add-to-cart" }}] }}
"#,
        db = dir.path().join("sweep.db").display(),
        csv = dir.path().join("out").display(),
        input = input.display(),
        extra = extra,
    );

    parse_config(&toml).expect("Test config should be valid")
}

async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_single_retailer() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/p/A", 200, PRODUCT_PAGE).await;
    mount_page(&server, "/p/C", 200, OUT_OF_STOCK_PAGE).await;

    // Not-found pages are fetched exactly once
    Mock::given(method("GET"))
        .and(path("/p/G"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOT_FOUND_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    // Persistent server errors use the whole budget
    Mock::given(method("GET"))
        .and(path("/p/D"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = format!(
        "Item,Link,Brand\n\
         A,{base}/p/A,Mount-It\n\
         B,NULL,Mount-It\n\
         C,{base}/p/C,Mount-It\n\
         G,{base}/p/G,Mount-It\n\
         D,{base}/p/D,Mount-It\n",
        base = base
    );
    let config = create_test_config(&dir, &input, "");
    let retailer = config.retailer("acme").unwrap();
    let client = build_http_client(&config.user_agent, &config.runner).unwrap();

    let summary = run_retailer(&config, "test-hash", retailer, &client, None)
        .await
        .expect("Run should succeed");

    let state = &summary.state;
    assert_eq!(state.total(), 5);
    assert_eq!(state.count(OutcomeKind::Success), 2);
    assert_eq!(state.count(OutcomeKind::NotFound), 1);
    assert_eq!(state.count(OutcomeKind::TransientFailure), 1);
    assert_eq!(state.count(OutcomeKind::MissingTarget), 1);
    assert_eq!(state.batches_dispatched, 3);
    assert_eq!(state.batches_persisted, 3);
    assert_eq!(state.failed_ids, vec!["D".to_string()]);
    assert_eq!(state.missing_ids, vec!["B".to_string()]);

    // Database holds one row per identifier
    let db = Database::open(&dir.path().join("sweep.db")).unwrap();
    let observations = db
        .observations_on(chrono::Utc::now().date_naive())
        .unwrap();
    assert_eq!(observations.len(), 5);

    let a = observations.iter().find(|o| o.identifier == "A").unwrap();
    assert_eq!(a.title.as_deref(), Some("Ergonomic Chair"));
    assert_eq!(a.price_text.as_deref(), Some("$249.99"));
    assert_eq!(a.price, Some(249.99));
    assert_eq!(a.in_stock, Some(true));
    assert!(a.metadata.contains("Mount-It"));

    let c = observations.iter().find(|o| o.identifier == "C").unwrap();
    assert_eq!(c.in_stock, Some(false));

    let d = observations.iter().find(|o| o.identifier == "D").unwrap();
    assert_eq!(d.outcome, OutcomeKind::TransientFailure);
    assert_eq!(d.attempts, 3);
    assert_eq!(d.last_error.as_deref(), Some("HTTP 503"));

    let runs = db.latest_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].config_hash, "test-hash");
    assert!(runs[0].finished_at.is_some());

    // CSV has a header plus one row per identifier, in input order
    let csv_path = dir.path().join("out").join("scraped_data_acme.csv");
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let ids: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[1].to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B", "C", "G", "D"]);
}

#[tokio::test]
async fn test_url_pattern_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let extra = format!("url-pattern = \"{}/p/{{id}}\"", server.uri());
    let config = create_test_config(&dir, "Item,Link,Brand\nA,,x\nB,,y\nC,,z\n", &extra);
    let retailer = config.retailer("acme").unwrap();
    let client = build_http_client(&config.user_agent, &config.runner).unwrap();

    let summary = run_retailer(&config, "h", retailer, &client, Some(1))
        .await
        .unwrap();

    assert_eq!(summary.state.total(), 1);
    assert_eq!(summary.state.count(OutcomeKind::Success), 1);
}

#[tokio::test]
async fn test_terminal_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/X"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = format!("Item,Link,Brand\nX,{}/p/X,\n", server.uri());
    let config = create_test_config(&dir, &input, "");
    let retailer = config.retailer("acme").unwrap();
    let client = build_http_client(&config.user_agent, &config.runner).unwrap();

    let summary = run_retailer(&config, "h", retailer, &client, None)
        .await
        .unwrap();

    assert_eq!(summary.state.failed_ids, vec!["X".to_string()]);
}

#[tokio::test]
async fn test_missing_identifier_source_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, "Item,Link,Brand\n", "");
    config.retailers[0].input = dir
        .path()
        .join("does-not-exist.csv")
        .display()
        .to_string();
    let client = build_http_client(&config.user_agent, &config.runner).unwrap();

    let result = run_retailer(&config, "h", &config.retailers[0], &client, None).await;
    assert!(matches!(result, Err(SweepError::Source(_))));
}

/// Sink that fails on chosen calls and records the rest
#[derive(Default)]
struct FlakySink {
    fail_on: Vec<usize>,
    calls: usize,
    persisted: Vec<Vec<OutcomeRecord>>,
}

impl Sink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    fn write_batch(&mut self, records: &[OutcomeRecord]) -> SinkResult<()> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.persisted.push(records.to_vec());
        Ok(())
    }
}

#[tokio::test]
async fn test_sink_failure_does_not_block_later_batches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "Item,Link,Brand\n", "");
    let adapter = SelectorAdapter::from_retailer(&config.retailers[0]).unwrap();
    let fetcher = Fetcher::new(
        build_http_client(&config.user_agent, &config.runner).unwrap(),
        RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(2),
        },
    );

    let items: Vec<ItemRecord> = (1..=5)
        .map(|i| ItemRecord::new(format!("I{}", i)).with_target(format!("{}/p/I{}", server.uri(), i)))
        .collect();
    let mut sink = FlakySink {
        fail_on: vec![2],
        ..Default::default()
    };

    let summary = BatchRunner::new(2)
        .run(&items, &adapter, &fetcher, &mut sink)
        .await;

    // ceil(5 / 2) sink calls, the second one failing
    assert_eq!(sink.calls, 3);
    assert_eq!(summary.state.sink_failures, 1);
    assert_eq!(summary.state.total(), 5);

    let persisted: Vec<&str> = sink
        .persisted
        .iter()
        .flatten()
        .map(|r| r.identifier.as_str())
        .collect();
    assert_eq!(persisted, vec!["I1", "I2", "I5"]);

    assert!(sink.persisted.iter().flatten().all(|r| r.outcome
        == FetchOutcome::Success {
            title: Some("Ergonomic Chair".to_string()),
            price: Some("$249.99".to_string()),
            stock: StockState::InStock,
        }));
}

#[tokio::test]
async fn test_built_in_profile_against_mock_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/315512345"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <h1 class="sui-h4-bold">Cordless Drill Kit</h1>
                <span class="sui-font-display sui-text-3xl">$</span>
                <span class="sui-text-9xl">179</span>
                <span class="sui-font-display sui-text-3xl">00</span>
                <div class="sui-my-12 sui-mx-auto sui-p-5 sui-text-danger sui-font-bold">Out of stock</div>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("hd.csv");
    std::fs::write(
        &input_path,
        format!("SKU,Link\n315512345,{}/p/315512345\n", server.uri()),
    )
    .unwrap();

    let toml = format!(
        r#"
[runner]
retry-delay-ms = 1

[user-agent]
crawler-name = "TestSweep"
crawler-version = "1.0"

[output]
csv-dir = "{csv}"

[[retailer]]
name = "home-depot"
profile = "home-depot"
input = "{input}"
id-column = "SKU"
url-column = "Link"
"#,
        csv = dir.path().display(),
        input = input_path.display(),
    );
    let config = parse_config(&toml).unwrap();
    let client = build_http_client(&config.user_agent, &config.runner).unwrap();

    let summary = run_retailer(&config, "h", &config.retailers[0], &client, None)
        .await
        .unwrap();
    assert_eq!(summary.state.count(OutcomeKind::Success), 1);

    let csv_path = dir.path().join("scraped_data_home-depot.csv");
    let mut reader = csv::Reader::from_path(csv_path).unwrap();
    let row = reader.records().next().unwrap().unwrap();
    assert_eq!(&row[2], "Cordless Drill Kit");
    assert_eq!(&row[3], "$179.00");
    assert_eq!(&row[4], "Out of Stock");
}
