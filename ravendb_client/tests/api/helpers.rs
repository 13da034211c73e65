use std::{net::TcpListener, time::Duration};

use once_cell::sync::Lazy;
use ravendb_client::{
    DocumentConventions, HttpClientOptions, RequestExecutor, RequestExecutorEvent,
};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const DATABASE: &str = "Northwind";

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    // Set TEST_LOG to see the logs of a failing test
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Conventions for tests: no disk cache, fast health checks, short timeouts.
pub fn test_conventions() -> DocumentConventions {
    DocumentConventions::default()
        .set_topology_cache_location(None)
        .set_failed_node_check_interval(Duration::from_millis(50))
        .set_request_timeout(Duration::from_secs(2))
}

pub fn url_of(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("Mock server uri is not a url")
}

/// Urls nothing listens on. The ports were free a moment ago, connections to them are refused.
/// All listeners are held until every port is picked so the urls are distinct.
pub fn unreachable_urls(count: usize) -> Vec<Url> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("Failed to bind a random port"))
        .collect::<Vec<_>>();
    listeners
        .iter()
        .map(|listener| {
            let port = listener.local_addr().unwrap().port();
            Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap()
        })
        .collect()
}

pub fn unreachable_url() -> Url {
    unreachable_urls(1).remove(0)
}

/// Body of `GET /topology`, tagging the nodes A, B, C... in order.
pub fn topology_body(etag: i64, urls: &[Url]) -> serde_json::Value {
    let nodes = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            json!({
                "Url": url.as_str(),
                "ClusterTag": ((b'A' + i as u8) as char).to_string(),
                "Database": DATABASE,
                "ServerRole": "Member",
            })
        })
        .collect::<Vec<_>>();
    json!({ "Nodes": nodes, "Etag": etag })
}

pub async fn mount_topology(server: &MockServer, etag: i64, urls: &[Url]) {
    Mock::given(method("GET"))
        .and(path("/topology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(topology_body(etag, urls)))
        .mount(server)
        .await;
}

pub fn docs_path() -> String {
    format!("/databases/{}/docs", DATABASE)
}

pub fn document_body(document: serde_json::Value) -> serde_json::Value {
    json!({ "Results": [document] })
}

pub fn spawn_executor(seed_urls: Vec<Url>, conventions: DocumentConventions) -> RequestExecutor {
    init_tracing();
    RequestExecutor::new(seed_urls, DATABASE, conventions, &HttpClientOptions::default())
        .expect("Failed to create request executor")
}

/// Starts `count` mock nodes, all of which report the same topology with etag 1.
pub async fn spawn_cluster(count: usize) -> Vec<MockServer> {
    let mut servers = Vec::with_capacity(count);
    for _ in 0..count {
        servers.push(MockServer::start().await);
    }
    let urls = servers.iter().map(url_of).collect::<Vec<_>>();
    for server in &servers {
        mount_topology(server, 1, &urls).await;
    }
    servers
}

/// Waits for the first event matching `predicate`, or panics after two seconds.
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<RequestExecutorEvent>,
    predicate: F,
) -> RequestExecutorEvent
where
    F: Fn(&RequestExecutorEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("Event channel closed"),
            }
        }
    })
    .await
    .expect("Timed out waiting for event")
}
