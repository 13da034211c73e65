use ravendb_client::{DocumentStoreBuilder, ReadBalanceBehavior, RequestExecutorEvent};
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let scheme: String = std::env::var("RAVEN_SCHEME").unwrap_or_else(|_| "http".to_string());
    let database = std::env::var("RAVEN_DATABASE").unwrap_or_else(|_| "Northwind".to_string());

    let conventions = ravendb_client::DocumentConventions::default()
        .set_read_balance_behavior(ReadBalanceBehavior::RoundRobin);

    let mut document_store = DocumentStoreBuilder::new()
        .set_database_name(&database)
        .set_conventions(conventions);
    if scheme == "https" {
        document_store = document_store
            .set_client_certificate("ravendb-client_dev_cert.pem")
            .set_urls(&["https://a.free.damccull.ravendb.cloud"]);
    } else {
        document_store = document_store.set_urls(&["http://localhost:8080"]);
    }

    let document_store = document_store.build()?;

    // Print what the executor is doing behind the scenes.
    let executor = document_store.get_request_executor(None).await?;
    let mut events = executor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RequestExecutorEvent::FailedRequest { url, reason } => {
                    println!("request to {} failed: {}", url, reason)
                }
                RequestExecutorEvent::NodeRestored { url } => println!("{} is back", url),
                RequestExecutorEvent::TopologyUpdated { etag } => {
                    println!("topology updated to etag {}", etag)
                }
                RequestExecutorEvent::SucceededRequest { .. } => {}
            }
        }
    });

    let mut session = document_store.open_session().await?;
    match session.get_cluster_topology().await {
        Ok(topology) => println!("{:#?}", topology),
        Err(e) => {
            tracing::error!("Error happened: {}", &e);
            return Err(e.into());
        }
    };

    session.store("demo/1", &serde_json::json!({ "Greeting": "Hello there" }))?;
    let saved = session.save_changes().await?;
    println!("{:#?}", saved);

    let loaded = session.load::<serde_json::Value>("demo/1").await?;
    println!("{:#?}", loaded);

    document_store.close().await?;
    Ok(())
}

fn setup_tracing() {
    // Redirect all `log`'s events to the subscriber
    LogTracer::init().expect("Failed to set logger");
    // Set up tracing
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new("ravendb-client-demo".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    set_global_default(subscriber).expect("Failed to set subscriber");
}
