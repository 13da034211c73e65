/*!
ravendb_client is a client library for the RavenDB document database.
It aims to compete with the existing libraries officially offered, but
using more rusty ways of doing things.

This library requires tokio and async, and uses the actor pattern to maintain
a single instance of the [`DocumentStore`] per cluster, as recommended by the
official libraries. This is designed to keep resource usage in your app to a minimum.

Every request goes through a [`RequestExecutor`]. It learns the cluster's topology from the
seed urls, picks a node for each request, fails over when a node stops answering, and keeps
checking failed nodes until they come back.

A [`DocumentSession`] can be requested from the [`DocumentStore`] to interact with the
database. It is considered a unit of work: stored entities are only written on
[`save_changes`](DocumentSession::save_changes).

# Example
```rust,no_run
# tokio_test::block_on(async {
use ravendb_client::DocumentStore;

let document_store = DocumentStore::builder()
    .set_urls(&["http://localhost:8080"])
    .set_database_name("Northwind")
    .build()
    .unwrap();
let mut session = document_store.open_session().await.unwrap();

session.store("users/1", &serde_json::json!({ "Name": "Han" })).unwrap();
session.save_changes().await.unwrap();
# })
```
*/

mod document_session;
mod document_store;

pub mod cluster_topology;
pub mod database_topology;
pub mod document_conventions;
pub mod events;
pub mod failed_node_monitor;
pub mod node_selector;
pub mod raven_command;
pub mod request_executor;
pub mod server_node;
pub mod topology;
pub mod topology_cache;

pub use document_conventions::{DocumentConventions, ReadBalanceBehavior};
pub use document_session::*;
pub use document_store::*;
pub use events::RequestExecutorEvent;
pub use request_executor::{HttpClientOptions, NodeFailure, RequestExecutor, RequestExecutorError};
pub use server_node::{ServerNode, ServerRole};
pub use topology::Topology;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
