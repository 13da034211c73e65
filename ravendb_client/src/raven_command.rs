//! Commands are the only way requests reach the server.
//!
//! A command knows how to build its HTTP request for a given node and how to turn the server's
//! answer into a typed result. It knows nothing about which node it is sent to, retries, or
//! topology; that is the job of the [`RequestExecutor`](crate::RequestExecutor).
use std::marker::PhantomData;

use anyhow::Context;
use reqwest::{header::HeaderMap, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;
use uuid::Uuid;

use crate::{
    cluster_topology::ClusterTopologyInfo, database_topology::DatabaseTopology,
    server_node::ServerNode, topology::Topology,
};

/// What the server answered, as far as a command is concerned.
///
/// A missing resource is a normal answer, not an error, so it gets its own variant.
#[derive(Debug)]
pub enum ServerResponse {
    Found {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    NotFound,
}

pub trait RavenCommand: Send {
    type Result: Send;

    /// Builds the request to send to `node`. Called once per attempt, so a retried command
    /// builds a fresh request for every node it tries.
    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request>;

    /// Turns the server's answer into the command's result.
    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result>;

    /// Read requests may be balanced across nodes and raced during speed tests.
    fn is_read_request(&self) -> bool {
        true
    }

    /// Whether sending the command twice has the same effect as sending it once. A command
    /// that is not idempotent is never retried on another node once it may have reached a
    /// server.
    fn is_idempotent(&self) -> bool {
        true
    }
}

/// Joins `path` onto the node url, keeping any path prefix the node url has.
fn endpoint(node: &ServerNode, path: &str) -> anyhow::Result<Url> {
    let base = node.url.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/{}", base, path))
        .with_context(|| format!("Unable to build endpoint `{}` for `{}`", path, node.url))
}

fn database_endpoint(node: &ServerNode, path: &str) -> anyhow::Result<Url> {
    anyhow::ensure!(
        !node.database.is_empty(),
        "Node `{}` is not bound to a database",
        node.url
    );
    endpoint(node, &format!("databases/{}/{}", node.database, path))
}

fn found_body(response: ServerResponse, what: &str) -> anyhow::Result<Vec<u8>> {
    match response {
        ServerResponse::Found { body, .. } => Ok(body),
        ServerResponse::NotFound => Err(anyhow::anyhow!("Server returned 404 for {}", what)),
    }
}

/// Fetches the topology of the database the node is bound to.
#[derive(Debug, Default)]
pub struct GetDatabaseTopologyCommand {
    application_identifier: Option<Uuid>,
}

impl GetDatabaseTopologyCommand {
    pub fn new(application_identifier: Option<Uuid>) -> Self {
        Self {
            application_identifier,
        }
    }
}

impl RavenCommand for GetDatabaseTopologyCommand {
    type Result = Topology;

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        let mut url = endpoint(node, "topology")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("name", &node.database);
            if let Some(id) = self.application_identifier {
                query.append_pair("applicationIdentifier", &id.to_string());
            }
        }
        Ok(client.request(Method::GET, url).build()?)
    }

    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result> {
        let body = found_body(response, "database topology")?;
        let topology = serde_json::from_slice::<DatabaseTopology>(&body)
            .context("Unable to deserialize database topology")?;
        Ok(topology.into())
    }
}

/// Fetches the topology of the whole cluster. Used by executors not bound to a database.
#[derive(Debug, Default)]
pub struct GetClusterTopologyCommand;

impl RavenCommand for GetClusterTopologyCommand {
    type Result = Topology;

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        Ok(client
            .request(Method::GET, endpoint(node, "cluster/topology")?)
            .build()?)
    }

    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result> {
        let body = found_body(response, "cluster topology")?;
        let info = serde_json::from_slice::<ClusterTopologyInfo>(&body)
            .context("Unable to deserialize cluster topology information")?;
        Ok(info.into())
    }
}

/// Lightweight "are you alive" request used by health checks.
#[derive(Debug, Default)]
pub struct HealthCheckCommand;

impl RavenCommand for HealthCheckCommand {
    type Result = ();

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        let url = if node.database.is_empty() {
            endpoint(node, "setup/alive")?
        } else {
            let mut url = database_endpoint(node, "stats")?;
            url.query_pairs_mut().append_pair("failure", "check");
            url
        };
        Ok(client.request(Method::GET, url).build()?)
    }

    fn set_response(&mut self, _response: ServerResponse) -> anyhow::Result<Self::Result> {
        // Any answer at all means the node is up.
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentResults<T> {
    results: Vec<T>,
}

/// Loads a single document by id. A missing document is `None`.
#[derive(Debug)]
pub struct GetDocumentCommand<T> {
    id: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> GetDocumentCommand<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _document: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Send> RavenCommand for GetDocumentCommand<T> {
    type Result = Option<T>;

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        let mut url = database_endpoint(node, "docs")?;
        url.query_pairs_mut().append_pair("id", &self.id);
        Ok(client.request(Method::GET, url).build()?)
    }

    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result> {
        match response {
            ServerResponse::NotFound => Ok(None),
            ServerResponse::Found { body, .. } => {
                let results = serde_json::from_slice::<DocumentResults<T>>(&body)
                    .with_context(|| format!("Unable to deserialize document `{}`", self.id))?;
                Ok(results.results.into_iter().next())
            }
        }
    }
}

/// Lists the documents of a database, one page at a time.
#[derive(Debug, Default)]
pub struct GetDocumentsCommand {
    start: Option<i64>,
    page_size: Option<i64>,
}

impl GetDocumentsCommand {
    pub fn new(start: Option<i64>, page_size: Option<i64>) -> Self {
        Self { start, page_size }
    }
}

impl RavenCommand for GetDocumentsCommand {
    type Result = Vec<serde_json::Value>;

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        let mut url = database_endpoint(node, "docs")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = self.start {
                query.append_pair("start", &start.to_string());
            }
            if let Some(page_size) = self.page_size {
                query.append_pair("pageSize", &page_size.to_string());
            }
        }
        Ok(client.request(Method::GET, url).build()?)
    }

    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result> {
        match response {
            ServerResponse::NotFound => Ok(Vec::new()),
            ServerResponse::Found { body, .. } => {
                let results = serde_json::from_slice::<DocumentResults<serde_json::Value>>(&body)
                    .context("Unable to deserialize document page")?;
                Ok(results.results)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutResult {
    pub id: String,
    pub change_vector: Option<String>,
}

/// Stores a document, optionally guarded by the change vector it was loaded with.
#[derive(Debug)]
pub struct PutDocumentCommand {
    id: String,
    document: serde_json::Value,
    change_vector: Option<String>,
}

impl PutDocumentCommand {
    pub fn new(
        id: impl Into<String>,
        document: serde_json::Value,
        change_vector: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document,
            change_vector,
        }
    }
}

impl RavenCommand for PutDocumentCommand {
    type Result = PutResult;

    fn create_request(
        &self,
        client: &reqwest::Client,
        node: &ServerNode,
    ) -> anyhow::Result<reqwest::Request> {
        let mut url = database_endpoint(node, "docs")?;
        url.query_pairs_mut().append_pair("id", &self.id);
        let mut request = client.request(Method::PUT, url).json(&self.document);
        if let Some(change_vector) = &self.change_vector {
            request = request.header("If-Match", format!("\"{}\"", change_vector));
        }
        Ok(request.build()?)
    }

    fn set_response(&mut self, response: ServerResponse) -> anyhow::Result<Self::Result> {
        let body = found_body(response, "document put")?;
        serde_json::from_slice::<PutResult>(&body).context("Unable to deserialize put result")
    }

    fn is_read_request(&self) -> bool {
        false
    }

    fn is_idempotent(&self) -> bool {
        false
    }
}
