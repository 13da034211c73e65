use std::{fmt, sync::Arc, time::Instant};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use super::{
    build_http_client,
    request_executor_actor::{run_request_executor_actor, RequestExecutorActor},
    request_executor_state::{RequestExecutorState, StateParts},
    HttpClientOptions, RequestExecutorError,
};
use crate::{
    document_conventions::DocumentConventions,
    events::RequestExecutorEvent,
    raven_command::RavenCommand,
    server_node::ServerNode,
    topology::{Topology, ETAG_UNKNOWN},
    topology_cache::TopologyCache,
};

/**
Sends commands to the nodes of one database (or of the cluster) and keeps track of which nodes
exist and which of them to use.

Handles are cheap to clone and every clone talks to the same executor. Requests from different
clones run concurrently. The executor must be created inside a tokio runtime, since it spawns
its background work on construction.

A new executor fetches its topology in the background right away. The first call to
[`execute`](RequestExecutor::execute) waits for that fetch, and fails if no seed url answered
and no cached topology was found.
*/
#[derive(Clone)]
pub struct RequestExecutor {
    state: Arc<RequestExecutorState>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("database", &self.state.database)
            .field("topology_etag", &self.state.topology_etag())
            .field("disposed", &self.state.is_disposed())
            .finish()
    }
}

impl RequestExecutor {
    /// Creates an executor for `database`, discovering the cluster from `initial_urls`.
    #[instrument(level = "debug", skip(conventions, options))]
    pub fn new(
        initial_urls: Vec<Url>,
        database: &str,
        conventions: DocumentConventions,
        options: &HttpClientOptions,
    ) -> Result<Self, RequestExecutorError> {
        let topology_updates_disabled = conventions.disable_topology_updates();
        let executor = Self::create(
            initial_urls,
            database.to_string(),
            conventions,
            options,
            topology_updates_disabled,
        )?;

        if topology_updates_disabled {
            // Without topology updates the seed urls are the topology.
            let nodes = executor
                .state
                .initial_urls
                .iter()
                .map(|url| ServerNode::new(url.clone(), database.to_string()))
                .collect();
            executor.state.seed_topology(Topology::new(ETAG_UNKNOWN, nodes));
        } else {
            let update = executor.state.start_first_topology_update();
            *executor.state.first_topology_update.lock() = Some(update);
        }

        Ok(executor)
    }

    /// Creates an executor that talks to the cluster itself rather than to a database.
    pub fn new_for_cluster(
        initial_urls: Vec<Url>,
        conventions: DocumentConventions,
        options: &HttpClientOptions,
    ) -> Result<Self, RequestExecutorError> {
        Self::new(initial_urls, "", conventions, options)
    }

    /// Creates an executor bound to exactly one node. It never asks for a topology, never fails
    /// over and never refreshes.
    #[instrument(level = "debug", skip(conventions, options))]
    pub fn new_for_single_node(
        url: Url,
        database: &str,
        conventions: DocumentConventions,
        options: &HttpClientOptions,
    ) -> Result<Self, RequestExecutorError> {
        let executor = Self::create(
            vec![url.clone()],
            database.to_string(),
            conventions,
            options,
            true,
        )?;
        let node = ServerNode::new(url, database.to_string());
        executor
            .state
            .seed_topology(Topology::new(ETAG_UNKNOWN, vec![node]));
        Ok(executor)
    }

    fn create(
        initial_urls: Vec<Url>,
        database: String,
        conventions: DocumentConventions,
        options: &HttpClientOptions,
        topology_updates_disabled: bool,
    ) -> Result<Self, RequestExecutorError> {
        if initial_urls.is_empty() {
            return Err(RequestExecutorError::UnexpectedError(anyhow::anyhow!(
                "At least one url is required to create a request executor"
            )));
        }

        let client = build_http_client(options)?;
        let topology_cache = match conventions.topology_cache_location() {
            Some(location) => TopologyCache::new(location.clone()),
            None => TopologyCache::disabled(),
        };
        let (sender, receiver) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let topology_refresh_interval = conventions.topology_refresh_interval();
        let speed_test_interval = conventions.speed_test_interval();

        let state = Arc::new(RequestExecutorState::new(StateParts {
            database,
            initial_urls,
            conventions,
            topology_updates_disabled,
            client,
            topology_cache,
            messages: sender,
            shutdown: shutdown.clone(),
        }));

        let actor = RequestExecutorActor::new(
            Arc::downgrade(&state),
            receiver,
            shutdown,
            topology_refresh_interval,
            speed_test_interval,
        );
        tokio::spawn(run_request_executor_actor(actor));

        Ok(Self { state })
    }

    /// Runs `command` against the node the read balance behavior picks, failing over to other
    /// nodes when the chosen one is down.
    #[instrument(level = "debug", skip(self, command), fields(database = %self.state.database))]
    pub async fn execute<C: RavenCommand>(
        &self,
        command: &mut C,
    ) -> Result<C::Result, RequestExecutorError> {
        self.state.execute(command).await
    }

    /// Runs `command` against `node` exactly once. No failover, no node selection.
    #[instrument(level = "debug", skip(self, node, command), fields(url = %node.url))]
    pub async fn execute_on_node<C: RavenCommand>(
        &self,
        node: &ServerNode,
        command: &mut C,
    ) -> Result<C::Result, RequestExecutorError> {
        self.state.execute_on_node(node, command).await
    }

    /// Waits for the first topology fetch. Returns at once when a topology is already known.
    pub async fn wait_for_topology(&self) -> Result<(), RequestExecutorError> {
        if self.state.is_disposed() {
            return Err(RequestExecutorError::Disposed);
        }
        self.state.wait_for_topology().await
    }

    /// Fetches the topology from `node` and applies it if it is newer, or unconditionally when
    /// `force` is set.
    ///
    /// Returns `Ok(false)` right away when another update is in progress. Skipping is
    /// intentional: a refresh never makes requests queue behind it.
    pub async fn update_topology(
        &self,
        node: ServerNode,
        force: bool,
    ) -> Result<bool, RequestExecutorError> {
        self.state.update_topology(node, force).await
    }

    pub fn get_preferred_node(&self) -> Option<ServerNode> {
        self.state.preferred_node()
    }

    pub fn get_requested_node(&self, cluster_tag: &str) -> Option<ServerNode> {
        self.state.requested_node(cluster_tag)
    }

    pub fn topology(&self) -> Option<Topology> {
        self.state.topology()
    }

    pub fn topology_nodes(&self) -> Vec<ServerNode> {
        self.state
            .topology()
            .map(|topology| topology.nodes)
            .unwrap_or_default()
    }

    pub fn topology_etag(&self) -> i64 {
        self.state.topology_etag()
    }

    pub fn database(&self) -> &str {
        &self.state.database
    }

    pub fn conventions(&self) -> &DocumentConventions {
        &self.state.conventions
    }

    /// When the last response was handed to a command.
    pub fn last_return_response(&self) -> Instant {
        self.state.last_return_response()
    }

    /// Whether a health check is currently running for `node`.
    pub fn is_health_checking(&self, node: &ServerNode) -> bool {
        self.state.failed_node_monitor.is_watching(node)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestExecutorEvent> {
        self.state.subscribe()
    }

    /// Stops all background work. Later calls to `execute` fail with
    /// [`RequestExecutorError::Disposed`]. Requests already in flight finish normally.
    pub fn close(&self) {
        self.state.close();
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_disposed()
    }
}
