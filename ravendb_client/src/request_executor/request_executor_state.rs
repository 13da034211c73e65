use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc,
    },
    time::Instant,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    StatusCode,
};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{NodeFailure, RequestExecutorError, RequestExecutorMessage};
use crate::{
    document_conventions::DocumentConventions,
    events::RequestExecutorEvent,
    failed_node_monitor::FailedNodeMonitor,
    node_selector::NodeSelector,
    raven_command::{
        GetClusterTopologyCommand, GetDatabaseTopologyCommand, HealthCheckCommand, RavenCommand,
        ServerResponse,
    },
    server_node::ServerNode,
    topology::{Topology, ETAG_UNKNOWN},
    topology_cache::TopologyCache,
};

const TOPOLOGY_ETAG_HEADER: &str = "Topology-Etag";
const REFRESH_TOPOLOGY_HEADER: &str = "Refresh-Topology";
const DATABASE_MISSING_HEADER: &str = "Database-Missing";

/// Outcome of the first topology fetch. Shared by every caller waiting on it.
pub(super) type FirstTopologyUpdate = Shared<BoxFuture<'static, Result<(), Vec<(Url, String)>>>>;

/// A response that made it back from a node, whatever its status.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// What one attempt against one node came to.
enum Attempt<T> {
    Done(Result<T, RequestExecutorError>),
    NodeDown(NodeFailure),
}

/// Everything a [`RequestExecutor`](super::RequestExecutor) handle shares with its clones and
/// background tasks.
///
/// Requests run concurrently on their callers' tasks. The only serialized work is topology
/// replacement (`update_topology_lock`) and the short sections that touch the node selector.
pub(super) struct RequestExecutorState {
    pub(super) database: String,
    pub(super) initial_urls: Vec<Url>,
    pub(super) conventions: DocumentConventions,
    pub(super) topology_updates_disabled: bool,
    /// Sent with topology requests so the server can warn about executors being recreated
    /// instead of reused.
    application_id: Uuid,
    client: reqwest::Client,
    node_selector: Mutex<Option<NodeSelector>>,
    topology_etag: AtomicI64,
    update_topology_lock: tokio::sync::Mutex<()>,
    pub(super) first_topology_update: Mutex<Option<FirstTopologyUpdate>>,
    pub(super) failed_node_monitor: FailedNodeMonitor,
    topology_cache: TopologyCache,
    last_return_response: Mutex<Instant>,
    disposed: AtomicBool,
    pub(super) shutdown: CancellationToken,
    speed_test_running: AtomicBool,
    events: broadcast::Sender<RequestExecutorEvent>,
    messages: mpsc::Sender<RequestExecutorMessage>,
}

pub(super) struct StateParts {
    pub(super) database: String,
    pub(super) initial_urls: Vec<Url>,
    pub(super) conventions: DocumentConventions,
    pub(super) topology_updates_disabled: bool,
    pub(super) client: reqwest::Client,
    pub(super) topology_cache: TopologyCache,
    pub(super) messages: mpsc::Sender<RequestExecutorMessage>,
    pub(super) shutdown: CancellationToken,
}

impl RequestExecutorState {
    pub(super) fn new(parts: StateParts) -> Self {
        let (events, _) = broadcast::channel(64);
        let failed_node_monitor = FailedNodeMonitor::new(
            parts.conventions.failed_node_check_interval(),
            parts.shutdown.clone(),
        );

        Self {
            database: parts.database,
            initial_urls: parts.initial_urls,
            topology_updates_disabled: parts.topology_updates_disabled,
            application_id: Uuid::new_v4(),
            client: parts.client,
            node_selector: Mutex::new(None),
            topology_etag: AtomicI64::new(ETAG_UNKNOWN),
            update_topology_lock: tokio::sync::Mutex::new(()),
            first_topology_update: Mutex::new(None),
            failed_node_monitor,
            topology_cache: parts.topology_cache,
            last_return_response: Mutex::new(Instant::now()),
            disposed: AtomicBool::new(false),
            shutdown: parts.shutdown,
            speed_test_running: AtomicBool::new(false),
            events,
            messages: parts.messages,
            conventions: parts.conventions,
        }
    }

    // ----- Accessors -----

    pub(super) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(super) fn topology_etag(&self) -> i64 {
        self.topology_etag.load(Ordering::Acquire)
    }

    pub(super) fn last_return_response(&self) -> Instant {
        *self.last_return_response.lock()
    }

    pub(super) fn subscribe(&self) -> broadcast::Receiver<RequestExecutorEvent> {
        self.events.subscribe()
    }

    pub(super) fn topology(&self) -> Option<Topology> {
        self.node_selector
            .lock()
            .as_ref()
            .map(|selector| selector.topology().clone())
    }

    pub(super) fn preferred_node(&self) -> Option<ServerNode> {
        self.node_selector
            .lock()
            .as_ref()
            .and_then(|selector| selector.get_preferred_node())
            .map(|(_, node)| node)
    }

    pub(super) fn requested_node(&self, cluster_tag: &str) -> Option<ServerNode> {
        self.node_selector
            .lock()
            .as_ref()
            .and_then(|selector| selector.get_requested_node(cluster_tag))
            .map(|(_, node)| node)
    }

    pub(super) fn schedule_speed_test(&self) {
        if let Some(selector) = self.node_selector.lock().as_mut() {
            selector.schedule_speed_test();
        }
    }

    fn emit(&self, event: RequestExecutorEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    // ----- Lifecycle -----

    /// Seeds the selector directly, without asking any server. Used for single node executors.
    pub(super) fn seed_topology(&self, topology: Topology) {
        self.apply_topology(topology, true);
    }

    pub(super) fn close(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Closing request executor for `{}`", self.database);
        self.failed_node_monitor.cancel_all();
        self.shutdown.cancel();
    }

    fn ensure_not_disposed(&self) -> Result<(), RequestExecutorError> {
        if self.is_disposed() {
            return Err(RequestExecutorError::Disposed);
        }
        Ok(())
    }

    // ----- First topology update -----

    /// Spawns the first topology update and returns a handle every caller can wait on.
    pub(super) fn start_first_topology_update(self: &Arc<Self>) -> FirstTopologyUpdate {
        let state = Arc::clone(self);
        let urls = self.initial_urls.clone();
        let handle = tokio::spawn(async move { state.first_topology_update().await });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(urls
                    .into_iter()
                    .map(|url| (url, format!("Topology update task failed: {}", e)))
                    .collect())
            })
        }
        .boxed()
        .shared()
    }

    /// Blocks until a topology is available. Callers arriving before the first update finishes
    /// all wait on the same task. A failed first update keeps failing every caller.
    pub(super) async fn wait_for_topology(self: &Arc<Self>) -> Result<(), RequestExecutorError> {
        let has_topology = self.node_selector.lock().is_some();
        if has_topology || self.topology_updates_disabled {
            return Ok(());
        }

        let pending = {
            let mut first = self.first_topology_update.lock();
            match first.as_ref() {
                Some(update) => update.clone(),
                None => {
                    let update = self.start_first_topology_update();
                    *first = Some(update.clone());
                    update
                }
            }
        };

        pending
            .await
            .map_err(|errors| RequestExecutorError::TopologyUnavailable { errors })
    }

    #[instrument(level = "debug", skip(self), fields(database = %self.database))]
    async fn first_topology_update(self: Arc<Self>) -> Result<(), Vec<(Url, String)>> {
        let mut server_errors = Vec::new();

        for url in &self.initial_urls {
            let node = ServerNode::new(url.clone(), self.database.clone());
            let _guard = self.update_topology_lock.lock().await;

            match self.fetch_and_apply_topology(&node, false).await {
                Ok(_) => {
                    tracing::info!("Initial topology update complete using `{}`", url);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Unable to fetch topology from `{}`. Caused by: {}", url, e);
                    server_errors.push((url.clone(), e.to_string()));
                }
            }
        }

        // No seed answered. A cached topology beats failing outright.
        if let Some(topology) = self
            .topology_cache
            .try_load_from_cache(&self.initial_urls, &self.database)
        {
            self.apply_topology(topology, true);
            return Ok(());
        }

        tracing::error!(
            "Unable to establish a topology for `{}` from any seed url",
            self.database
        );
        Err(server_errors)
    }

    // ----- Topology refresh -----

    /// Refreshes the topology from `node`. Returns `Ok(false)` without doing anything when
    /// another refresh is already running or the executor is closed.
    #[instrument(level = "debug", skip(self), fields(url = %node.url))]
    pub(super) async fn update_topology(
        &self,
        node: ServerNode,
        force: bool,
    ) -> Result<bool, RequestExecutorError> {
        if self.is_disposed() {
            return Ok(false);
        }

        let Ok(_guard) = self.update_topology_lock.try_lock() else {
            tracing::debug!("Topology update already running, skipping.");
            return Ok(false);
        };

        self.fetch_and_apply_topology(&node, force).await?;
        Ok(true)
    }

    /// Caller must hold `update_topology_lock`.
    async fn fetch_and_apply_topology(
        &self,
        node: &ServerNode,
        force: bool,
    ) -> Result<bool, RequestExecutorError> {
        let topology = if self.database.is_empty() {
            self.execute_on_node(node, &mut GetClusterTopologyCommand).await?
        } else {
            let application_id = self
                .conventions
                .send_application_identifier()
                .then_some(self.application_id);
            self.execute_on_node(node, &mut GetDatabaseTopologyCommand::new(application_id))
                .await?
        };

        if topology.nodes.is_empty() {
            return Err(RequestExecutorError::UnexpectedError(anyhow::anyhow!(
                "Topology returned by `{}` contains no nodes",
                node.url
            )));
        }

        let changed = self.apply_topology(topology.clone(), force);
        if changed {
            // Bootstrap only ever reads the seed urls' entries, whichever node answered here.
            self.topology_cache
                .save_for_seeds(&self.initial_urls, &self.database, &topology);
        }

        Ok(changed)
    }

    /// Hands a topology to the selector. Returns whether it replaced the current one.
    fn apply_topology(&self, topology: Topology, force: bool) -> bool {
        let etag = topology.etag;
        let changed = {
            let mut selector = self.node_selector.lock();
            match selector.as_mut() {
                Some(selector) => selector.on_update_topology(topology, force),
                None => {
                    *selector = Some(NodeSelector::new(
                        topology,
                        self.conventions.read_balance_behavior(),
                    ));
                    true
                }
            }
        };

        if changed {
            self.topology_etag.store(etag, Ordering::Release);
            // Failed node indexes refer to the old node list.
            self.failed_node_monitor.cancel_all();
            tracing::info!("Topology updated to etag {}", etag);
            self.emit(RequestExecutorEvent::TopologyUpdated { etag });
        } else {
            tracing::debug!("Ignoring topology with etag {}, not newer", etag);
        }

        changed
    }

    fn request_topology_refresh(&self, node: &ServerNode) {
        if self.topology_updates_disabled {
            return;
        }
        let message = RequestExecutorMessage::UpdateTopology {
            node: node.clone(),
            force: false,
        };
        if self.messages.try_send(message).is_err() {
            tracing::trace!("Topology refresh already queued, dropping request");
        }
    }

    // ----- Execution -----

    pub(super) async fn execute<C: RavenCommand>(
        self: &Arc<Self>,
        command: &mut C,
    ) -> Result<C::Result, RequestExecutorError> {
        self.ensure_not_disposed()?;
        self.wait_for_topology().await?;

        let (chosen, race) = {
            let mut selector = self.node_selector.lock();
            match selector.as_mut() {
                Some(selector) => (
                    selector.get_node_for_request(command.is_read_request()),
                    command.is_read_request() && selector.in_speed_test_phase(),
                ),
                None => (None, false),
            }
        };
        let (index, node) = chosen.ok_or(RequestExecutorError::NoTopology)?;

        if race {
            self.spawn_speed_test(command);
        }

        self.execute_with_node(Some(index), node, command, true).await
    }

    /// Runs `command` against `node` exactly once, without failing over.
    pub(super) async fn execute_on_node<C: RavenCommand>(
        &self,
        node: &ServerNode,
        command: &mut C,
    ) -> Result<C::Result, RequestExecutorError> {
        self.ensure_not_disposed()?;
        let outcome = self.attempt(None, node, command).await?;
        match outcome {
            Attempt::Done(result) => result,
            Attempt::NodeDown(reason) => {
                self.emit(RequestExecutorEvent::FailedRequest {
                    url: node.url.clone(),
                    reason: reason.clone(),
                });
                Err(RequestExecutorError::NodeDown {
                    url: node.url.clone(),
                    reason,
                })
            }
        }
    }

    /// Sends `command` to `node`, failing over to the next node on liveness failures.
    ///
    /// Every node is tried at most once per call: the loop stops as soon as the selector hands
    /// back a node this call already saw fail.
    #[instrument(
        level = "debug",
        skip(self, node, command),
        fields(url = %node.url, database = %self.database)
    )]
    pub(super) async fn execute_with_node<C: RavenCommand>(
        self: &Arc<Self>,
        index: Option<usize>,
        node: ServerNode,
        command: &mut C,
        should_retry: bool,
    ) -> Result<C::Result, RequestExecutorError> {
        let mut failed_nodes: HashMap<ServerNode, NodeFailure> = HashMap::new();
        let mut index = index;
        let mut node = node;

        loop {
            let reason = match self.attempt(index, &node, command).await? {
                Attempt::Done(result) => return result,
                Attempt::NodeDown(reason) => reason,
            };

            tracing::warn!("Request to `{}` failed: {}", node.url, reason);
            self.emit(RequestExecutorEvent::FailedRequest {
                url: node.url.clone(),
                reason: reason.clone(),
            });
            failed_nodes.insert(node.clone(), reason.clone());

            let next = match index {
                Some(failed_index) if should_retry => {
                    self.fail_over(failed_index, &node, &failed_nodes)
                }
                _ => None,
            };

            // The server may already have applied it. Sending it again elsewhere could apply
            // it twice.
            if !command.is_idempotent() && reason.request_may_have_been_applied() {
                tracing::warn!(
                    "Not retrying non idempotent request after `{}` failed: {}",
                    node.url,
                    reason
                );
                return Err(RequestExecutorError::NodeDown {
                    url: node.url,
                    reason,
                });
            }

            match next {
                None => {
                    return Err(RequestExecutorError::NodeDown {
                        url: node.url,
                        reason,
                    })
                }
                Some((_, next_node)) if failed_nodes.contains_key(&next_node) => {
                    return Err(RequestExecutorError::AllTopologyNodesDown {
                        errors: failed_nodes,
                    });
                }
                Some((next_index, next_node)) => {
                    tracing::debug!("Failing over to `{}`", next_node.url);
                    index = Some(next_index);
                    node = next_node;
                }
            }
        }
    }

    /// Records the failure with the selector, starts a health check for the failed node and
    /// returns the node to try next. `None` when there is nothing to fail over to.
    fn fail_over(
        self: &Arc<Self>,
        index: usize,
        node: &ServerNode,
        failed_nodes: &HashMap<ServerNode, NodeFailure>,
    ) -> Option<(usize, ServerNode)> {
        let (failed_index, next) = {
            let mut selector = self.node_selector.lock();
            let selector = selector.as_mut()?;
            if selector.nodes().len() <= 1 {
                return None;
            }
            if selector.nodes().get(index) == Some(node) {
                selector.on_failed_request(index);
                (index, selector.get_current_node())
            } else {
                // The topology changed under us, the index is stale. The refresh reset the
                // failure counts, so nodes this call already tried are skipped explicitly.
                let moved_to = selector.nodes().iter().position(|n| n == node);
                if let Some(moved_to) = moved_to {
                    selector.on_failed_request(moved_to);
                }
                let next = selector
                    .get_preferred_node_skipping(|n| failed_nodes.contains_key(n))
                    .or_else(|| selector.get_preferred_node());
                (moved_to.unwrap_or(index), next)
            }
        };

        self.watch_failed_node(failed_index, node.clone());
        next
    }

    fn watch_failed_node(self: &Arc<Self>, index: usize, node: ServerNode) {
        let check_state = Arc::downgrade(self);
        let restore_state = Arc::downgrade(self);

        self.failed_node_monitor.watch(
            node,
            move |node| {
                let state = check_state.clone();
                async move {
                    match state.upgrade() {
                        Some(state) => state.check_node_status(&node).await,
                        None => Err(anyhow::anyhow!("Request executor was dropped")),
                    }
                }
            },
            move |node| {
                if let Some(state) = restore_state.upgrade() {
                    state.restore_node(index, &node);
                }
            },
        );
    }

    /// Health check: succeeds when the node answers with anything but a liveness failure.
    async fn check_node_status(&self, node: &ServerNode) -> anyhow::Result<()> {
        match self.send(node, &HealthCheckCommand).await? {
            Ok(response) if !is_node_down_status(response.status) => Ok(()),
            Ok(response) => Err(anyhow::anyhow!(
                "health check answered with {}",
                response.status
            )),
            Err(reason) => Err(anyhow::anyhow!("health check failed: {}", reason)),
        }
    }

    fn restore_node(&self, index: usize, node: &ServerNode) {
        let restored = {
            let mut selector = self.node_selector.lock();
            match selector.as_mut() {
                Some(selector) if selector.nodes().get(index) == Some(node) => {
                    selector.restore_node_index(index);
                    true
                }
                _ => false,
            }
        };

        if restored {
            self.emit(RequestExecutorEvent::NodeRestored {
                url: node.url.clone(),
            });
        }
    }

    /// One request against one node, classified.
    async fn attempt<C: RavenCommand>(
        &self,
        index: Option<usize>,
        node: &ServerNode,
        command: &mut C,
    ) -> Result<Attempt<C::Result>, RequestExecutorError> {
        let response = match self.send(node, command).await? {
            Ok(response) => response,
            Err(reason) => return Ok(Attempt::NodeDown(reason)),
        };

        let status = response.status;
        let outcome = match status {
            StatusCode::NOT_FOUND => Attempt::Done(self.finish(
                index,
                node,
                command,
                &response.headers,
                ServerResponse::NotFound,
            )),
            s if s.is_success() || s == StatusCode::NOT_MODIFIED => {
                let headers = response.headers.clone();
                Attempt::Done(self.finish(
                    index,
                    node,
                    command,
                    &headers,
                    ServerResponse::Found {
                        status,
                        headers: response.headers,
                        body: response.body,
                    },
                ))
            }
            StatusCode::FORBIDDEN => Attempt::Done(Err(RequestExecutorError::BadAuthorization {
                url: node.url.clone(),
            })),
            StatusCode::CONFLICT => Attempt::Done(Err(RequestExecutorError::Conflict {
                url: node.url.clone(),
                message: body_text(&response.body),
            })),
            StatusCode::SERVICE_UNAVAILABLE
                if response.headers.contains_key(DATABASE_MISSING_HEADER) =>
            {
                Attempt::Done(Err(RequestExecutorError::DatabaseDoesNotExist(
                    node.database.clone(),
                )))
            }
            s if is_node_down_status(s) => Attempt::NodeDown(NodeFailure::Status(s)),
            s => Attempt::Done(Err(RequestExecutorError::ServerError {
                url: node.url.clone(),
                status: s,
                message: body_text(&response.body),
            })),
        };

        Ok(outcome)
    }

    /// Bookkeeping for a response the command gets to see, then hands it over.
    fn finish<C: RavenCommand>(
        &self,
        index: Option<usize>,
        node: &ServerNode,
        command: &mut C,
        headers: &HeaderMap,
        response: ServerResponse,
    ) -> Result<C::Result, RequestExecutorError> {
        *self.last_return_response.lock() = Instant::now();

        if let Some(index) = index {
            if let Some(selector) = self.node_selector.lock().as_mut() {
                if selector.nodes().get(index) == Some(node) {
                    selector.on_successful_request(index);
                }
            }
        }

        self.emit(RequestExecutorEvent::SucceededRequest {
            url: node.url.clone(),
        });

        let refresh = headers
            .get(REFRESH_TOPOLOGY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if refresh {
            tracing::debug!("`{}` asked for a topology refresh", node.url);
            self.request_topology_refresh(node);
        }

        command
            .set_response(response)
            .map_err(|e| RequestExecutorError::InvalidResponse {
                url: node.url.clone(),
                source: e.into(),
            })
    }

    /// Sends the request built by `command`. The outer error is a failure to build the request,
    /// the inner one a node that could not be reached.
    async fn send<C: RavenCommand>(
        &self,
        node: &ServerNode,
        command: &C,
    ) -> Result<Result<RawResponse, NodeFailure>, RequestExecutorError> {
        let request = self.prepare_request(node, command)?;
        tracing::trace!("Sending {} {}", request.method(), request.url());

        let started = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return Ok(Err(classify_transport_error(&e))),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => return Ok(Err(classify_transport_error(&e))),
        };
        node.record_response_time(started.elapsed());

        Ok(Ok(RawResponse {
            status,
            headers,
            body,
        }))
    }

    fn prepare_request<C: RavenCommand>(
        &self,
        node: &ServerNode,
        command: &C,
    ) -> Result<reqwest::Request, RequestExecutorError> {
        let mut request = command.create_request(&self.client, node)?;
        *request.timeout_mut() = Some(self.conventions.request_timeout());
        request
            .headers_mut()
            .insert(TOPOLOGY_ETAG_HEADER, HeaderValue::from(self.topology_etag()));
        Ok(request)
    }

    // ----- Speed test -----

    /// Races the command's request against every node in the background. The first node to
    /// answer successfully becomes the fastest node. Losers run to completion and are ignored.
    fn spawn_speed_test<C: RavenCommand>(self: &Arc<Self>, command: &C) {
        if self.speed_test_running.swap(true, Ordering::AcqRel) {
            return;
        }

        let (etag, nodes) = {
            let selector = self.node_selector.lock();
            match selector.as_ref() {
                Some(selector) => (selector.topology().etag, selector.nodes().to_vec()),
                None => (ETAG_UNKNOWN, Vec::new()),
            }
        };

        let requests = nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                self.prepare_request(node, command)
                    .map_err(|e| tracing::debug!("Skipping `{}` in speed test: {}", node.url, e))
                    .ok()
                    .map(|request| (index, request))
            })
            .collect::<Vec<_>>();

        let state = Arc::clone(self);
        tokio::spawn(async move {
            state.run_speed_test(etag, requests).await;
            state.speed_test_running.store(false, Ordering::Release);
        });
    }

    async fn run_speed_test(&self, etag: i64, requests: Vec<(usize, reqwest::Request)>) {
        let (tx, mut rx) = mpsc::channel(requests.len().max(1));

        for (index, request) in requests {
            let client = self.client.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Ok(response) = client.execute(request).await {
                    if response.status().is_success() {
                        let _ = tx.send(index).await;
                    }
                }
            });
        }
        drop(tx);

        let Some(winner) = rx.recv().await else {
            tracing::debug!("Speed test finished without any node answering");
            return;
        };

        if let Some(selector) = self.node_selector.lock().as_mut() {
            if selector.topology().etag == etag {
                tracing::debug!("Speed test won by node {}", winner);
                selector.record_fastest(winner);
            }
        }
    }
}

impl Drop for RequestExecutorState {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn is_node_down_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn classify_transport_error(e: &reqwest::Error) -> NodeFailure {
    if e.is_timeout() {
        NodeFailure::Timeout
    } else if e.is_connect() {
        NodeFailure::Connect(e.to_string())
    } else {
        NodeFailure::Transport(e.to_string())
    }
}

fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}
