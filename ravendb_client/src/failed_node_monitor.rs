use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::server_node::ServerNode;

type MonitorMap = HashMap<ServerNode, (u64, CancellationToken)>;

/// Health checks for nodes that failed a request.
///
/// Each watched node gets a background task that checks it on a fixed delay until a check
/// succeeds, then reports the node as restored and stops. Every task hangs off a parent
/// cancellation token, so cancelling that token stops them all.
#[derive(Debug)]
pub struct FailedNodeMonitor {
    check_interval: Duration,
    monitors: Arc<Mutex<MonitorMap>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl FailedNodeMonitor {
    pub fn new(check_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            check_interval,
            monitors: Arc::default(),
            next_generation: AtomicU64::new(0),
            shutdown,
        }
    }

    pub fn is_watching(&self, node: &ServerNode) -> bool {
        self.monitors.lock().contains_key(node)
    }

    pub fn watched_count(&self) -> usize {
        self.monitors.lock().len()
    }

    /// Starts probing `node` unless it is already watched. Returns whether a new monitor was
    /// started.
    ///
    /// `check` is called once per interval. `on_restored` runs once, after the first successful
    /// check, and never after the monitor was cancelled.
    #[instrument(level = "debug", skip(self, check, on_restored), fields(url = %node.url))]
    pub fn watch<P, Fut, R>(&self, node: ServerNode, check: P, on_restored: R) -> bool
    where
        P: Fn(ServerNode) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        R: FnOnce(ServerNode) + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let token = self.shutdown.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        {
            let mut monitors = self.monitors.lock();
            if monitors.contains_key(&node) {
                return false;
            }
            monitors.insert(node.clone(), (generation, token.clone()));
        }

        let monitors = Arc::clone(&self.monitors);
        let interval = self.check_interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Health check for `{}` cancelled", node.url);
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match check(node.clone()).await {
                            Ok(()) => {
                                if token.is_cancelled() {
                                    break;
                                }
                                remove_if_current(&monitors, &node, generation);
                                tracing::info!("Node `{}` is reachable again", node.url);
                                on_restored(node);
                                break;
                            }
                            Err(e) => {
                                tracing::debug!(
                                    "Node `{}` still unreachable. Caused by: {}",
                                    node.url,
                                    e
                                );
                            }
                        }
                    }
                }
            }
        });

        true
    }

    /// Stops every running health check. The parent token stays usable, so new nodes can be
    /// watched afterwards.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.monitors.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!("Cancelling {} health check(s)", drained.len());
        }
        for (_, (_, token)) in drained {
            token.cancel();
        }
    }
}

fn remove_if_current(monitors: &Mutex<MonitorMap>, node: &ServerNode, generation: u64) {
    let mut monitors = monitors.lock();
    if monitors.get(node).map(|(g, _)| *g) == Some(generation) {
        monitors.remove(node);
    }
}
