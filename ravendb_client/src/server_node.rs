use std::{
    collections::VecDeque,
    hash::{Hash, Hasher},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Number of response time samples kept per node.
pub const RESPONSE_TIME_SAMPLES: usize = 5;

/// Weight given to the newest sample in the moving average.
const EWMA_SMOOTHING: f64 = 0.3;

/// A single database node in the cluster.
///
/// Two nodes are the same node when they share a url and a database. The cluster tag and role
/// are informational and may change between topology versions without changing identity.
///
/// Response time statistics are shared between clones of the same node, so a sample recorded
/// through one handle is visible to every holder of the topology.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerNode {
    pub url: Url,
    pub database: String,
    pub cluster_tag: Option<String>,
    #[serde(default)]
    pub server_role: ServerRole,
    #[serde(skip)]
    stats: Arc<Mutex<ResponseTimeStats>>,
}

impl ServerNode {
    pub fn new(url: Url, database: String) -> Self {
        Self {
            url,
            database,
            cluster_tag: None,
            server_role: ServerRole::default(),
            stats: Arc::default(),
        }
    }

    pub fn with_cluster_tag(mut self, cluster_tag: impl Into<String>) -> Self {
        self.cluster_tag = Some(cluster_tag.into());
        self
    }

    pub fn with_server_role(mut self, server_role: ServerRole) -> Self {
        self.server_role = server_role;
        self
    }

    /// Appends the duration of a completed request to this node's statistics.
    pub fn record_response_time(&self, elapsed: Duration) {
        self.stats.lock().record(elapsed);
    }

    /// Exponentially weighted moving average of recent response times, in milliseconds.
    ///
    /// `None` until at least one request against this node has completed.
    pub fn average_response_time_ms(&self) -> Option<f64> {
        self.stats.lock().ewma_ms
    }

    /// Most recent samples, oldest first.
    pub fn recent_response_times(&self) -> Vec<Duration> {
        self.stats.lock().samples.iter().copied().collect()
    }
}

impl PartialEq for ServerNode {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.database == other.database
    }
}

impl Eq for ServerNode {}

impl Hash for ServerNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.database.hash(state);
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ServerRole {
    #[default]
    None,
    Promotable,
    Member,
    Rehab,
}

/// Fixed capacity ring buffer of response times plus the derived moving average.
#[derive(Debug, Default)]
struct ResponseTimeStats {
    samples: VecDeque<Duration>,
    ewma_ms: Option<f64>,
}

impl ResponseTimeStats {
    fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == RESPONSE_TIME_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);

        let sample_ms = elapsed.as_secs_f64() * 1000.0;
        self.ewma_ms = Some(match self.ewma_ms {
            Some(previous) => EWMA_SMOOTHING * sample_ms + (1.0 - EWMA_SMOOTHING) * previous,
            None => sample_ms,
        });
    }
}
