use serde::{Deserialize, Serialize};

use crate::server_node::ServerNode;

/// Etag of a topology that has never been fetched.
pub const ETAG_UNKNOWN: i64 = -1;

/// Etag given to a topology that must be replaced by the next real update, such as one loaded
/// from the on-disk cache. It compares lower than any etag the server hands out.
pub const ETAG_FORCED: i64 = -2;

/// A versioned, ordered list of the nodes serving a database (or the cluster).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topology {
    pub etag: i64,
    pub nodes: Vec<ServerNode>,
    #[serde(default)]
    pub leader_tag: Option<String>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            etag: ETAG_UNKNOWN,
            nodes: Vec::new(),
            leader_tag: None,
        }
    }
}

impl Topology {
    pub fn new(etag: i64, nodes: Vec<ServerNode>) -> Self {
        Self {
            etag,
            nodes,
            leader_tag: None,
        }
    }

    /// Index of the designated leader, or the first node when there is none.
    pub fn leader_index(&self) -> usize {
        self.leader_tag
            .as_deref()
            .and_then(|tag| {
                self.nodes
                    .iter()
                    .position(|n| n.cluster_tag.as_deref() == Some(tag))
            })
            .unwrap_or(0)
    }

    /// Whether `other` is allowed to replace this topology.
    pub fn is_superseded_by(&self, other: &Topology) -> bool {
        other.etag > self.etag
    }
}
