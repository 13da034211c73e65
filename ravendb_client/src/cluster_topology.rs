use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

use crate::{server_node::ServerNode, topology::Topology};

/// Body returned by `GET /cluster/topology`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterTopologyInfo {
    pub topology: ClusterTopology,
    pub etag: i64,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub node_tag: Option<String>,
    #[serde(default)]
    pub current_term: i64,
    #[serde(default)]
    pub current_state: Option<NodeState>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterTopology {
    #[serde(default)]
    pub topology_id: Option<String>,
    pub all_nodes: BTreeMap<String, Url>,
    #[serde(default)]
    pub members: BTreeMap<String, Url>,
    #[serde(default)]
    pub promotables: BTreeMap<String, Url>,
    #[serde(default)]
    pub watchers: BTreeMap<String, Url>,
    #[serde(default)]
    pub etag: i64,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    #[default]
    Undefined,
    Passive,
    Candidate,
    Follower,
    #[serde(rename = "Leader-Elect")]
    LeaderElect,
    Leader,
}

impl From<ClusterTopologyInfo> for Topology {
    /// Cluster level nodes carry an empty database name. Nodes are ordered by tag.
    fn from(info: ClusterTopologyInfo) -> Self {
        let nodes = info
            .topology
            .all_nodes
            .into_iter()
            .map(|(tag, url)| ServerNode::new(url, String::new()).with_cluster_tag(tag))
            .collect();
        Topology {
            etag: info.etag,
            nodes,
            leader_tag: info.leader,
        }
    }
}
