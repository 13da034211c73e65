use serde::Deserialize;
use url::Url;

use crate::{
    server_node::{ServerNode, ServerRole},
    topology::Topology,
};

/// Body returned by `GET /topology?name=<database>`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseTopology {
    pub nodes: Vec<DatabaseTopologyNode>,
    pub etag: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseTopologyNode {
    pub url: Url,
    pub cluster_tag: Option<String>,
    pub database: String,
    #[serde(default)]
    pub server_role: ServerRole,
}

impl From<DatabaseTopology> for Topology {
    fn from(topology: DatabaseTopology) -> Self {
        let nodes = topology
            .nodes
            .into_iter()
            .map(|n| {
                let mut node = ServerNode::new(n.url, n.database).with_server_role(n.server_role);
                node.cluster_tag = n.cluster_tag;
                node
            })
            .collect();
        Topology::new(topology.etag, nodes)
    }
}
