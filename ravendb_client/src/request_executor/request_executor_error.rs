use std::{collections::HashMap, fmt};

use reqwest::StatusCode;
use url::Url;

use crate::{error_chain_fmt, server_node::ServerNode};

/// Why a node was considered down for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeFailure {
    /// 408, 502, 503 or 504.
    Status(StatusCode),
    Timeout,
    /// Connection refused, DNS failure and the like. Nothing reached the server.
    Connect(String),
    /// The connection broke after the request was sent, e.g. while reading the body.
    Transport(String),
}

impl NodeFailure {
    /// Whether the server may have received, and acted on, the request before it failed.
    pub fn request_may_have_been_applied(&self) -> bool {
        matches!(self, NodeFailure::Timeout | NodeFailure::Transport(_))
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeFailure::Status(status) => write!(f, "server responded with {}", status),
            NodeFailure::Timeout => write!(f, "request timed out"),
            NodeFailure::Connect(message) | NodeFailure::Transport(message) => {
                write!(f, "{}", message)
            }
        }
    }
}

#[derive(thiserror::Error)]
pub enum RequestExecutorError {
    #[error("All topology nodes are down: {}", format_failures(.errors))]
    AllTopologyNodesDown {
        errors: HashMap<ServerNode, NodeFailure>,
    },
    #[error("Node `{url}` is down: {reason}")]
    NodeDown { url: Url, reason: NodeFailure },
    #[error("Invalid authorization for `{url}`, ensure valid certificate supplied")]
    BadAuthorization { url: Url },
    #[error("Conflict reported by `{url}`: {message}")]
    Conflict { url: Url, message: String },
    #[error("Database `{0}` does not exist")]
    DatabaseDoesNotExist(String),
    #[error("Server `{url}` responded with {status}: {message}")]
    ServerError {
        url: Url,
        status: StatusCode,
        message: String,
    },
    #[error("Unable to establish topology from any of the given urls: {}", format_url_failures(.errors))]
    TopologyUnavailable { errors: Vec<(Url, String)> },
    #[error("No topology is available to choose a node from")]
    NoTopology,
    #[error("The request executor has been closed")]
    Disposed,
    #[error("Invalid response from `{url}`")]
    InvalidResponse {
        url: Url,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for RequestExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

fn format_failures(errors: &HashMap<ServerNode, NodeFailure>) -> String {
    let mut lines = errors
        .iter()
        .map(|(node, failure)| format!("`{}` ({})", node.url, failure))
        .collect::<Vec<_>>();
    lines.sort();
    lines.join(", ")
}

fn format_url_failures(errors: &[(Url, String)]) -> String {
    errors
        .iter()
        .map(|(url, e)| format!("`{}` ({})", url, e))
        .collect::<Vec<_>>()
        .join(", ")
}
