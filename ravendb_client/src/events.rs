use url::Url;

use crate::request_executor::NodeFailure;

/// Published by a [`RequestExecutor`](crate::RequestExecutor) to anyone who subscribed.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestExecutorEvent {
    SucceededRequest { url: Url },
    FailedRequest { url: Url, reason: NodeFailure },
    TopologyUpdated { etag: i64 },
    NodeRestored { url: Url },
}
