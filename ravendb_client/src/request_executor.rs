mod request_executor_actor;
mod request_executor_error;
mod request_executor_handle;
mod request_executor_state;

use std::{collections::HashMap, net::SocketAddr};

pub use request_executor_error::{NodeFailure, RequestExecutorError};
pub use request_executor_handle::RequestExecutor;
use tracing::instrument;

use crate::{server_node::ServerNode, DnsOverrides};

pub(crate) enum RequestExecutorMessage {
    /// Refresh the topology from the given node. Sent when a response asks for a refresh.
    UpdateTopology { node: ServerNode, force: bool },
}

/// Transport level settings for the HTTP client a [`RequestExecutor`] builds.
#[derive(Clone, Debug, Default)]
pub struct HttpClientOptions {
    pub client_identity: Option<reqwest::Identity>,
    pub dns_overrides: Option<DnsOverrides>,
    pub proxy_address: Option<String>,
}

/// Builds the one [`reqwest::Client`] an executor uses for its whole life. The client keeps a
/// connection pool, so it must be reused rather than rebuilt per request.
#[instrument(level = "debug", skip(options))]
pub(crate) fn build_http_client(options: &HttpClientOptions) -> anyhow::Result<reqwest::Client> {
    let mut client = reqwest::Client::builder();

    if let Some(identity) = options.client_identity.clone() {
        client = client.identity(identity).use_rustls_tls();
    }

    // Convert Option<HashMap<String, IpAddr>> into HashMap<String,SocketAddr>
    let overrides = options
        .dns_overrides
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, SocketAddr::new(v, 0)))
        .collect::<HashMap<String, SocketAddr>>();

    for (domain, address) in overrides {
        tracing::trace!(
            "Adding `{}->{}` to dns overrides for this client.",
            domain,
            address
        );
        client = client.resolve(domain.as_str(), address);
    }

    if let Some(proxy) = &options.proxy_address {
        tracing::trace!("Proxy set to `{}`", proxy);
        client = client.proxy(reqwest::Proxy::http(proxy)?);
    } else {
        tracing::trace!("No proxy defined. Using system settings.");
    }

    Ok(client.build()?)
}
