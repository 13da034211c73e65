use std::{collections::HashMap, net::IpAddr};

use tokio::sync::oneshot;
use url::Url;

use crate::{
    document_conventions::DocumentConventions, request_executor::RequestExecutor,
    DocumentStoreError,
};

pub type DnsOverrides = HashMap<String, IpAddr>;

#[derive(Debug)]
pub enum DocumentStoreMessage {
    /// Returns the cached [`RequestExecutor`] for a database, creating it on first use.
    GetRequestExecutor {
        database_name: Option<String>,
        respond_to: oneshot::Sender<Result<RequestExecutor, DocumentStoreError>>,
    },
    GetDatabase {
        respond_to: oneshot::Sender<Option<String>>,
    },
    /// Closes every request executor. The store refuses further work afterwards.
    Close { respond_to: oneshot::Sender<()> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentStoreState {
    /// [`DocumentStore`](crate::DocumentStore) was initialized but has since been closed.
    Closed,

    /// [`DocumentStore`](crate::DocumentStore) is initialized.
    Initialized,
}

/// Everything the builder hands to a new [`DocumentStoreActor`](crate::DocumentStoreActor).
#[derive(Debug)]
pub struct DocumentStoreInitialConfiguration {
    pub(crate) client_identity: Option<reqwest::Identity>,
    pub(crate) conventions: DocumentConventions,
    pub(crate) database_name: Option<String>,
    pub(crate) dns_overrides: Option<DnsOverrides>,
    pub(crate) initial_urls: Vec<Url>,
    pub(crate) proxy_address: Option<String>,
}
