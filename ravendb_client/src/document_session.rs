use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::{
    error_chain_fmt,
    raven_command::{GetClusterTopologyCommand, GetDocumentCommand, PutDocumentCommand, PutResult},
    request_executor::{RequestExecutor, RequestExecutorError},
    topology::Topology,
};

#[derive(thiserror::Error)]
pub enum DocumentSessionError {
    #[error(
        "The maximum number of requests ({0}) allowed for this session has been reached. \
        Sessions are meant to be short lived units of work."
    )]
    MaxRequestsExceeded(u32),
    #[error(transparent)]
    RequestExecutor(#[from] RequestExecutorError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for DocumentSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Implements Unit of Work for accessing the RavenDB server.
///
/// Stored entities are kept in memory until [`save_changes`](DocumentSession::save_changes).
/// Every request the session sends counts against the per session limit from
/// [`DocumentConventions`](crate::DocumentConventions).
#[derive(Debug)]
pub struct DocumentSession {
    request_executor: RequestExecutor,
    number_of_requests: u32,
    pending: Vec<(String, serde_json::Value)>,
}

impl DocumentSession {
    pub fn new(request_executor: RequestExecutor) -> Self {
        Self {
            request_executor,
            number_of_requests: 0,
            pending: Vec::new(),
        }
    }

    pub fn number_of_requests(&self) -> u32 {
        self.number_of_requests
    }

    pub fn request_executor(&self) -> &RequestExecutor {
        &self.request_executor
    }

    /// Loads the document with `id`. Returns `None` when it doesn't exist.
    #[instrument(level = "debug", name = "Load Document", skip(self))]
    pub async fn load<T>(&mut self, id: &str) -> Result<Option<T>, DocumentSessionError>
    where
        T: DeserializeOwned + Send,
    {
        self.increment_requests_count()?;
        let mut command = GetDocumentCommand::<T>::new(id);
        Ok(self.request_executor.execute(&mut command).await?)
    }

    /// Queues `entity` to be written under `id` on the next call to `save_changes`. Storing the
    /// same id twice keeps the last entity.
    pub fn store<T: Serialize>(&mut self, id: &str, entity: &T) -> Result<(), DocumentSessionError> {
        let document = serde_json::to_value(entity)
            .map_err(|e| anyhow::anyhow!("Unable to serialize `{}`. Caused by: {}", id, e))?;
        match self.pending.iter_mut().find(|(pending_id, _)| pending_id == id) {
            Some((_, existing)) => *existing = document,
            None => self.pending.push((id.to_string(), document)),
        }
        Ok(())
    }

    /// Writes every stored entity. Entities that were written are no longer pending, even when
    /// a later write fails.
    #[instrument(level = "debug", name = "Save Changes", skip(self), fields(pending = self.pending.len()))]
    pub async fn save_changes(&mut self) -> Result<Vec<PutResult>, DocumentSessionError> {
        let mut results = Vec::with_capacity(self.pending.len());

        while !self.pending.is_empty() {
            self.increment_requests_count()?;
            let (id, document) = self.pending.remove(0);
            let mut command = PutDocumentCommand::new(id.clone(), document.clone(), None);
            match self.request_executor.execute(&mut command).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    self.pending.insert(0, (id, document));
                    return Err(e.into());
                }
            }
        }

        tracing::debug!("Saved {} documents", results.len());
        Ok(results)
    }

    #[instrument(level = "info", name = "Get Cluster Topology", skip(self))]
    pub async fn get_cluster_topology(&mut self) -> Result<Topology, DocumentSessionError> {
        self.increment_requests_count()?;
        let topology = self
            .request_executor
            .execute(&mut GetClusterTopologyCommand)
            .await?;
        tracing::info!("Cluster topology downloaded");
        Ok(topology)
    }

    fn increment_requests_count(&mut self) -> Result<(), DocumentSessionError> {
        let max = self
            .request_executor
            .conventions()
            .max_number_of_requests_per_session();
        if self.number_of_requests >= max {
            return Err(DocumentSessionError::MaxRequestsExceeded(max));
        }
        self.number_of_requests += 1;
        Ok(())
    }
}
