use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{instrument, Span};
use url::Url;
use uuid::Uuid;

use crate::{
    document_conventions::DocumentConventions,
    request_executor::{HttpClientOptions, RequestExecutor},
    DocumentStoreError, DocumentStoreInitialConfiguration, DocumentStoreMessage,
    DocumentStoreState,
};

pub struct DocumentStoreActor {
    client_options: HttpClientOptions,
    conventions: DocumentConventions,
    database_name: Option<String>,
    initial_urls: Vec<Url>,
    receiver: mpsc::Receiver<DocumentStoreMessage>,
    request_executors: HashMap<String, RequestExecutor>,
    state: DocumentStoreState,
}
impl DocumentStoreActor {
    pub fn new(
        receiver: mpsc::Receiver<DocumentStoreMessage>,
        initial_config: DocumentStoreInitialConfiguration,
    ) -> Self {
        Self {
            client_options: HttpClientOptions {
                client_identity: initial_config.client_identity,
                dns_overrides: initial_config.dns_overrides,
                proxy_address: initial_config.proxy_address,
            },
            conventions: initial_config.conventions,
            database_name: initial_config.database_name,
            initial_urls: initial_config.initial_urls,
            receiver,
            request_executors: HashMap::default(),
            state: DocumentStoreState::Initialized,
        }
    }

    /// Message handler for the DocumentStoreActor
    #[instrument(
        level = "debug",
        name = "DocumentStore Actor - Handle Message",
        skip(self),
        fields(correlation_id)
    )]
    async fn handle_message(&mut self, msg: DocumentStoreMessage) {
        // Apply a correlation id to all child spans of this message handler
        Span::current().record("correlation_id", Uuid::new_v4().to_string());
        match msg {
            DocumentStoreMessage::GetRequestExecutor {
                database_name,
                respond_to,
            } => {
                let result = self.get_request_executor(database_name);
                let _ = respond_to.send(result);
            }
            DocumentStoreMessage::GetDatabase { respond_to } => {
                let _ = respond_to.send(self.database_name.clone());
            }
            DocumentStoreMessage::Close { respond_to } => {
                self.close();
                let _ = respond_to.send(());
            }
        }
    }

    /// See doc comments for [`DocumentStore`](crate::DocumentStore::get_request_executor)
    #[instrument(level = "debug", skip(self))]
    fn get_request_executor(
        &mut self,
        database: Option<String>,
    ) -> Result<RequestExecutor, DocumentStoreError> {
        if self.state == DocumentStoreState::Closed {
            return Err(DocumentStoreError::StoreClosed);
        }

        // Get the database name that was passed in, or from the document store
        let database = database
            .or_else(|| self.database_name.clone())
            .ok_or(DocumentStoreError::NoDatabaseSpecified)?;

        // See if there is a stored executor for the database
        if let Some(executor) = self.request_executors.get(&database) {
            return Ok(executor.clone());
        }

        let executor = if self.conventions.disable_topology_updates() {
            // Talk to one specific server, ignoring topology
            let url = self
                .initial_urls
                .first()
                .cloned()
                .ok_or(DocumentStoreError::MissingUrlsError)?;
            RequestExecutor::new_for_single_node(
                url,
                &database,
                self.conventions.clone(),
                &self.client_options,
            )?
        } else {
            RequestExecutor::new(
                self.initial_urls.clone(),
                &database,
                self.conventions.clone(),
                &self.client_options,
            )?
        };

        tracing::debug!("Created request executor for `{}`", database);

        // Clone the executor handle store it in the document store
        self.request_executors.insert(database, executor.clone());

        // Send the executor handle back to the requestor
        Ok(executor)
    }

    fn close(&mut self) {
        if self.state == DocumentStoreState::Closed {
            return;
        }
        for (database, executor) in self.request_executors.drain() {
            tracing::debug!("Closing request executor for `{}`", database);
            executor.close();
        }
        self.state = DocumentStoreState::Closed;
    }
}

#[instrument(level = "debug", name = "Running Document Store Actor", skip(actor))]
pub async fn run_document_store_actor(mut actor: DocumentStoreActor) {
    while let Some(msg) = actor.receiver.recv().await {
        actor.handle_message(msg).await;
    }
    // Every handle is gone.
    actor.close();
}
