use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use crate::{
    request_executor::RequestExecutor, run_document_store_actor, DocumentSession,
    DocumentStoreActor, DocumentStoreBuilder, DocumentStoreError,
    DocumentStoreInitialConfiguration, DocumentStoreMessage,
};

/**
This a handle to the actor.

Only one DocumentStoreActor should exist per database cluster when possible to reduce resource
usage. Cloning this handle is very cheap and will not instantiate a new actor in the background.
It is recommended to clone this handle to each component that needs to talk to the DocumentStoreActor.
When the last handle goes out of scope and it dropped, the backing actor will also be dropped.

```rust,no_run
# tokio_test::block_on(async {
use ravendb_client::DocumentStore;

let document_store = DocumentStore::builder()
    .set_urls(&["http://localhost:8080"])
    .set_database_name("Northwind")
    .build()
    .unwrap();
let session = document_store.open_session().await;
assert!(session.is_ok());
document_store.close().await.unwrap();
# })
```
*/
#[derive(Clone, Debug)]
pub struct DocumentStore {
    sender: mpsc::Sender<DocumentStoreMessage>,
}

impl DocumentStore {
    pub fn builder() -> DocumentStoreBuilder {
        DocumentStoreBuilder::default()
    }

    // This is pub(crate) so only the builder can crank it out
    pub(crate) fn new(initial_config: DocumentStoreInitialConfiguration) -> Self {
        let (sender, receiver) = mpsc::channel(8);
        let actor = DocumentStoreActor::new(receiver, initial_config);
        tokio::spawn(run_document_store_actor(actor));

        Self { sender }
    }

    /// Returns the [`RequestExecutor`] for `database`, or for the store's default database when
    /// `None`. Executors are created once per database and shared afterwards.
    #[instrument(
        level = "debug",
        name = "Actor Handle - Get Request Executor",
        skip(self)
    )]
    pub async fn get_request_executor(
        &self,
        database: Option<&str>,
    ) -> Result<RequestExecutor, DocumentStoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(DocumentStoreMessage::GetRequestExecutor {
            database_name: database.map(str::to_string),
            respond_to: tx,
        })
        .await?;
        rx.await.context("DocumentStoreActor task has been killed")?
    }

    /// The database sessions use when none is given.
    pub async fn database(&self) -> Result<Option<String>, DocumentStoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(DocumentStoreMessage::GetDatabase { respond_to: tx })
            .await?;
        Ok(rx.await.context("DocumentStoreActor task has been killed")?)
    }

    /// Opens a unit of work against the store's default database.
    pub async fn open_session(&self) -> Result<DocumentSession, DocumentStoreError> {
        let executor = self.get_request_executor(None).await?;
        Ok(DocumentSession::new(executor))
    }

    pub async fn open_session_for_database(
        &self,
        database: &str,
    ) -> Result<DocumentSession, DocumentStoreError> {
        let executor = self.get_request_executor(Some(database)).await?;
        Ok(DocumentSession::new(executor))
    }

    /// Closes every request executor the store created.
    #[instrument(level = "debug", name = "Actor Handle - Close", skip(self))]
    pub async fn close(&self) -> Result<(), DocumentStoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(DocumentStoreMessage::Close { respond_to: tx })
            .await?;
        Ok(rx.await.context("DocumentStoreActor task has been killed")?)
    }

    async fn send(&self, message: DocumentStoreMessage) -> Result<(), DocumentStoreError> {
        tracing::trace!("Sending message to actor");
        self.sender
            .send(message)
            .await
            .map_err(|_| anyhow::anyhow!("DocumentStoreActor task has been killed"))?;
        Ok(())
    }
}
