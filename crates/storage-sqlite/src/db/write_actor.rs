use super::{DbConnection, DbPool};
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, error};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};
use nivesh_core::errors::{DatabaseError, Error, Result};

// A job runs against the writer's connection and returns a core Result.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

fn writer_stopped() -> Error {
    Error::Database(DatabaseError::Internal(
        "database writer is not running".to_string(),
    ))
}

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, Reply)>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection,
    /// inside one immediate transaction.
    ///
    /// Jobs run strictly in submission order. The returned future resolves
    /// only after the transaction has committed (or rolled back).
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_stopped())?;

        let boxed = ret_rx.await.map_err(|_| writer_stopped())??;
        boxed.downcast::<T>().map(|value| *value).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer returned an unexpected result type".to_string(),
            ))
        })
    }

    /// Resolves once every job submitted before this call has finished.
    pub async fn flush(&self) -> Result<()> {
        self.exec(|_| Ok(())).await
    }
}

/// Spawns a background Tokio task that acts as the single writer to the
/// database. It holds one pooled connection and processes jobs serially.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn: Option<DbConnection> = None;

        while let Some((job, reply_tx)) = rx.recv().await {
            if conn.is_none() {
                match pool.get() {
                    Ok(acquired) => conn = Some(acquired),
                    Err(e) => {
                        error!("Writer could not acquire a database connection: {}", e);
                        let _ = reply_tx.send(Err(StorageError::from(e).into()));
                        continue;
                    }
                }
            }
            let Some(c) = conn.as_mut() else {
                continue;
            };

            let result: Result<Box<dyn Any + Send + 'static>> = c
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            // The requester may have gone away; the write stands regardless.
            let _ = reply_tx.send(result);
        }
        debug!("Database writer stopped");
    });

    WriteHandle { tx }
}
