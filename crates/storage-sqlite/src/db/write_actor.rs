//! Single-writer actor for SQLite.
//!
//! SQLite allows one writer at a time; funnelling every write job through
//! one actor with a dedicated connection keeps writers from contending and
//! gives each job an `immediate_transaction` around its whole
//! load-modify-commit sequence.

use std::any::Any;

use diesel::result::Error as DieselError;
use diesel::{Connection, SqliteConnection};
use log::error;
use tokio::sync::{mpsc, oneshot};

use shopkeeper_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

// A job takes the writer's connection and returns a core Result; the
// Box<dyn Any> is type erasure for the job's return value.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

/// Error wrapper used inside the writer's transaction.
///
/// Typed domain rejections (Forbidden, ListingClosed, NotFound, ...) must
/// roll the transaction back and still reach the caller unchanged, so they
/// are carried next to Diesel's own errors instead of being stringified.
enum TxError {
    Domain(Error),
    Diesel(DieselError),
}

impl From<DieselError> for TxError {
    fn from(err: DieselError) -> Self {
        TxError::Diesel(err)
    }
}

impl From<TxError> for Error {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Domain(e) => e,
            TxError::Diesel(e) => StorageError::QueryFailed(e).into(),
        }
    }
}

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>,
}

impl WriteHandle {
    /// Runs a job on the writer's dedicated connection, inside one
    /// immediate transaction.
    ///
    /// Returning `Err` from the job rolls the transaction back and the
    /// error reaches the caller as-is.
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
            .map_err(|_| {
                Error::Database(DatabaseError::TransactionFailed(
                    "writer actor stopped".to_string(),
                ))
            })?;

        let result = ret_rx.await.map_err(|_| {
            Error::Database(DatabaseError::TransactionFailed(
                "writer actor dropped the reply".to_string(),
            ))
        })?;

        result.map(|boxed: Box<dyn Any + Send + 'static>| {
            *boxed
                .downcast::<T>()
                .unwrap_or_else(|_| panic!("writer job returned an unexpected type"))
        })
    }
}

/// Spawns the writer actor: a background task owning one connection,
/// processing write jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    // Bounded queue; 1024 is an arbitrary size.
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("writer actor could not acquire a connection: {}", e);
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, TxError, _>(|c| job(c).map_err(TxError::Domain))
                .map_err(Error::from);

            // Ignore error if the requester has gone away.
            let _ = reply_tx.send(result);
        }
        // rx.recv() returned None: every WriteHandle was dropped, the actor
        // can terminate.
    });

    WriteHandle { tx }
}
