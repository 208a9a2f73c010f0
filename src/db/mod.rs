use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use models::{SecurityEvent, SecurityEventKind};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Close,
}

/// Joins the store thread when the last `Database` clone goes away.
struct StoreThread {
    requests: mpsc::Sender<Request>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreThread {
    fn drop(&mut self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };

        if self.requests.send(Request::Close).is_err() {
            log_error!("audit store thread already gone at shutdown");
        }
        if handle.join().is_err() {
            log_error!("audit store thread panicked");
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open audit store {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        log_error!("WAL mode unavailable, continuing with default journal: {err}");
    }
    migrations::run_migrations(&mut conn).context("failed to migrate audit store")?;
    Ok(conn)
}

fn serve(mut conn: Connection, requests: mpsc::Receiver<Request>) {
    for request in requests {
        match request {
            Request::Run(job) => job(&mut conn),
            Request::Close => break,
        }
    }
    log_info!("audit store closed");
}

/// Security-event log. The SQLite connection is owned by a dedicated thread;
/// async callers hand it closures and await the reply.
#[derive(Clone)]
pub struct Database {
    thread: Arc<StoreThread>,
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let thread_path = path.clone();

        let handle = thread::Builder::new()
            .name("gesturelock-db".into())
            .spawn(move || match open_connection(&thread_path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, request_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn audit store thread")?;

        ready_rx
            .recv()
            .context("audit store thread exited during startup")??;

        log_info!("audit store ready at {}", path.display());

        Ok(Self {
            thread: Arc::new(StoreThread {
                requests: request_tx,
                handle: Mutex::new(Some(handle)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Runs `job` on the store thread and returns its result.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let request = Request::Run(Box::new(move |conn| {
            // The caller may have given up waiting; nothing to do then.
            let _ = reply_tx.send(job(conn));
        }));

        self.thread
            .requests
            .send(request)
            .map_err(|_| anyhow!("audit store thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("audit store thread dropped the request"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_jobs_on_the_store_thread() {
        let path = std::env::temp_dir()
            .join(format!("gesturelock-db-{}", uuid::Uuid::new_v4()))
            .join("audit.sqlite3");
        let db = Database::new(path.clone()).unwrap();
        assert_eq!(db.path(), path.as_path());

        let name = db
            .execute(|_| Ok(thread::current().name().map(str::to_string)))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("gesturelock-db"));

        let err = db
            .execute(|conn| {
                conn.execute_batch("SELECT * FROM missing_table")
                    .context("query failed")
            })
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("query failed"));

        drop(db);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
