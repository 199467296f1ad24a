//! # Worker Pool
//!
//! Runs the concurrent destination leg of read and update calls. The pool is created
//! once per facade and reused by every call: `pool_size` long-lived tasks pull jobs
//! from one bounded `mpsc` channel, and each job answers its submitter on a `oneshot`
//! channel, exactly like a request sent to an actor.
//!
//! ```text
//!  submit() ──► [ job channel (queue_depth) ] ──► worker 0..pool_size
//!     │                                               │
//!     └──────── PendingCall ◄──── oneshot ◄───────────┘
//! ```
//!
//! A job that panics takes only its own response channel down; the worker survives and
//! the submitter sees [`BackendError::WorkerLost`].

use crate::config::FacadeConfig;
use crate::error::{BackendError, FacadeError, StoreSide};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Job = BoxFuture<'static, ()>;

/// Fixed-size set of reusable workers.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `config.pool_size` workers on the current tokio runtime.
    pub fn start(config: &FacadeConfig) -> Result<Self, FacadeError> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel::<Job>(config.queue_depth);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..config.pool_size)
            .map(|worker| tokio::spawn(run_worker(worker, receiver.clone())))
            .collect();

        info!(
            pool_size = config.pool_size,
            queue_depth = config.queue_depth,
            "Worker pool started"
        );
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size: config.pool_size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.lock_sender().is_none()
    }

    /// Queues `call` for a worker. Waits while the job channel is full.
    pub async fn submit<T, F>(
        &self,
        side: StoreSide,
        operation: &str,
        call: F,
    ) -> Result<PendingCall<T>, BackendError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let sender = self.lock_sender().clone().ok_or(BackendError::PoolClosed)?;
        let (respond_to, response) = oneshot::channel();
        let job = async move {
            let _ = respond_to.send(call.await);
        }
        .boxed();

        sender.send(job).await.map_err(|_| BackendError::PoolClosed)?;
        Ok(PendingCall {
            response,
            side,
            operation: operation.to_string(),
        })
    }

    /// Closes the job channel and waits for the workers to drain it.
    pub async fn shutdown(&self) {
        self.lock_sender().take();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for worker in workers {
            let _ = worker.await;
        }
        info!("Worker pool stopped");
    }

    fn lock_sender(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Job>>> {
        self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_worker(worker: usize, jobs: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else { break };
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            warn!(worker, "Job panicked; worker continues");
        }
    }
    debug!(worker, "Worker exiting");
}

/// The pending result of a job submitted to the [`WorkerPool`].
#[derive(Debug)]
pub struct PendingCall<T> {
    response: oneshot::Receiver<T>,
    side: StoreSide,
    operation: String,
}

impl<T> PendingCall<T> {
    /// Waits for the job's result, at most `timeout` when one is given.
    pub async fn join(self, timeout: Option<Duration>) -> Result<T, BackendError> {
        let Self {
            response,
            side,
            operation,
        } = self;

        match timeout {
            Some(after) => match tokio::time::timeout(after, response).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(_)) => Err(BackendError::WorkerLost { operation }),
                Err(_) => Err(BackendError::Timeout {
                    side,
                    operation,
                    after,
                }),
            },
            None => response
                .await
                .map_err(|_| BackendError::WorkerLost { operation }),
        }
    }
}
