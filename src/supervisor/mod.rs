//! The supervisor manages the lifecycle of the convergence engine.
//!
//! It owns the reconcile request queue and a pool of worker tasks draining
//! it, listens for shutdown signals (Ctrl+C or SIGTERM), and orchestrates a
//! graceful shutdown of all supervised tasks. Failed reconciles are requeued
//! after a fixed backoff; in-flight passes are allowed to finish within the
//! configured shutdown timeout.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{
    signal,
    sync::{mpsc, Mutex},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    reconciler::{Reconciler, ReconcileRequest},
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A resource store was not provided to the `SupervisorBuilder`.
    #[error("Missing resource store for Supervisor")]
    MissingStore,

    /// A platform registry was not provided to the `SupervisorBuilder`.
    #[error("Missing platform registry for Supervisor")]
    MissingRegistry,

    /// An event recorder was not provided to the `SupervisorBuilder`.
    #[error("Missing event recorder for Supervisor")]
    MissingEventRecorder,

    /// The reconcile request queue was closed unexpectedly.
    #[error("Reconcile request queue closed")]
    QueueClosed,
}

/// A cloneable handle for enqueueing reconcile requests, handed to whatever
/// watches the resource store for changes.
#[derive(Clone)]
pub struct SupervisorHandle {
    requests: mpsc::Sender<ReconcileRequest>,
}

impl SupervisorHandle {
    /// Enqueues a reconcile request. Returns an error when the supervisor
    /// has shut down.
    pub async fn enqueue(&self, request: ReconcileRequest) -> Result<(), SupervisorError> {
        self.requests.send(request).await.map_err(|_| SupervisorError::QueueClosed)
    }
}

/// The primary runtime manager for the convergence engine.
///
/// The supervisor owns the worker pool and the request queue and is
/// responsible for startup, shutdown and requeueing. Once `run` is called it
/// becomes the main process loop.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The reconciler executed by every worker.
    reconciler: Arc<Reconciler>,

    /// Sending side of the reconcile request queue.
    requests_tx: mpsc::Sender<ReconcileRequest>,

    /// Receiving side of the reconcile request queue, shared by the workers.
    requests_rx: Arc<Mutex<mpsc::Receiver<ReconcileRequest>>>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<()>,
}

impl Supervisor {
    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub(crate) fn new(config: AppConfig, reconciler: Arc<Reconciler>) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(config.queue_capacity);
        Self {
            config: Arc::new(config),
            reconciler,
            requests_tx,
            requests_rx: Arc::new(Mutex::new(requests_rx)),
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Returns a handle for enqueueing reconcile requests.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle { requests: self.requests_tx.clone() }
    }

    /// Starts the supervisor and all its managed tasks.
    ///
    /// Spawns a signal handler for `SIGINT` and `SIGTERM`, then the
    /// configured number of reconcile workers, and supervises them until
    /// shutdown is requested or every task has completed.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
            }

            cancellation_token.cancel();
        });

        // Spawn the reconcile worker pool.
        for worker in 0..self.config.workers {
            let reconciler = Arc::clone(&self.reconciler);
            let requests_rx = Arc::clone(&self.requests_rx);
            let requests_tx = self.requests_tx.clone();
            let token = self.cancellation_token.clone();
            let requeue_interval = self.config.requeue_interval;

            self.join_set.spawn(async move {
                tracing::debug!(worker, "Reconcile worker started.");
                loop {
                    let request = tokio::select! {
                        _ = token.cancelled() => break,
                        request = async { requests_rx.lock().await.recv().await } => request,
                    };
                    let Some(request) = request else {
                        break;
                    };

                    if reconciler.reconcile(&request).await.is_err() {
                        // The reconciler has already recorded the failure;
                        // requeue after the fixed backoff.
                        let requests_tx = requests_tx.clone();
                        let token = token.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = token.cancelled() => {}
                                _ = tokio::time::sleep(requeue_interval) => {
                                    if requests_tx.send(request).await.is_err() {
                                        tracing::debug!("Request queue closed, dropping requeue.");
                                    }
                                }
                            }
                        });
                    }
                }
                tracing::debug!(worker, "Reconcile worker stopped.");
            });
        }

        // Main supervisor loop: monitor task health and the shutdown signal.
        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        // Graceful shutdown: let in-flight work drain within the timeout.
        let shutdown_timeout = self.config.shutdown_timeout;
        let drain = async {
            while self.join_set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!(
                "Supervised tasks did not complete within {:?}. Aborting remaining tasks.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
