//! Error types for the convergence reconciler. Every error carries the
//! phase and resource it occurred in.

use thiserror::Error;

use crate::{
    models::ResourceId, monitoring::MonitoringError, registry::RegistryError, store::StoreError,
    templating::TemplateError,
};

/// The five phases of a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    /// Resolving the platform handle and initializing status.
    Configure,
    /// Fetching actual external state and desired objects.
    Read,
    /// Computing the diff.
    Diff,
    /// Creating, updating or deleting external objects.
    Apply,
    /// Recording the outcome.
    Finalize,
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReconcilePhase::Configure => "configure",
            ReconcilePhase::Read => "read",
            ReconcilePhase::Diff => "diff",
            ReconcilePhase::Apply => "apply",
            ReconcilePhase::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

/// The underlying cause of a reconcile failure.
#[derive(Debug, Error)]
pub enum ReconcileCause {
    /// A configuration problem that will not resolve without external
    /// correction (missing platform, malformed annotation, bad template).
    #[error("{0}")]
    Configuration(String),

    /// The resource store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The external monitoring system failed.
    #[error(transparent)]
    Monitoring(#[from] MonitoringError),

    /// Template evaluation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The platform registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A reconcile failure, wrapped with the phase and resource it occurred in.
#[derive(Debug, Error)]
#[error("{phase} phase failed for {id}: {source}")]
pub struct ReconcileError {
    /// The phase the failure occurred in.
    pub phase: ReconcilePhase,
    /// The resource being reconciled.
    pub id: ResourceId,
    /// The underlying cause.
    #[source]
    pub source: ReconcileCause,
}

impl ReconcileError {
    /// Wraps a cause with its phase and resource context.
    pub fn new(phase: ReconcilePhase, id: &ResourceId, source: impl Into<ReconcileCause>) -> Self {
        Self { phase, id: id.clone(), source: source.into() }
    }
}
