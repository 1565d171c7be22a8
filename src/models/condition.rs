//! Convergence status: per-resource phase, condition and the external
//! identity recorded on first creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::external::ExternalIdentity;

/// The condition type recorded for every managed resource.
pub const CONDITION_CONVERGED: &str = "Converged";

/// The lifecycle phase of a managed resource.
///
/// Legal transitions: `Unknown → Pending`, `Pending → Converged`,
/// `Pending → Failed`, `Failed → Pending` (retry), `Converged → Pending`
/// (re-reconcile after a change), any live phase `→ Deleting` once the store
/// marks the resource for deletion, and `Deleting → Removed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Not yet observed.
    #[default]
    Unknown,
    /// Observed, convergence in progress.
    Pending,
    /// External state matches the desired state.
    Converged,
    /// The last convergence pass failed.
    Failed,
    /// Deletion requested; external cleanup in progress.
    Deleting,
    /// External cleanup finished; the finalizer has been released.
    Removed,
}

impl Phase {
    /// Whether moving from this phase to `next` is a legal transition.
    /// Staying in the same phase is always allowed.
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Unknown, Pending)
                | (Pending, Converged)
                | (Pending, Failed)
                | (Failed, Pending)
                | (Converged, Pending)
                | (Pending, Deleting)
                | (Converged, Deleting)
                | (Failed, Deleting)
                | (Unknown, Deleting)
                | (Deleting, Removed)
        )
    }
}

/// A named condition recording the last-known convergence outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, currently always [`CONDITION_CONVERGED`].
    pub condition_type: String,
    /// Whether the condition holds.
    pub status: bool,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
    /// When the condition last changed.
    pub last_transition: DateTime<Utc>,
}

impl Condition {
    fn new(status: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            condition_type: CONDITION_CONVERGED.to_string(),
            status,
            reason: reason.to_string(),
            message: message.into(),
            last_transition: Utc::now(),
        }
    }

    /// The initial condition set on first sight of a resource.
    pub fn pending() -> Self {
        Self::new(false, "Pending", "convergence has not completed yet")
    }

    /// A successful convergence outcome.
    pub fn converged(message: impl Into<String>) -> Self {
        Self::new(true, "ConvergeSucceeded", message)
    }

    /// A failed convergence outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(false, "ConvergeFailed", message)
    }
}

/// The status block of a managed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: Phase,
    /// Last-known convergence condition.
    #[serde(default)]
    pub condition: Option<Condition>,
    /// External identifiers assigned on first creation. A renamed spec is
    /// reconciled against this identity, not the new desired identity, until
    /// convergence completes.
    #[serde(default)]
    pub external_identity: Option<ExternalIdentity>,
}

impl ObjectStatus {
    /// Moves to `next` if the transition is legal; returns whether the phase
    /// changed. Illegal transitions are ignored and logged.
    pub fn advance(&mut self, next: Phase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "Ignoring illegal phase transition.");
            return false;
        }
        let changed = self.phase != next;
        self.phase = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(Phase::Unknown.can_transition_to(Phase::Pending));
        assert!(Phase::Pending.can_transition_to(Phase::Converged));
        assert!(Phase::Pending.can_transition_to(Phase::Failed));
        assert!(Phase::Failed.can_transition_to(Phase::Pending));
        assert!(Phase::Converged.can_transition_to(Phase::Deleting));
        assert!(Phase::Deleting.can_transition_to(Phase::Removed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Phase::Unknown.can_transition_to(Phase::Converged));
        assert!(!Phase::Converged.can_transition_to(Phase::Failed));
        assert!(!Phase::Removed.can_transition_to(Phase::Pending));
        assert!(!Phase::Deleting.can_transition_to(Phase::Converged));
    }

    #[test]
    fn test_advance_ignores_illegal_transition() {
        let mut status = ObjectStatus::default();
        assert!(!status.advance(Phase::Converged));
        assert_eq!(status.phase, Phase::Unknown);

        assert!(status.advance(Phase::Pending));
        assert!(status.advance(Phase::Converged));
        assert_eq!(status.phase, Phase::Converged);

        // Same-phase transitions are allowed but report no change.
        assert!(!status.advance(Phase::Converged));
    }
}
