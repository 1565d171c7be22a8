//! Per-resource convergence policy.

use serde::{Deserialize, Serialize};

/// Flags suppressing individual convergence operations and excluding fields
/// from comparison. Owned by the resource author; read-only to the engine.
///
/// A suppressed create or update still computes and reports the diff, and the
/// reconcile pass still succeeds, so policy-suppressed changes do not cause
/// retry storms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Suppress the create step.
    #[serde(default)]
    pub no_create: bool,
    /// Suppress the update step.
    #[serde(default)]
    pub no_update: bool,
    /// Suppress the delete step.
    #[serde(default)]
    pub no_delete: bool,
    /// External field names ignored during comparison. The logical names
    /// `groups`, `categories` and `macros` exclude the respective sets.
    #[serde(default)]
    pub exclude_fields_on_diff: Vec<String>,
}
