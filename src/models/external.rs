//! Actual-state mirrors of external monitoring objects, using the external
//! system's native string encodings.

use serde::{Deserialize, Serialize};

/// The external identity of a monitoring object. Services are keyed by host
/// plus name; groups by name alone, with an empty host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Host component of the identity. Empty for service groups.
    #[serde(default)]
    pub host: String,
    /// Name component of the identity.
    pub name: String,
}

/// A macro as reported by the external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMacro {
    /// Macro name.
    pub name: String,
    /// Macro value.
    pub value: String,
    /// Whether the external system treats the value as secret.
    #[serde(default)]
    pub is_password: bool,
}

/// A monitoring service as reported by the external system.
///
/// Booleans are encoded as `"1"`, `"0"` or `"default"`; the check command
/// carries its arguments inline as `command!arg1!arg2`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalService {
    /// Host the service is attached to.
    pub host: String,
    /// Service name.
    pub name: String,
    /// Check command including `!`-joined arguments.
    #[serde(default)]
    pub check_command: String,
    /// Interval between regular checks.
    #[serde(default)]
    pub normal_check_interval: String,
    /// Interval between retries after a failed check.
    #[serde(default)]
    pub retry_check_interval: String,
    /// Number of check attempts before a hard failure.
    #[serde(default)]
    pub max_check_attempts: String,
    /// Whether active checks are enabled, as "1"/"0"/"default".
    #[serde(default)]
    pub active_checks_enabled: String,
    /// Whether passive checks are accepted, as "1"/"0"/"default".
    #[serde(default)]
    pub passive_checks_enabled: String,
    /// Whether the service is activated, as "1"/"0"/"default".
    #[serde(default)]
    pub activate: String,
    /// Name of the external service template.
    #[serde(default)]
    pub template: String,
    /// Service groups the service belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Service categories the service belongs to.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Macros attached to the service.
    #[serde(default)]
    pub macros: Vec<ExternalMacro>,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
}

/// A monitoring service group as reported by the external system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalServiceGroup {
    /// Group name.
    pub name: String,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
}
