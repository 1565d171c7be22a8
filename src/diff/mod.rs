//! The diff engine: field-by-field comparison of an actual external object
//! against a desired one, honoring a field-exclusion list and producing the
//! exact parameter set to apply.
//!
//! Comparison works on normalized encodings (booleans as "1"/"0"/"default",
//! `!`-joined command arguments, membership as sets). The result is
//! deterministic: identical inputs yield byte-identical diffs, including the
//! human-readable summary.
//!
//! Macros present only in the external system are deliberately left
//! untouched; nothing ever removes a macro. Membership sets behave
//! differently: the computed set replaces the external one wholesale, so
//! groups absent from the desired set are dropped on apply.

pub mod encoding;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{DesiredService, DesiredServiceGroup, ExternalService, ExternalServiceGroup};

/// A structured comparison result: whether the object needs to be created or
/// updated, and exactly which parameters to apply. Recomputed every
/// reconcile cycle, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// The object does not exist externally and must be created.
    pub need_create: bool,
    /// The object exists but differs and must be updated.
    pub need_update: bool,
    /// Scalar parameters to set, keyed by the external field name.
    pub params_to_set: BTreeMap<String, String>,
    /// The full new group membership, when it changed.
    pub groups_to_set: Option<Vec<String>>,
    /// The full new category membership, when it changed.
    pub categories_to_set: Option<Vec<String>>,
    /// Macros to set or overwrite.
    pub macros_to_set: BTreeMap<String, String>,
    /// Human-readable per-field differences. Carries no semantic weight for
    /// the apply step.
    pub summary: String,
}

impl Diff {
    /// Whether the diff requires no action at all.
    pub fn is_noop(&self) -> bool {
        !self.need_create && !self.need_update
    }
}

fn excluded(exclude: &[String], field: &str) -> bool {
    exclude.iter().any(|f| f == field)
}

/// Compares one scalar field and records it when it differs.
fn compare_param(
    diff: &mut Diff,
    lines: &mut Vec<String>,
    exclude: &[String],
    field: &str,
    actual: &str,
    expected: &str,
) {
    if excluded(exclude, field) || actual == expected {
        return;
    }
    diff.params_to_set.insert(field.to_string(), expected.to_string());
    lines.push(format!("{field}: '{actual}' -> '{expected}'"));
}

/// Compares a membership set; when it differs the full sorted desired set
/// becomes the new membership.
fn compare_membership(
    lines: &mut Vec<String>,
    exclude: &[String],
    field: &str,
    actual: &[String],
    desired: &[String],
) -> Option<Vec<String>> {
    if excluded(exclude, field) {
        return None;
    }
    let mut actual_set: Vec<&str> = actual.iter().map(String::as_str).collect();
    let mut desired_set: Vec<&str> = desired.iter().map(String::as_str).collect();
    actual_set.sort_unstable();
    actual_set.dedup();
    desired_set.sort_unstable();
    desired_set.dedup();
    if actual_set == desired_set {
        return None;
    }
    lines.push(format!(
        "{field}: [{}] -> [{}]",
        actual_set.join(", "),
        desired_set.join(", ")
    ));
    Some(desired_set.into_iter().map(str::to_string).collect())
}

/// Computes the diff between an actual external service (or `None` if it
/// does not exist) and the desired service.
///
/// Numeric fields left at `None` in the desired service and an empty desired
/// check command or template are treated as unmanaged and never compared.
pub fn diff_service(
    actual: Option<&ExternalService>,
    expected: &DesiredService,
    exclude: &[String],
) -> Diff {
    let mut diff = Diff::default();

    let Some(actual) = actual else {
        diff.need_create = true;
        diff.summary = format!("service {}/{} does not exist", expected.host, expected.name);
        return diff;
    };

    let mut lines = Vec::new();

    if !expected.check_command.is_empty() {
        compare_param(
            &mut diff,
            &mut lines,
            exclude,
            "check_command",
            &actual.check_command,
            &encoding::join_args(&expected.check_command, &expected.args),
        );
    }
    if let Some(interval) = expected.check_interval {
        compare_param(
            &mut diff,
            &mut lines,
            exclude,
            "normal_check_interval",
            &actual.normal_check_interval,
            &interval.to_string(),
        );
    }
    if let Some(interval) = expected.retry_interval {
        compare_param(
            &mut diff,
            &mut lines,
            exclude,
            "retry_check_interval",
            &actual.retry_check_interval,
            &interval.to_string(),
        );
    }
    if let Some(attempts) = expected.max_check_attempts {
        compare_param(
            &mut diff,
            &mut lines,
            exclude,
            "max_check_attempts",
            &actual.max_check_attempts,
            &attempts.to_string(),
        );
    }
    compare_param(
        &mut diff,
        &mut lines,
        exclude,
        "active_checks_enabled",
        &actual.active_checks_enabled,
        encoding::bool_str(expected.active_checks_enabled),
    );
    compare_param(
        &mut diff,
        &mut lines,
        exclude,
        "passive_checks_enabled",
        &actual.passive_checks_enabled,
        encoding::bool_str(expected.passive_checks_enabled),
    );
    compare_param(
        &mut diff,
        &mut lines,
        exclude,
        "activate",
        &actual.activate,
        encoding::bool_str(expected.activated),
    );
    if !expected.template.is_empty() {
        compare_param(
            &mut diff,
            &mut lines,
            exclude,
            "template",
            &actual.template,
            &expected.template,
        );
    }

    diff.groups_to_set =
        compare_membership(&mut lines, exclude, "groups", &actual.groups, &expected.groups);
    diff.categories_to_set = compare_membership(
        &mut lines,
        exclude,
        "categories",
        &actual.categories,
        &expected.categories,
    );

    if !excluded(exclude, "macros") {
        for (name, value) in &expected.macros {
            let current = actual.macros.iter().find(|m| &m.name == name);
            match current {
                Some(m) if &m.value == value => {}
                _ => {
                    let old = current.map(|m| m.value.as_str()).unwrap_or_default();
                    lines.push(format!("macro {name}: '{old}' -> '{value}'"));
                    diff.macros_to_set.insert(name.clone(), value.clone());
                }
            }
        }
    }

    diff.need_update = !diff.params_to_set.is_empty()
        || diff.groups_to_set.is_some()
        || diff.categories_to_set.is_some()
        || !diff.macros_to_set.is_empty();
    diff.summary = lines.join("; ");
    diff
}

/// Computes the diff between an actual external service group (or `None`)
/// and the desired group.
pub fn diff_service_group(
    actual: Option<&ExternalServiceGroup>,
    expected: &DesiredServiceGroup,
    exclude: &[String],
) -> Diff {
    let mut diff = Diff::default();

    let Some(actual) = actual else {
        diff.need_create = true;
        diff.summary = format!("service group {} does not exist", expected.name);
        return diff;
    };

    let mut lines = Vec::new();
    compare_param(&mut diff, &mut lines, exclude, "comment", &actual.comment, &expected.comment);

    diff.need_update = !diff.params_to_set.is_empty();
    diff.summary = lines.join("; ");
    diff
}
