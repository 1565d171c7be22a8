//! Custom filters for the template engine: small string and collection
//! helpers available to template authors.

use minijinja::{
    value::{Value, ValueKind},
    Error, ErrorKind,
};

/// Joins a sequence with `!`, the external system's argument separator.
///
/// ```jinja
/// check_command: "check_http!{{ hosts | join_args }}"
/// ```
pub fn join_args(values: Value) -> Result<String, Error> {
    joined(values, "!", "join_args")
}

/// Joins a sequence with commas.
pub fn csv(values: Value) -> Result<String, Error> {
    joined(values, ",", "csv")
}

fn joined(values: Value, separator: &str, filter: &str) -> Result<String, Error> {
    if values.kind() != ValueKind::Seq {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("{filter} filter can only be applied to a sequence."),
        ));
    }
    let mut parts = Vec::new();
    for value in values.try_iter()? {
        parts.push(value.to_string());
    }
    Ok(parts.join(separator))
}

/// Removes a prefix from a string, if present.
pub fn trim_prefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).map(str::to_string).unwrap_or(value)
}

/// Removes a suffix from a string, if present.
pub fn trim_suffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).map(str::to_string).unwrap_or(value)
}
