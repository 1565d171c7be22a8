//! Normalization helpers for the external system's native string encodings.

/// Encodes a three-way boolean the way the external system stores it:
/// `None` ⇒ `"default"` (inherit from the external template), `Some(true)` ⇒
/// `"1"`, `Some(false)` ⇒ `"0"`. This is the single encoding convention used
/// everywhere.
pub fn bool_str(value: Option<bool>) -> &'static str {
    match value {
        None => "default",
        Some(true) => "1",
        Some(false) => "0",
    }
}

/// Joins a check command and its arguments into the external `cmd!a!b` form.
pub fn join_args(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }
    let mut out = String::from(command);
    for arg in args {
        out.push('!');
        out.push_str(arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_str_convention() {
        assert_eq!(bool_str(None), "default");
        assert_eq!(bool_str(Some(true)), "1");
        assert_eq!(bool_str(Some(false)), "0");
    }

    #[test]
    fn test_join_args() {
        assert_eq!(join_args("check_ping", &[]), "check_ping");
        assert_eq!(
            join_args("check_ping", &["100".to_string(), "500".to_string()]),
            "check_ping!100!500"
        );
    }
}
