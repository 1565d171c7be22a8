//! The `diff` subcommand: compares a desired object document against an
//! actual external object document and prints the computed diff, without
//! touching any external system.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::{
    diff,
    models::{DesiredObject, ExternalService, ExternalServiceGroup},
};

/// Errors surfaced by the `diff` subcommand.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document failed to parse.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The diff could not be serialized for printing.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arguments for the `diff` subcommand.
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Path to the desired object document (a `kind`-tagged YAML document).
    #[arg(short, long)]
    desired: PathBuf,

    /// Path to the actual external object document. Omit to diff against a
    /// non-existent object.
    #[arg(short, long)]
    actual: Option<PathBuf>,

    /// Field names to exclude from the comparison. Repeatable.
    #[arg(short, long)]
    exclude: Vec<String>,
}

/// Computes and prints the diff between the two documents.
pub fn execute(args: DiffArgs) -> Result<(), Error> {
    let desired: DesiredObject = serde_yaml::from_str(&std::fs::read_to_string(&args.desired)?)?;
    let actual_raw = match &args.actual {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };

    let result = match &desired {
        DesiredObject::Service(desired) => {
            let actual: Option<ExternalService> =
                actual_raw.as_deref().map(serde_yaml::from_str).transpose()?;
            diff::diff_service(actual.as_ref(), desired, &args.exclude)
        }
        DesiredObject::ServiceGroup(desired) => {
            let actual: Option<ExternalServiceGroup> =
                actual_raw.as_deref().map(serde_yaml::from_str).transpose()?;
            diff::diff_service_group(actual.as_ref(), desired, &args.exclude)
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.is_noop() {
        tracing::info!("No differences detected.");
    }
    Ok(())
}
