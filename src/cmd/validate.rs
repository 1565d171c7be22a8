//! The `validate` subcommand: checks template documents for syntax errors
//! without rendering them, so template authors can catch mistakes before a
//! broken template fails reconcile cycles.

use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::{models::Template, templating::TemplateService};

/// Errors surfaced by the `validate` subcommand.
#[derive(Debug, Error)]
pub enum Error {
    /// A file or directory could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A template document failed to parse.
    #[error("failed to parse template document '{path}': {source}")]
    Parse {
        /// The offending file.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// One or more template bodies failed validation.
    #[error("{0} template document(s) failed validation")]
    Invalid(usize),
}

/// Arguments for the `validate` subcommand.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to a template document, or a directory of `.yaml`/`.yml`
    /// template documents.
    #[arg(short, long)]
    path: PathBuf,
}

/// Validates every template document under the given path.
pub fn execute(args: ValidateArgs) -> Result<(), Error> {
    let files = collect_files(&args.path)?;
    let service = TemplateService::new();
    let mut failures = 0;

    for file in &files {
        let raw = std::fs::read_to_string(file)?;
        let template: Template = serde_yaml::from_str(&raw).map_err(|source| Error::Parse {
            path: file.display().to_string(),
            source,
        })?;
        match service.check(&template.body) {
            Ok(()) => {
                println!("{}: OK ({})", file.display(), template.meta.name);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", file.display(), e);
            }
        }
    }

    if failures > 0 {
        return Err(Error::Invalid(failures));
    }
    tracing::info!(count = files.len(), "All template documents validated.");
    Ok(())
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>, Error> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
