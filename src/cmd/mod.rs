//! Operator-facing subcommands.

pub mod diff;
pub mod validate;

pub use diff::DiffArgs;
pub use validate::ValidateArgs;
