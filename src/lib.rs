#![warn(missing_docs)]
//! Vigil is a convergence engine that keeps an external monitoring system in
//! sync with declarative monitoring definitions, whether those definitions are
//! authored directly or generated from templates evaluated against triggering
//! resources such as routes, nodes, namespaces or certificates.

pub mod cmd;
pub mod config;
pub mod diff;
pub mod generator;
pub mod models;
pub mod monitoring;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod supervisor;
pub mod templating;
pub mod test_helpers;
