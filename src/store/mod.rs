//! Contracts for the declarative resource store and its companions (secret
//! store, event recorder). The engine owns these trait definitions; real
//! implementations live with the surrounding operator wiring.

pub mod traits;

pub use traits::{EventKind, EventRecorder, ResourceStore, SecretStore, StoreError};

#[cfg(test)]
pub use traits::{MockEventRecorder, MockResourceStore, MockSecretStore};
