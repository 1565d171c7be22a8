//! A set of helpers for testing: builders for model instances and in-memory
//! fakes for the store, secret and monitoring client contracts.

mod builders;
mod client;
mod store;

pub use builders::{mirror_external, ExternalServiceBuilder, ObjectBuilder, ServiceBuilder};
pub use client::{FakeMonitoringClient, StaticClientFactory};
pub use store::{InMemorySecrets, InMemoryStore, RecordedEvent, RecordingEvents};
