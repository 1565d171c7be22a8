//! The external monitoring system client contract.

pub mod traits;

pub use traits::{ClientFactory, MonitoringClient, MonitoringError};

#[cfg(test)]
pub use traits::{MockClientFactory, MockMonitoringClient};
