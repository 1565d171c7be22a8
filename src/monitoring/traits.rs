//! Trait definitions for the external monitoring system client. Services are
//! keyed by host plus name, service groups by name alone.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{
    diff::Diff,
    models::{
        Credentials, DesiredService, DesiredServiceGroup, ExternalService, ExternalServiceGroup,
        PlatformSpec,
    },
};

/// Errors surfaced by the monitoring client. The engine makes no
/// retryable/permanent distinction; every failure gets the same
/// fixed-backoff treatment.
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The external API rejected the request.
    #[error("monitoring API error: {0}")]
    Api(String),

    /// The external system could not be reached.
    #[error("monitoring transport error: {0}")]
    Transport(String),
}

/// The monitoring system client contract. `Get` calls return `None` when the
/// object does not exist; update calls apply exactly the parameter set
/// carried by a [`Diff`].
///
/// The diff computations are default-implemented on top of the crate's diff
/// engine so the collaborator contract keeps its full shape.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    /// Fetches a service, or `None` if it does not exist.
    async fn get_service(
        &self,
        host: &str,
        name: &str,
    ) -> Result<Option<ExternalService>, MonitoringError>;

    /// Creates a service from its desired state.
    async fn create_service(&self, desired: &DesiredService) -> Result<(), MonitoringError>;

    /// Applies a computed diff to an existing service.
    async fn update_service(
        &self,
        host: &str,
        name: &str,
        diff: &Diff,
    ) -> Result<(), MonitoringError>;

    /// Deletes a service.
    async fn delete_service(&self, host: &str, name: &str) -> Result<(), MonitoringError>;

    /// Fetches a service group, or `None` if it does not exist.
    async fn get_service_group(
        &self,
        name: &str,
    ) -> Result<Option<ExternalServiceGroup>, MonitoringError>;

    /// Creates a service group from its desired state.
    async fn create_service_group(
        &self,
        desired: &DesiredServiceGroup,
    ) -> Result<(), MonitoringError>;

    /// Applies a computed diff to an existing service group.
    async fn update_service_group(&self, name: &str, diff: &Diff) -> Result<(), MonitoringError>;

    /// Deletes a service group.
    async fn delete_service_group(&self, name: &str) -> Result<(), MonitoringError>;

    /// Computes the service diff. See [`crate::diff::diff_service`].
    fn diff_service<'a>(
        &self,
        actual: Option<&'a ExternalService>,
        expected: &DesiredService,
        exclude: &[String],
    ) -> Diff {
        crate::diff::diff_service(actual, expected, exclude)
    }

    /// Computes the service group diff. See
    /// [`crate::diff::diff_service_group`].
    fn diff_service_group<'a>(
        &self,
        actual: Option<&'a ExternalServiceGroup>,
        expected: &DesiredServiceGroup,
        exclude: &[String],
    ) -> Diff {
        crate::diff::diff_service_group(actual, expected, exclude)
    }
}

/// Constructs monitoring client handles from a platform specification and
/// resolved credentials. Injected into the platform registry so tests can
/// substitute mock clients.
#[cfg_attr(test, automock)]
pub trait ClientFactory: Send + Sync {
    /// Builds a client handle for the given platform.
    fn connect(
        &self,
        spec: &PlatformSpec,
        credentials: &Credentials,
    ) -> Result<Arc<dyn MonitoringClient>, MonitoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{mirror_external, FakeMonitoringClient, ServiceBuilder};

    #[tokio::test]
    async fn test_mock_client_builds_and_resolves_expectations() {
        let mut client = MockMonitoringClient::new();
        client.expect_get_service().returning(|_, _| Ok(None));

        let found = client.get_service("central", "ping").await.unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_default_diff_methods_delegate_to_diff_engine() {
        let client = FakeMonitoringClient::default();
        let desired = ServiceBuilder::new().host("central").name("ping").build();

        let diff = client.diff_service(None, &desired, &[]);
        assert!(diff.need_create);

        let actual = mirror_external(&desired);
        assert!(client.diff_service(Some(&actual), &desired, &[]).is_noop());
    }
}
