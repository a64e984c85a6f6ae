use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use common::command::CommandProcessor;
use common::config::Settings;
use common::db::repositories::RotationStore;
use common::signature::RequestAuthenticator;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RotationStore>,
    pub processor: CommandProcessor,
    /// `None` only when verification is explicitly skipped in development
    pub authenticator: Option<Arc<RequestAuthenticator>>,
    pub config: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RotationStore>,
        config: Settings,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let authenticator = if config.skip_signature_verification() {
            tracing::warn!("Signature verification disabled for development");
            None
        } else {
            Some(Arc::new(RequestAuthenticator::new(
                config.slack.signing_secret.clone(),
            )))
        };

        Self {
            processor: CommandProcessor::new(Arc::clone(&store))
                .with_timeout(Duration::from_millis(config.server.command_timeout_ms)),
            store,
            authenticator,
            config: Arc::new(config),
            metrics_handle,
        }
    }
}
