use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::jobs::{JobError, RemoteJobClient};

/// Shared, read-only state handed to every handler
pub struct AppState {
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<Config>, shutdown: CancellationToken) -> Self {
        AppState { config, shutdown }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancellation token for one request, cancelled when the server shuts down
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub async fn client(&self) -> Result<&'static RemoteJobClient, JobError> {
        RemoteJobClient::shared(&self.config.http).await
    }
}
