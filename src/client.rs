use std::sync::Arc;

use crate::api::PortfolioApi;
use crate::auth::AuthFlow;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::routes::{self, Navigation};
use crate::session::{FileStorage, SessionManager};

/// Everything a front end needs, wired around one shared session.
pub struct PortfolioClient {
    session: Arc<SessionManager>,
    gateway: Arc<Gateway>,
    auth: AuthFlow,
    api: PortfolioApi,
}

impl PortfolioClient {
    pub fn new(config: &ClientConfig, session: SessionManager) -> Result<Self, ClientError> {
        let session = Arc::new(session);
        let gateway = Arc::new(Gateway::new(&config.backend, session.clone())?);

        Ok(Self {
            auth: AuthFlow::new(gateway.clone()),
            api: PortfolioApi::new(gateway.clone()),
            session,
            gateway,
        })
    }

    /// Client whose session lives in the configured session file.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let storage = FileStorage::new(config.storage.session_file.clone());
        Self::new(config, SessionManager::new(storage))
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn api(&self) -> &PortfolioApi {
        &self.api
    }

    /// Route decision for `path` against the current stored session.
    pub fn navigate(&self, path: &str) -> Navigation {
        routes::navigate(path, &self.session.session())
    }
}
