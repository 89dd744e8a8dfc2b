use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::VoiceBackend;
use crate::services::session::SessionController;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The per-process swipe session; mutations happen under the write lock
    pub session: Arc<RwLock<SessionController>>,
    pub backend: Arc<dyn VoiceBackend>,
}

impl AppState {
    pub fn new(session: SessionController, backend: Arc<dyn VoiceBackend>) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            backend,
        }
    }
}
