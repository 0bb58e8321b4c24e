use axum::extract::FromRef;

use crate::artifact_store::ArtifactStore;
use crate::generation::GenerationService;
use crate::history::HistoryLedger;
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedGenerationService = Arc<GenerationService>;
pub type GuardedHistoryLedger = Arc<HistoryLedger>;
pub type GuardedArtifactStore = Arc<dyn ArtifactStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub generation_service: GuardedGenerationService,
    pub history: GuardedHistoryLedger,
    pub artifact_store: GuardedArtifactStore,
}

impl ServerState {
    /// History and artifact store are shared with the generation service.
    pub fn new(config: ServerConfig, generation_service: GuardedGenerationService) -> ServerState {
        ServerState {
            config,
            history: generation_service.history().clone(),
            artifact_store: generation_service.artifact_store().clone(),
            generation_service,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedGenerationService {
    fn from_ref(input: &ServerState) -> Self {
        input.generation_service.clone()
    }
}

impl FromRef<ServerState> for GuardedHistoryLedger {
    fn from_ref(input: &ServerState) -> Self {
        input.history.clone()
    }
}

impl FromRef<ServerState> for GuardedArtifactStore {
    fn from_ref(input: &ServerState) -> Self {
        input.artifact_store.clone()
    }
}
