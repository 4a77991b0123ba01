use std::sync::Arc;

use crate::config::Config;
use crate::db::store::{MissionStore, RequestStore};
use crate::workflow::missions::MissionDirectory;
use crate::workflow::pools::BoardCache;
use crate::workflow::service::RequestService;
use crate::workflow::transitions::WorkflowPolicy;

/// Everything a handler needs, handed to axum as router state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub requests: RequestService,
    pub missions: MissionDirectory,
}

impl AppState {
    pub fn new(
        config: Config,
        request_store: Arc<dyn RequestStore>,
        mission_store: Arc<dyn MissionStore>,
    ) -> Self {
        let missions = MissionDirectory::new(mission_store, config.mission_cache_ttl);
        let requests = RequestService::new(
            request_store,
            missions.clone(),
            BoardCache::new(config.board_cache_ttl),
            WorkflowPolicy {
                enforce_unclaim_ownership: config.enforce_unclaim_ownership,
            },
        );
        Self {
            config: Arc::new(config),
            requests,
            missions,
        }
    }
}
