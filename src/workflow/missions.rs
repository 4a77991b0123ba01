use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::mission::{Mission, NewMission};
use crate::db::store::MissionStore;
use crate::error::WorkflowError;
use crate::middleware::auth::Actor;

pub const NO_MISSION: &str = "No mission";

/// Display name for a mission id that has no row behind it.
pub fn fallback_mission_name(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("Mission {}", &simple[..8])
}

/// Mission CRUD plus a cached id -> name resolver used when rendering requests.
#[derive(Clone)]
pub struct MissionDirectory {
    store: Arc<dyn MissionStore>,
    names: Cache<Uuid, String>,
}

impl MissionDirectory {
    pub fn new(store: Arc<dyn MissionStore>, ttl: Duration) -> Self {
        Self {
            store,
            names: Cache::builder().time_to_live(ttl).max_capacity(10_000).build(),
        }
    }

    pub async fn create_mission(
        &self,
        actor: &Actor,
        input: NewMission,
        now: DateTime<Utc>,
    ) -> Result<Mission, WorkflowError> {
        if !actor.can_create_missions() {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "create missions",
            });
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("mission name is required".into()));
        }
        if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
            if end < start {
                return Err(WorkflowError::Validation(
                    "mission end date is before its start date".into(),
                ));
            }
        }

        let mission = Mission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            client: input.client,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            created_by: actor.id,
            created_at: now,
        };
        self.store.insert_mission(&mission).await?;
        self.names.insert(mission.id, mission.name.clone()).await;
        info!(mission = %mission.id, actor = %actor.id, "mission created");
        Ok(mission)
    }

    pub async fn get_mission(&self, id: Uuid) -> Result<Mission, WorkflowError> {
        self.store
            .get_mission(id)
            .await?
            .ok_or_else(|| WorkflowError::mission_not_found(id))
    }

    pub async fn list_missions(&self) -> Result<Vec<Mission>, WorkflowError> {
        Ok(self.store.list_missions().await?)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, WorkflowError> {
        if self.names.contains_key(&id) {
            return Ok(true);
        }
        Ok(self.store.get_mission(id).await?.is_some())
    }

    /// Never fails: lookup errors degrade to the fallback name.
    pub async fn resolve_name(&self, id: Option<Uuid>) -> String {
        let Some(id) = id else {
            return NO_MISSION.to_string();
        };
        if let Some(name) = self.names.get(&id).await {
            return name;
        }
        match self.store.get_mission(id).await {
            Ok(Some(mission)) => {
                self.names.insert(id, mission.name.clone()).await;
                mission.name
            }
            Ok(None) => fallback_mission_name(id),
            Err(e) => {
                warn!(mission = %id, "mission name lookup failed: {e}");
                fallback_mission_name(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::user::Role;
    use chrono::NaiveDate;

    fn directory() -> MissionDirectory {
        MissionDirectory::new(Arc::new(MemoryStore::new()), Duration::from_secs(60))
    }

    fn sdr() -> Actor {
        Actor { id: Uuid::new_v4(), name: "sam".into(), role: Role::Sdr }
    }

    fn new_mission(name: &str) -> NewMission {
        NewMission {
            name: name.into(),
            client: Some("Acme".into()),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 30),
        }
    }

    #[tokio::test]
    async fn resolves_created_mission_names() {
        let missions = directory();
        let mission = missions.create_mission(&sdr(), new_mission("  Spring push "), Utc::now()).await.unwrap();

        assert_eq!(mission.name, "Spring push");
        assert_eq!(missions.resolve_name(Some(mission.id)).await, "Spring push");
        assert_eq!(missions.resolve_name(None).await, NO_MISSION);
        assert!(missions.exists(mission.id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_missions_get_a_short_fallback() {
        let missions = directory();
        let id = Uuid::parse_str("1f2e3d4c-0000-4000-8000-000000000000").unwrap();
        assert_eq!(missions.resolve_name(Some(id)).await, "Mission 1f2e3d4c");
        assert!(!missions.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_inverted_dates_and_growth_authors() {
        let missions = directory();
        let mut input = new_mission("Backwards");
        input.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let err = missions.create_mission(&sdr(), input, Utc::now()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let growth = Actor { id: Uuid::new_v4(), name: "gia".into(), role: Role::Growth };
        let err = missions.create_mission(&growth, new_mission("Nope"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));
    }
}
