use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::mission::Mission;
use crate::db::models::requests::{Request, RequestContent, RequestFilter};
use crate::db::store::{MissionStore, RequestStore, WorkflowChange, WorkflowGuard};
use crate::error::StoreError;

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    requests: RwLock<HashMap<Uuid, Request>>,
    missions: RwLock<HashMap<Uuid, Mission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let requests = self.requests.read().await;
        let mut rows: Vec<Request> = requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.created_at.cmp(&b.created_at)));
        Ok(rows)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, StoreError> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        self.requests.write().await.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_workflow(
        &self,
        id: Uuid,
        guard: &WorkflowGuard,
        change: &WorkflowChange,
    ) -> Result<Option<Request>, StoreError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.workflow_status != guard.status || request.assigned_to != guard.assigned_to {
            return Ok(None);
        }
        change.apply_to(request);
        Ok(Some(request.clone()))
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &RequestContent,
    ) -> Result<Option<Request>, StoreError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.workflow_status.is_closed() {
            return Ok(None);
        }
        request.title = content.title.clone();
        request.mission_id = content.mission_id;
        request.due_date = content.due_date;
        request.details = content.details.clone();
        request.last_updated = content.last_updated;
        Ok(Some(request.clone()))
    }

    async fn delete_request(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.requests.write().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn insert_mission(&self, mission: &Mission) -> Result<(), StoreError> {
        self.missions.write().await.insert(mission.id, mission.clone());
        Ok(())
    }

    async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError> {
        Ok(self.missions.read().await.get(&id).cloned())
    }

    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let mut missions: Vec<Mission> = self.missions.read().await.values().cloned().collect();
        missions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(missions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::requests::{
        DatabaseDetails, RequestDetails, RequestType, TargetRole, WorkflowStatus,
    };
    use chrono::{Duration, TimeZone, Utc};

    fn request(days: i64) -> Request {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Request {
            id: Uuid::new_v4(),
            request_type: RequestType::Database,
            title: format!("extract {days}"),
            created_by: Uuid::new_v4(),
            mission_id: None,
            workflow_status: WorkflowStatus::PendingAssignment,
            target_role: TargetRole::Growth,
            assigned_to: None,
            assigned_to_name: None,
            created_at: base,
            due_date: base + Duration::days(days),
            last_updated: base,
            details: RequestDetails::Database(DatabaseDetails::default()),
        }
    }

    #[tokio::test]
    async fn lists_by_due_date_ascending() {
        let store = MemoryStore::new();
        for days in [5, 1, 3] {
            store.insert_request(&request(days)).await.unwrap();
        }

        let rows = store.list_requests(&RequestFilter::default()).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["extract 1", "extract 3", "extract 5"]);
    }

    #[tokio::test]
    async fn guarded_update_skips_stale_rows() {
        let store = MemoryStore::new();
        let row = request(1);
        store.insert_request(&row).await.unwrap();
        let actor = Uuid::new_v4();

        let change = WorkflowChange {
            status: WorkflowStatus::InProgress,
            assigned_to: Some(actor),
            assigned_to_name: Some("grace".into()),
            last_updated: Utc::now(),
        };
        let guard = WorkflowGuard { status: WorkflowStatus::PendingAssignment, assigned_to: None };

        let first = store.update_workflow(row.id, &guard, &change).await.unwrap();
        assert_eq!(first.unwrap().assigned_to, Some(actor));

        let second = store.update_workflow(row.id, &guard, &change).await.unwrap();
        assert!(second.is_none());
        assert!(store.update_workflow(Uuid::new_v4(), &guard, &change).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn content_edits_skip_closed_rows() {
        let store = MemoryStore::new();
        let mut row = request(1);
        row.workflow_status = WorkflowStatus::Canceled;
        store.insert_request(&row).await.unwrap();

        let content = RequestContent {
            title: "renamed".into(),
            mission_id: None,
            due_date: row.due_date,
            details: row.details.clone(),
            last_updated: Utc::now(),
        };
        assert!(store.update_content(row.id, &content).await.unwrap().is_none());
        assert_eq!(store.get_request(row.id).await.unwrap().unwrap().title, "extract 1");
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let store = MemoryStore::new();
        let row = request(2);
        store.insert_request(&row).await.unwrap();

        assert!(store.delete_request(row.id).await.unwrap());
        assert!(!store.delete_request(row.id).await.unwrap());
        assert!(store.get_request(row.id).await.unwrap().is_none());
    }
}
