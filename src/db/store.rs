use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::mission::Mission;
use crate::db::models::requests::{Request, RequestContent, RequestFilter, WorkflowStatus};
use crate::error::StoreError;

/// Expected workflow state of a row. An update only lands when the row still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowGuard {
    pub status: WorkflowStatus,
    pub assigned_to: Option<Uuid>,
}

/// New workflow fields written by a single-row update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowChange {
    pub status: WorkflowStatus,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl WorkflowChange {
    pub fn apply_to(&self, request: &mut Request) {
        request.workflow_status = self.status;
        request.assigned_to = self.assigned_to;
        request.assigned_to_name = self.assigned_to_name.clone();
        request.last_updated = self.last_updated;
    }
}

/// Row-level access to the `requests` relation.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Rows matching every predicate in `filter`, ordered by due date ascending.
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, StoreError>;

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError>;

    /// Returns `None` when the row is gone or no longer matches `guard`.
    async fn update_workflow(
        &self,
        id: Uuid,
        guard: &WorkflowGuard,
        change: &WorkflowChange,
    ) -> Result<Option<Request>, StoreError>;

    /// Returns `None` when the row is gone or already completed or canceled.
    async fn update_content(
        &self,
        id: Uuid,
        content: &RequestContent,
    ) -> Result<Option<Request>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_request(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MissionStore: Send + Sync {
    async fn insert_mission(&self, mission: &Mission) -> Result<(), StoreError>;

    async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError>;

    /// All missions, most recently created first.
    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError>;
}
