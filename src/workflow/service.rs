use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::requests::{
    CloneRequestInput, NewRequest, Request, RequestContent, RequestFilter, RequestView,
    TargetRole, UpdateRequestContent, WorkflowStatus,
};
use crate::db::store::RequestStore;
use crate::error::{StoreError, WorkflowError};
use crate::middleware::auth::Actor;
use crate::workflow::lateness::is_late;
use crate::workflow::missions::MissionDirectory;
use crate::workflow::pools::{my_assignments_filter, report_invariant_violations, to_assign_filter, BoardCache};
use crate::workflow::transitions::{plan, WorkflowPolicy};

#[derive(Debug, Serialize, ToSchema)]
pub struct BoardView {
    pub all: Vec<RequestView>,
    pub to_assign: Vec<RequestView>,
    pub mine: Vec<RequestView>,
}

/// Request operations shared by every HTTP handler.
#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn RequestStore>,
    missions: MissionDirectory,
    board: BoardCache,
    policy: WorkflowPolicy,
}

impl RequestService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        missions: MissionDirectory,
        board: BoardCache,
        policy: WorkflowPolicy,
    ) -> Self {
        Self { store, missions, board, policy }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn render(&self, request: Request, now: DateTime<Utc>) -> RequestView {
        let mission_name = self.missions.resolve_name(request.mission_id).await;
        RequestView {
            is_late: is_late(&request, now),
            mission_name,
            request,
        }
    }

    async fn render_all(&self, requests: Vec<Request>, now: DateTime<Utc>) -> Vec<RequestView> {
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            views.push(self.render(request, now).await);
        }
        views
    }

    async fn load(&self, id: Uuid) -> Result<Request, WorkflowError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| WorkflowError::request_not_found(id))
    }

    async fn check_mission(&self, mission_id: Option<Uuid>) -> Result<(), WorkflowError> {
        if let Some(id) = mission_id {
            if !self.missions.exists(id).await? {
                return Err(WorkflowError::Validation(format!("mission {id} does not exist")));
            }
        }
        Ok(())
    }

    fn check_title(title: &str) -> Result<String, WorkflowError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WorkflowError::Validation("title is required".into()));
        }
        Ok(title.to_string())
    }

    pub async fn create_request(
        &self,
        actor: &Actor,
        input: NewRequest,
        now: DateTime<Utc>,
    ) -> Result<RequestView, WorkflowError> {
        if !actor.can_create_requests() {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "create requests",
            });
        }
        let title = Self::check_title(&input.title)?;
        self.check_mission(input.mission_id).await?;

        let request = Request {
            id: Uuid::new_v4(),
            request_type: input.details.kind(),
            title,
            created_by: actor.id,
            mission_id: input.mission_id,
            workflow_status: WorkflowStatus::PendingAssignment,
            target_role: TargetRole::Growth,
            assigned_to: None,
            assigned_to_name: None,
            created_at: now,
            due_date: input.due_date,
            last_updated: now,
            details: input.details,
        };
        self.store.insert_request(&request).await?;
        self.board.invalidate();
        info!(request = %request.id, kind = %request.request_type, actor = %actor.id, "request created");
        Ok(self.render(request, now).await)
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<RequestView>, WorkflowError> {
        let rows = self.store.list_requests(filter).await?;
        Ok(self.render_all(rows, now).await)
    }

    pub async fn to_assign(&self, now: DateTime<Utc>) -> Result<Vec<RequestView>, WorkflowError> {
        let rows = self.store.list_requests(&to_assign_filter()).await?;
        report_invariant_violations(&rows);
        Ok(self.render_all(rows, now).await)
    }

    pub async fn my_assignments(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<RequestView>, WorkflowError> {
        let rows = self.store.list_requests(&my_assignments_filter(actor.id)).await?;
        Ok(self.render_all(rows, now).await)
    }

    pub async fn board(&self, actor: &Actor, now: DateTime<Utc>) -> Result<BoardView, WorkflowError> {
        let snapshot = self.board.get_or_fetch(self.store.as_ref(), actor.id).await?;
        Ok(BoardView {
            all: self.render_all(snapshot.all.clone(), now).await,
            to_assign: self.render_all(snapshot.to_assign.clone(), now).await,
            mine: self.render_all(snapshot.mine.clone(), now).await,
        })
    }

    pub async fn get_request(&self, id: Uuid, now: DateTime<Utc>) -> Result<RequestView, WorkflowError> {
        let request = self.load(id).await?;
        Ok(self.render(request, now).await)
    }

    pub async fn assign_request_to_me(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RequestView, WorkflowError> {
        self.update_request_workflow_status(actor, id, WorkflowStatus::InProgress, now)
            .await
    }

    pub async fn update_request_workflow_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: WorkflowStatus,
        now: DateTime<Utc>,
    ) -> Result<RequestView, WorkflowError> {
        let current = self.load(id).await?;
        let planned = plan(&current, actor, status, self.policy, now)?;

        let updated = self
            .store
            .update_workflow(id, &planned.guard, &planned.change)
            .await
            .map_err(|e| {
                error!(request = %id, "workflow update failed: {e}");
                e
            })?;
        self.board.invalidate();

        let Some(updated) = updated else {
            return Err(match self.store.get_request(id).await? {
                Some(_) => WorkflowError::Conflict(id),
                None => WorkflowError::request_not_found(id),
            });
        };
        info!(
            request = %id,
            actor = %actor.id,
            from = %current.workflow_status,
            to = %updated.workflow_status,
            transition = ?planned.transition,
            "workflow status changed"
        );
        Ok(self.render(updated, now).await)
    }

    pub async fn clone_request(
        &self,
        actor: &Actor,
        id: Uuid,
        input: CloneRequestInput,
        now: DateTime<Utc>,
    ) -> Result<RequestView, WorkflowError> {
        let source = self.load(id).await?;
        let title = match input.title {
            Some(title) => Self::check_title(&title)?,
            None => source.title.clone(),
        };
        let mission_id = input.mission_id.or(source.mission_id);
        if input.mission_id.is_some() {
            self.check_mission(mission_id).await?;
        }

        let copy = Request {
            id: Uuid::new_v4(),
            request_type: source.request_type,
            title,
            created_by: actor.id,
            mission_id,
            workflow_status: WorkflowStatus::PendingAssignment,
            target_role: source.target_role,
            assigned_to: None,
            assigned_to_name: None,
            created_at: now,
            due_date: input.due_date.unwrap_or(source.due_date),
            last_updated: now,
            details: source.details,
        };
        self.store.insert_request(&copy).await?;
        self.board.invalidate();
        info!(request = %copy.id, source = %id, actor = %actor.id, "request cloned");
        Ok(self.render(copy, now).await)
    }

    pub async fn update_request_content(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateRequestContent,
        now: DateTime<Utc>,
    ) -> Result<RequestView, WorkflowError> {
        if input.is_empty() {
            return Err(WorkflowError::Validation("no fields to update".into()));
        }
        let current = self.load(id).await?;
        if !actor.can_edit_content(&current) {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "edit requests they did not create",
            });
        }
        if current.workflow_status.is_closed() {
            return Err(WorkflowError::Validation(format!(
                "request is {} and can no longer be edited",
                current.workflow_status
            )));
        }
        if let Some(details) = &input.details {
            if details.kind() != current.request_type {
                return Err(WorkflowError::TypeChange {
                    expected: current.request_type,
                    found: details.kind(),
                });
            }
        }
        if input.clear_mission && input.mission_id.is_some() {
            return Err(WorkflowError::Validation(
                "clear_mission cannot be combined with mission_id".into(),
            ));
        }
        if input.mission_id.is_some() {
            self.check_mission(input.mission_id).await?;
        }
        let mission_id = if input.clear_mission {
            None
        } else {
            input.mission_id.or(current.mission_id)
        };

        let content = RequestContent {
            title: match input.title {
                Some(title) => Self::check_title(&title)?,
                None => current.title,
            },
            mission_id,
            due_date: input.due_date.unwrap_or(current.due_date),
            details: input.details.unwrap_or(current.details),
            last_updated: now,
        };
        let updated = self.store.update_content(id, &content).await?;
        self.board.invalidate();
        let Some(updated) = updated else {
            // Gone, or closed since it was loaded.
            return Err(match self.store.get_request(id).await? {
                Some(_) => WorkflowError::Conflict(id),
                None => WorkflowError::request_not_found(id),
            });
        };
        info!(request = %id, actor = %actor.id, "request content updated");
        Ok(self.render(updated, now).await)
    }

    pub async fn delete_request(&self, actor: &Actor, id: Uuid) -> Result<(), WorkflowError> {
        let current = self.load(id).await?;
        if !actor.can_delete(&current) {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "delete requests they did not create",
            });
        }
        if !self.store.delete_request(id).await? {
            return Err(WorkflowError::request_not_found(id));
        }
        self.board.invalidate();
        info!(request = %id, actor = %actor.id, "request deleted");
        Ok(())
    }
}
