use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::models::mission::Mission;
use crate::db::models::requests::{
    Request, RequestContent, RequestDetails, RequestFilter, RequestType, TargetRole,
    WorkflowStatus,
};
use crate::db::store::{MissionStore, RequestStore, WorkflowChange, WorkflowGuard};
use crate::error::StoreError;

const REQUEST_COLUMNS: &str = "id, request_type, title, created_by, mission_id, workflow_status, \
     target_role, assigned_to, assigned_to_name, created_at, due_date, last_updated, details";

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    request_type: RequestType,
    title: String,
    created_by: Uuid,
    mission_id: Option<Uuid>,
    workflow_status: WorkflowStatus,
    target_role: TargetRole,
    assigned_to: Option<Uuid>,
    assigned_to_name: Option<String>,
    created_at: DateTime<Utc>,
    due_date: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    details: Json<RequestDetails>,
}

impl TryFrom<RequestRow> for Request {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let details = row.details.0;
        if details.kind() != row.request_type {
            return Err(StoreError::Corrupt {
                id: row.id,
                reason: format!(
                    "details tagged {} on a {} request",
                    details.kind(),
                    row.request_type
                ),
            });
        }
        Ok(Request {
            id: row.id,
            request_type: row.request_type,
            title: row.title,
            created_by: row.created_by,
            mission_id: row.mission_id,
            workflow_status: row.workflow_status,
            target_role: row.target_role,
            assigned_to: row.assigned_to,
            assigned_to_name: row.assigned_to_name,
            created_at: row.created_at,
            due_date: row.due_date,
            last_updated: row.last_updated,
            details,
        })
    }
}

fn into_request(row: Option<RequestRow>) -> Result<Option<Request>, StoreError> {
    row.map(Request::try_from).transpose()
}

/// Store backed by the `requests` and `missions` tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(REQUEST_COLUMNS).push(" FROM requests WHERE TRUE");
        if let Some(status) = filter.workflow_status {
            query.push(" AND workflow_status = ").push_bind(status);
        }
        if let Some(role) = filter.target_role {
            query.push(" AND target_role = ").push_bind(role);
        }
        if let Some(assignee) = filter.assigned_to {
            query.push(" AND assigned_to = ").push_bind(assignee);
        }
        if let Some(mission) = filter.mission_id {
            query.push(" AND mission_id = ").push_bind(mission);
        }
        if let Some(author) = filter.created_by {
            query.push(" AND created_by = ").push_bind(author);
        }
        query.push(" ORDER BY due_date ASC, created_at ASC");

        let rows = query
            .build_query_as::<RequestRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Request::try_from).collect()
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        into_request(row)
    }

    async fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, request_type, title, created_by, mission_id, workflow_status,
                target_role, assigned_to, assigned_to_name, created_at, due_date,
                last_updated, details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(request.id)
        .bind(request.request_type)
        .bind(&request.title)
        .bind(request.created_by)
        .bind(request.mission_id)
        .bind(request.workflow_status)
        .bind(request.target_role)
        .bind(request.assigned_to)
        .bind(&request.assigned_to_name)
        .bind(request.created_at)
        .bind(request.due_date)
        .bind(request.last_updated)
        .bind(Json(&request.details))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_workflow(
        &self,
        id: Uuid,
        guard: &WorkflowGuard,
        change: &WorkflowChange,
    ) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE requests
            SET workflow_status = $1, assigned_to = $2, assigned_to_name = $3, last_updated = $4
            WHERE id = $5 AND workflow_status = $6 AND assigned_to IS NOT DISTINCT FROM $7
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(change.status)
        .bind(change.assigned_to)
        .bind(&change.assigned_to_name)
        .bind(change.last_updated)
        .bind(id)
        .bind(guard.status)
        .bind(guard.assigned_to)
        .fetch_optional(&self.pool)
        .await?;
        into_request(row)
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &RequestContent,
    ) -> Result<Option<Request>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE requests
            SET title = $1, mission_id = $2, due_date = $3, details = $4, last_updated = $5
            WHERE id = $6 AND workflow_status IN ('pending_assignment', 'in_progress')
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(&content.title)
        .bind(content.mission_id)
        .bind(content.due_date)
        .bind(Json(&content.details))
        .bind(content.last_updated)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        into_request(row)
    }

    async fn delete_request(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MissionStore for PgStore {
    async fn insert_mission(&self, mission: &Mission) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO missions (id, name, client, description, start_date, end_date, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(mission.id)
        .bind(&mission.name)
        .bind(&mission.client)
        .bind(&mission.description)
        .bind(mission.start_date)
        .bind(mission.end_date)
        .bind(mission.created_by)
        .bind(mission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError> {
        let mission = sqlx::query_as::<_, Mission>(
            r#"
            SELECT id, name, client, description, start_date, end_date, created_by, created_at
            FROM missions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(mission)
    }

    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let missions = sqlx::query_as::<_, Mission>(
            r#"
            SELECT id, name, client, description, start_date, end_date, created_by, created_at
            FROM missions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(missions)
    }
}
