// src/db/models/requests.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Email,
    Database,
    Linkedin,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Email => "email",
            RequestType::Database => "database",
            RequestType::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "workflow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    PendingAssignment,
    InProgress,
    Completed,
    Canceled,
}

impl WorkflowStatus {
    /// Completed and canceled requests accept no further transitions.
    pub fn is_closed(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::PendingAssignment => "pending_assignment",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role pool allowed to claim a request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type, ToSchema)]
#[sqlx(type_name = "target_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    #[default]
    Growth,
}

/// Who the request is aimed at.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct Targeting {
    pub job_titles: Vec<String>,
    pub industries: Vec<String>,
    pub locations: Vec<String>,
    pub company_sizes: Vec<String>,
    pub notes: Option<String>,
}

/// Accounts and contacts that must be left out.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct Blacklist {
    pub accounts: Vec<String>,
    pub emails: Vec<String>,
    pub notes: Option<String>,
    pub file_refs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct EmailDetails {
    pub targeting: Targeting,
    pub blacklist: Blacklist,
    pub subject: Option<String>,
    pub template: Option<String>,
    pub sender: Option<String>,
    pub volume: Option<u32>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct DatabaseDetails {
    pub targeting: Targeting,
    pub blacklist: Blacklist,
    pub volume: Option<u32>,
    pub fields: Vec<String>,
    pub export_format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct LinkedInDetails {
    pub targeting: Targeting,
    pub blacklist: Blacklist,
    pub search_url: Option<String>,
    pub max_profiles: Option<u32>,
    pub connection_message: Option<String>,
}

/// Type-specific payload of a request, tagged by `type`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestDetails {
    Email(EmailDetails),
    Database(DatabaseDetails),
    Linkedin(LinkedInDetails),
}

impl RequestDetails {
    pub fn kind(&self) -> RequestType {
        match self {
            RequestDetails::Email(_) => RequestType::Email,
            RequestDetails::Database(_) => RequestType::Database,
            RequestDetails::Linkedin(_) => RequestType::Linkedin,
        }
    }

    pub fn targeting(&self) -> &Targeting {
        match self {
            RequestDetails::Email(d) => &d.targeting,
            RequestDetails::Database(d) => &d.targeting,
            RequestDetails::Linkedin(d) => &d.targeting,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct Request {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub title: String,
    pub created_by: Uuid,
    pub mission_id: Option<Uuid>,
    pub workflow_status: WorkflowStatus,
    pub target_role: TargetRole,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub details: RequestDetails,
}

/// A request as returned to clients, with derived fields filled in.
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: Request,
    pub is_late: bool,
    pub mission_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewRequest {
    pub title: String,
    pub mission_id: Option<Uuid>,
    pub due_date: DateTime<Utc>,
    pub details: RequestDetails,
}

#[derive(Debug, Serialize, Deserialize, Default, ToSchema)]
pub struct UpdateRequestContent {
    pub title: Option<String>,
    pub mission_id: Option<Uuid>,
    /// Detach the request from its mission. Cannot be combined with `mission_id`.
    #[serde(default)]
    pub clear_mission: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub details: Option<RequestDetails>,
}

impl UpdateRequestContent {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.mission_id.is_none()
            && !self.clear_mission
            && self.due_date.is_none()
            && self.details.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, ToSchema)]
pub struct CloneRequestInput {
    pub title: Option<String>,
    pub mission_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: WorkflowStatus,
}

/// Fields the content edit writes back. Workflow fields are never touched here.
#[derive(Debug, Clone)]
pub struct RequestContent {
    pub title: String,
    pub mission_id: Option<Uuid>,
    pub due_date: DateTime<Utc>,
    pub details: RequestDetails,
    pub last_updated: DateTime<Utc>,
}

/// Equality predicates for listing requests. Results are ordered by due date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    pub workflow_status: Option<WorkflowStatus>,
    pub target_role: Option<TargetRole>,
    pub assigned_to: Option<Uuid>,
    pub mission_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        self.workflow_status.map_or(true, |s| request.workflow_status == s)
            && self.target_role.map_or(true, |r| request.target_role == r)
            && self.assigned_to.map_or(true, |a| request.assigned_to == Some(a))
            && self.mission_id.map_or(true, |m| request.mission_id == Some(m))
            && self.created_by.map_or(true, |c| request.created_by == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_are_tagged_by_type() {
        let details: RequestDetails = serde_json::from_value(json!({
            "type": "linkedin",
            "search_url": "https://www.linkedin.com/search/results/people/?keywords=cfo",
            "targeting": { "job_titles": ["CFO"] }
        }))
        .unwrap();

        assert_eq!(details.kind(), RequestType::Linkedin);
        assert_eq!(details.targeting().job_titles, vec!["CFO".to_string()]);
        let RequestDetails::Linkedin(linkedin) = &details else {
            panic!("expected linkedin details");
        };
        assert_eq!(linkedin.max_profiles, None);
        assert!(linkedin.blacklist.accounts.is_empty());
    }

    #[test]
    fn unknown_details_type_is_rejected() {
        let parsed = serde_json::from_value::<RequestDetails>(json!({ "type": "fax" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(WorkflowStatus::PendingAssignment).unwrap(),
            json!("pending_assignment")
        );
        assert_eq!(serde_json::to_value(TargetRole::Growth).unwrap(), json!("growth"));
        assert!(WorkflowStatus::Canceled.is_closed());
        assert!(!WorkflowStatus::InProgress.is_closed());
    }

    #[test]
    fn clearing_the_mission_counts_as_an_edit() {
        let edit: UpdateRequestContent =
            serde_json::from_value(json!({ "clear_mission": true })).unwrap();
        assert!(edit.clear_mission);
        assert!(!edit.is_empty());

        let untouched: UpdateRequestContent = serde_json::from_value(json!({})).unwrap();
        assert!(!untouched.clear_mission);
        assert!(untouched.is_empty());
    }

    #[test]
    fn empty_filter_matches_everything() {
        let request = Request {
            id: Uuid::new_v4(),
            request_type: RequestType::Email,
            title: "Q3 outreach".into(),
            created_by: Uuid::new_v4(),
            mission_id: None,
            workflow_status: WorkflowStatus::InProgress,
            target_role: TargetRole::Growth,
            assigned_to: Some(Uuid::new_v4()),
            assigned_to_name: Some("grace".into()),
            created_at: Utc::now(),
            due_date: Utc::now(),
            last_updated: Utc::now(),
            details: RequestDetails::Email(EmailDetails::default()),
        };

        assert!(RequestFilter::default().matches(&request));
        let pending = RequestFilter {
            workflow_status: Some(WorkflowStatus::PendingAssignment),
            ..Default::default()
        };
        assert!(!pending.matches(&request));
        let mine = RequestFilter {
            assigned_to: request.assigned_to,
            ..Default::default()
        };
        assert!(mine.matches(&request));
    }
}
