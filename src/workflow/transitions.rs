use chrono::{DateTime, Utc};
use tracing::warn;

use crate::db::models::requests::{Request, WorkflowStatus};
use crate::db::store::{WorkflowChange, WorkflowGuard};
use crate::error::WorkflowError;
use crate::middleware::auth::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// pending_assignment -> in_progress, assigning the actor.
    Claim,
    /// in_progress -> pending_assignment, releasing the assignee.
    Unclaim,
    Complete,
    Cancel,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkflowPolicy {
    /// When false, any growth actor may unclaim any in-progress request.
    pub enforce_unclaim_ownership: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self { enforce_unclaim_ownership: true }
    }
}

/// Looks up the transition for `from -> to`. Closed states have no way out.
pub fn classify(from: WorkflowStatus, to: WorkflowStatus) -> Result<Transition, WorkflowError> {
    use WorkflowStatus::*;

    match (from, to) {
        (PendingAssignment, InProgress) => Ok(Transition::Claim),
        (InProgress, PendingAssignment) => Ok(Transition::Unclaim),
        (PendingAssignment | InProgress, Completed) => Ok(Transition::Complete),
        (PendingAssignment | InProgress, Canceled) => Ok(Transition::Cancel),
        (PendingAssignment, PendingAssignment)
        | (InProgress, InProgress)
        | (Completed, _)
        | (Canceled, _) => Err(WorkflowError::InvalidTransition { from, to }),
    }
}

/// A checked transition, ready to be written with a compare-and-set update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransition {
    pub transition: Transition,
    pub guard: WorkflowGuard,
    pub change: WorkflowChange,
}

/// Validates that `actor` may move `request` to `to` and computes the new workflow fields.
pub fn plan(
    request: &Request,
    actor: &Actor,
    to: WorkflowStatus,
    policy: WorkflowPolicy,
    now: DateTime<Utc>,
) -> Result<PlannedTransition, WorkflowError> {
    if !actor.can_drive_workflow() {
        return Err(WorkflowError::Forbidden {
            role: actor.role,
            action: "change request status",
        });
    }

    let transition = classify(request.workflow_status, to)?;
    let (assigned_to, assigned_to_name) = match transition {
        Transition::Claim => {
            if !actor.can_claim_from(request.target_role) {
                return Err(WorkflowError::WrongPool(request.id));
            }
            if request.assigned_to.is_some() {
                return Err(WorkflowError::AlreadyAssigned(request.id));
            }
            (Some(actor.id), Some(actor.name.clone()))
        }
        Transition::Unclaim => {
            if request.assigned_to != Some(actor.id) && !actor.is_admin() {
                if policy.enforce_unclaim_ownership {
                    return Err(WorkflowError::NotOwner(request.id));
                }
                warn!(
                    request = %request.id,
                    actor = %actor.id,
                    "unclaiming a request assigned to someone else"
                );
            }
            (None, None)
        }
        Transition::Complete => match request.assigned_to {
            Some(assignee) => (Some(assignee), request.assigned_to_name.clone()),
            None => (Some(actor.id), Some(actor.name.clone())),
        },
        Transition::Cancel => (None, None),
    };

    Ok(PlannedTransition {
        transition,
        guard: WorkflowGuard {
            status: request.workflow_status,
            assigned_to: request.assigned_to,
        },
        change: WorkflowChange {
            status: to,
            assigned_to,
            assigned_to_name,
            last_updated: now,
        },
    })
}

/// Pending requests carry no assignee; in-progress and completed ones always do.
pub fn assignment_invariant_holds(request: &Request) -> bool {
    match request.workflow_status {
        WorkflowStatus::PendingAssignment => request.assigned_to.is_none(),
        WorkflowStatus::InProgress | WorkflowStatus::Completed => request.assigned_to.is_some(),
        WorkflowStatus::Canceled => true,
    }
}
