use chrono::{DateTime, Utc};

use crate::db::models::requests::Request;

/// A request is late once its due date has passed while it is still open.
pub fn is_late(request: &Request, now: DateTime<Utc>) -> bool {
    now > request.due_date && !request.workflow_status.is_closed()
}
