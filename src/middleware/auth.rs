use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::requests::{Request as WorkflowRequest, TargetRole};
use crate::db::models::user::Role;
use crate::utils::api_response::ApiResponse;

/// JWT claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - user id (UUID)
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Expiration timestamp (UNIX time)
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role, ttl_secs: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            username: username.into(),
            role,
            exp: (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize,
        }
    }

    pub fn encode(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes()))
    }
}

/// ✅ **Authenticated Caller**
/// Built from verified claims and inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl TryFrom<Claims> for Actor {
    type Error = uuid::Error;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Actor {
            id: claims.sub.parse()?,
            name: claims.username,
            role: claims.role,
        })
    }
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// SDRs author requests; admins may stand in for them.
    pub fn can_create_requests(&self) -> bool {
        matches!(self.role, Role::Sdr | Role::Admin)
    }

    /// Growth and admin actors drive assignment and status changes.
    pub fn can_drive_workflow(&self) -> bool {
        matches!(self.role, Role::Growth | Role::Admin)
    }

    pub fn can_claim_from(&self, pool: TargetRole) -> bool {
        match pool {
            TargetRole::Growth => matches!(self.role, Role::Growth | Role::Admin),
        }
    }

    pub fn can_delete(&self, request: &WorkflowRequest) -> bool {
        match self.role {
            Role::Admin | Role::Growth => true,
            Role::Sdr => request.created_by == self.id,
        }
    }

    pub fn can_edit_content(&self, request: &WorkflowRequest) -> bool {
        self.is_admin() || request.created_by == self.id
    }

    pub fn can_create_missions(&self) -> bool {
        matches!(self.role, Role::Sdr | Role::Admin)
    }
}

fn unauthorized(message: &str, errors: Option<serde_json::Value>) -> Response {
    ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, message, errors).into_response()
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
/// Verifies the bearer token and attaches the caller as an `Actor` extension.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        warn!("Missing Authorization header");
        unauthorized("Missing Authorization header", None)
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        warn!("Invalid Authorization header format");
        ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "Invalid Authorization header format", None)
            .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid token format (missing 'Bearer ' prefix)");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("JWT decoding failed: {:?}", e);
        unauthorized("Invalid token", Some(json!({ "error": e.to_string() })))
    })?;

    // Step 5: Resolve the caller and attach it to the request
    let actor = Actor::try_from(token_data.claims).map_err(|e| {
        warn!("JWT subject is not a user id: {e}");
        unauthorized("Invalid user ID format in token", None)
    })?;

    debug!(actor = %actor.id, role = %actor.role, "authenticated");
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
