use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::mission::{Mission, NewMission};
use crate::middleware::auth::Actor;
use crate::utils::api_response::ApiResponse;

pub fn mission_routes() -> Router<AppState> {
    Router::new()
        .route("/missions", post(create_mission).get(list_missions))
        .route("/missions/{mission_id}", get(get_mission))
}

/// ✅ **Create Mission**
#[utoipa::path(
    post,
    path = "/missions",
    request_body = NewMission,
    responses(
        (status = 201, description = "Mission created", body = Mission),
        (status = 403, description = "Role may not create missions"),
        (status = 422, description = "Missing name or inverted dates")
    ),
    tag = "Missions",
    security(("bearerAuth" = []))
)]
pub async fn create_mission(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewMission>,
) -> Result<ApiResponse<Mission>, ApiResponse<()>> {
    let mission = state.missions.create_mission(&actor, payload, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Mission created", mission))
}

#[utoipa::path(
    get,
    path = "/missions",
    responses(
        (status = 200, description = "All missions, newest first", body = Vec<Mission>)
    ),
    tag = "Missions",
    security(("bearerAuth" = []))
)]
pub async fn list_missions(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Mission>>, ApiResponse<()>> {
    let missions = state.missions.list_missions().await?;
    Ok(ApiResponse::success(StatusCode::OK, "Missions retrieved", missions))
}

/// **Get Mission by ID**
#[utoipa::path(
    get,
    path = "/missions/{mission_id}",
    params(("mission_id" = Uuid, Path, description = "Mission ID")),
    responses(
        (status = 200, description = "Mission retrieved", body = Mission),
        (status = 404, description = "Mission not found")
    ),
    tag = "Missions",
    security(("bearerAuth" = []))
)]
pub async fn get_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<Uuid>,
) -> Result<ApiResponse<Mission>, ApiResponse<()>> {
    let mission = state.missions.get_mission(mission_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Mission retrieved", mission))
}

#[derive(OpenApi)]
#[openapi(
    paths(create_mission, list_missions, get_mission),
    components(schemas(Mission, NewMission)),
    tags(
        (name = "Missions", description = "Parent missions that group requests")
    )
)]
pub struct MissionDoc;
