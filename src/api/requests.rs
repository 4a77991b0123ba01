use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::requests::{
    Blacklist, CloneRequestInput, DatabaseDetails, EmailDetails, LinkedInDetails, NewRequest,
    Request, RequestDetails, RequestFilter, RequestType, RequestView, StatusChange, TargetRole,
    Targeting, UpdateRequestContent, WorkflowStatus,
};
use crate::middleware::auth::Actor;
use crate::utils::api_response::ApiResponse;
use crate::workflow::service::BoardView;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/to-assign", get(get_requests_to_assign))
        .route("/requests/mine", get(get_my_assignments))
        .route("/requests/board", get(get_board))
        .route(
            "/requests/{request_id}",
            get(get_request).patch(update_request_content).delete(delete_request),
        )
        .route("/requests/{request_id}/assign", post(assign_request_to_me))
        .route("/requests/{request_id}/status", patch(update_request_workflow_status))
        .route("/requests/{request_id}/clone", post(clone_request))
}

/// ✅ **Create Request**
/// SDRs and admins file a new request into the growth pool.
#[utoipa::path(
    post,
    path = "/requests",
    request_body = NewRequest,
    responses(
        (status = 201, description = "Request created", body = RequestView),
        (status = 403, description = "Role may not create requests"),
        (status = 422, description = "Invalid title, mission or details")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewRequest>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let view = state.requests.create_request(&actor, payload, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Request created", view))
}

#[utoipa::path(
    get,
    path = "/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Requests ordered by due date", body = Vec<RequestView>),
        (status = 500, description = "Failed to retrieve requests")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<ApiResponse<Vec<RequestView>>, ApiResponse<()>> {
    let views = state.requests.list_requests(&filter, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Requests retrieved", views))
}

/// ✅ **Requests To Assign**
#[utoipa::path(
    get,
    path = "/requests/to-assign",
    responses(
        (status = 200, description = "Pending requests in the growth pool", body = Vec<RequestView>)
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_requests_to_assign(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RequestView>>, ApiResponse<()>> {
    let views = state.requests.to_assign(Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Requests to assign", views))
}

#[utoipa::path(
    get,
    path = "/requests/mine",
    responses(
        (status = 200, description = "Requests assigned to the caller", body = Vec<RequestView>)
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_my_assignments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<ApiResponse<Vec<RequestView>>, ApiResponse<()>> {
    let views = state.requests.my_assignments(&actor, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::OK, "My assignments", views))
}

/// ✅ **Request Board** (all requests + both pools, cached per caller)
#[utoipa::path(
    get,
    path = "/requests/board",
    responses(
        (status = 200, description = "All requests plus both assignment pools", body = BoardView)
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_board(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<ApiResponse<BoardView>, ApiResponse<()>> {
    let board = state.requests.board(&actor, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request board", board))
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}",
    params(("request_id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request retrieved", body = RequestView),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let view = state.requests.get_request(request_id, Utc::now()).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request retrieved", view))
}

#[utoipa::path(
    patch,
    path = "/requests/{request_id}",
    params(("request_id" = Uuid, Path, description = "Request ID")),
    request_body = UpdateRequestContent,
    responses(
        (status = 200, description = "Request updated", body = RequestView),
        (status = 403, description = "Only the author or an admin may edit"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Closed request or details of another type")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_request_content(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<UpdateRequestContent>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let view = state
        .requests
        .update_request_content(&actor, request_id, payload, Utc::now())
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request updated", view))
}

/// **Delete Request:**
#[utoipa::path(
    delete,
    path = "/requests/{request_id}",
    params(("request_id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request deleted"),
        (status = 403, description = "Role may not delete this request"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    state.requests.delete_request(&actor, request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request deleted", ()))
}

/// ✅ **Assign Request to Me**
/// Same guards as a status change to `in_progress`.
#[utoipa::path(
    post,
    path = "/requests/{request_id}/assign",
    params(("request_id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request assigned to the caller", body = RequestView),
        (status = 403, description = "Role may not claim requests"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is no longer pending")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn assign_request_to_me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let view = state
        .requests
        .assign_request_to_me(&actor, request_id, Utc::now())
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request assigned", view))
}

/// ✅ **Change Workflow Status**
#[utoipa::path(
    patch,
    path = "/requests/{request_id}/status",
    params(("request_id" = Uuid, Path, description = "Request ID")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Workflow status updated", body = RequestView),
        (status = 403, description = "Role may not change status, or caller is not the assignee"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_request_workflow_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let view = state
        .requests
        .update_request_workflow_status(&actor, request_id, payload.status, Utc::now())
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Workflow status updated", view))
}

/// **Clone Request:**
#[utoipa::path(
    post,
    path = "/requests/{request_id}/clone",
    params(("request_id" = Uuid, Path, description = "Request ID to copy")),
    request_body = CloneRequestInput,
    responses(
        (status = 201, description = "Request cloned", body = RequestView),
        (status = 404, description = "Source request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn clone_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<CloneRequestInput>>,
) -> Result<ApiResponse<RequestView>, ApiResponse<()>> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    let view = state
        .requests
        .clone_request(&actor, request_id, input, Utc::now())
        .await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "Request cloned", view))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_request,
        list_requests,
        get_requests_to_assign,
        get_my_assignments,
        get_board,
        get_request,
        update_request_content,
        delete_request,
        assign_request_to_me,
        update_request_workflow_status,
        clone_request
    ),
    components(schemas(
        Request,
        RequestView,
        BoardView,
        NewRequest,
        UpdateRequestContent,
        CloneRequestInput,
        StatusChange,
        RequestType,
        WorkflowStatus,
        TargetRole,
        RequestDetails,
        EmailDetails,
        DatabaseDetails,
        LinkedInDetails,
        Targeting,
        Blacklist
    )),
    tags(
        (name = "Requests", description = "Marketing requests and their workflow")
    )
)]
pub struct RequestDoc;
