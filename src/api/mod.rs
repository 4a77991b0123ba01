use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::app_state::AppState;
use crate::middleware::auth::jwt_middleware;
use crate::middleware::request_logger::log_requests;

pub mod docs;
pub mod health;
pub mod missions;
pub mod requests;

/// Full application router. Everything except health and docs requires a bearer token.
pub fn router(state: AppState) -> Router {
    let private_routes = Router::new()
        .merge(requests::request_routes())
        .merge(missions::mission_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_middleware));

    Router::new()
        .merge(health::health_routes())
        .merge(docs::docs_routes())
        .merge(private_routes)
        .layer(from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::Config;
    use crate::db::memory::MemoryStore;
    use crate::db::models::user::Role;
    use crate::middleware::auth::Claims;

    const SECRET: &str = "router-test-secret";

    fn test_app() -> Router {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        router(AppState::new(config, store.clone(), store))
    }

    fn token(role: Role) -> String {
        Claims::new(Uuid::new_v4(), format!("{role}-user"), role, 3600)
            .encode(SECRET)
            .unwrap()
    }

    fn call(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header("Authorization", format!("Bearer {bearer}"));
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn new_email_request(title: &str) -> Value {
        json!({
            "title": title,
            "due_date": "2099-01-01T00:00:00Z",
            "details": { "type": "email", "subject": "Spring launch" }
        })
    }

    #[tokio::test]
    async fn liveness_needs_no_token() {
        let response = test_app()
            .oneshot(call("GET", "/health/live", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reports_the_memory_store() {
        let response = test_app()
            .oneshot(call("GET", "/health/ready", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_routes_reject_missing_token() {
        let response = test_app()
            .oneshot(call("GET", "/requests", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn request_routes_reject_token_signed_with_another_secret() {
        let forged = Claims::new(Uuid::new_v4(), "mallory", Role::Admin, 3600)
            .encode("some-other-secret")
            .unwrap();
        let response = test_app()
            .oneshot(call("GET", "/requests", Some(&forged), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sdr_creates_and_growth_claims_then_completes() {
        let app = test_app();
        let sdr = token(Role::Sdr);
        let growth = token(Role::Growth);

        let created = app
            .clone()
            .oneshot(call("POST", "/requests", Some(&sdr), Some(new_email_request("Spring campaign"))))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body_json(created.into_body()).await;
        assert_eq!(created["data"]["workflow_status"], "pending_assignment");
        assert_eq!(created["data"]["mission_name"], "No mission");
        assert_eq!(created["data"]["is_late"], false);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let pool = app
            .clone()
            .oneshot(call("GET", "/requests/to-assign", Some(&growth), None))
            .await
            .unwrap();
        let pool = body_json(pool.into_body()).await;
        assert_eq!(pool["data"].as_array().unwrap().len(), 1);

        let sdr_claim = app
            .clone()
            .oneshot(call("POST", &format!("/requests/{id}/assign"), Some(&sdr), None))
            .await
            .unwrap();
        assert_eq!(sdr_claim.status(), StatusCode::FORBIDDEN);

        let claimed = app
            .clone()
            .oneshot(call("POST", &format!("/requests/{id}/assign"), Some(&growth), None))
            .await
            .unwrap();
        assert_eq!(claimed.status(), StatusCode::OK);
        let claimed = body_json(claimed.into_body()).await;
        assert_eq!(claimed["data"]["workflow_status"], "in_progress");
        assert_eq!(claimed["data"]["assigned_to_name"], "growth-user");

        let mine = app
            .clone()
            .oneshot(call("GET", "/requests/mine", Some(&growth), None))
            .await
            .unwrap();
        let mine = body_json(mine.into_body()).await;
        assert_eq!(mine["data"].as_array().unwrap().len(), 1);

        let completed = app
            .clone()
            .oneshot(call(
                "PATCH",
                &format!("/requests/{id}/status"),
                Some(&growth),
                Some(json!({ "status": "completed" })),
            ))
            .await
            .unwrap();
        assert_eq!(completed.status(), StatusCode::OK);

        let reopened = app
            .oneshot(call(
                "PATCH",
                &format!("/requests/{id}/status"),
                Some(&growth),
                Some(json!({ "status": "in_progress" })),
            ))
            .await
            .unwrap();
        assert_eq!(reopened.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn board_groups_requests_for_the_caller() {
        let app = test_app();
        let sdr = token(Role::Sdr);
        let growth = token(Role::Growth);

        for title in ["First", "Second"] {
            let response = app
                .clone()
                .oneshot(call("POST", "/requests", Some(&sdr), Some(new_email_request(title))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let board = app
            .oneshot(call("GET", "/requests/board", Some(&growth), None))
            .await
            .unwrap();
        assert_eq!(board.status(), StatusCode::OK);
        let board = body_json(board.into_body()).await;
        assert_eq!(board["data"]["all"].as_array().unwrap().len(), 2);
        assert_eq!(board["data"]["to_assign"].as_array().unwrap().len(), 2);
        assert!(board["data"]["mine"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let response = test_app()
            .oneshot(call(
                "GET",
                &format!("/requests/{}", Uuid::new_v4()),
                Some(&token(Role::Growth)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn growth_cannot_create_missions() {
        let response = test_app()
            .oneshot(call(
                "POST",
                "/missions",
                Some(&token(Role::Growth)),
                Some(json!({ "name": "Q3 outreach" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn openapi_document_lists_workflow_paths() {
        let response = test_app()
            .oneshot(call("GET", "/api-docs/openapi.json", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response.into_body()).await;
        assert!(doc["paths"]["/requests/{request_id}/status"].is_object());
        assert!(doc["paths"]["/missions"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearerAuth"].is_object());
    }
}
