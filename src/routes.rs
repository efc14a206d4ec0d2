use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{admin::admin_handler, provider::provider_handler, requests::requests_handler},
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/requests", requests_handler())
        .nest("/provider", provider_handler())
        .nest("/admin", admin_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        dtos::providerdtos::RegisterProviderDto, middleware::ADMIN_KEY_HEADER,
        models::providermodel::ProviderApproval, service::testing::TestHarness,
    };

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn submission() -> Value {
        json!({
            "name": "Ali",
            "phone": "0501112222",
            "email": "ali@x.com",
            "city": "جده",
            "service_type": "مخيم"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let h = TestHarness::new();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_submit_then_resubmit() {
        let h = TestHarness::new();

        let (status, body) =
            call(create_router(h.state.clone()), post_json("/api/requests", submission())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["created"], true);
        assert_eq!(body["data"]["status"], "pending");
        let reference = body["data"]["ref"].as_str().unwrap().to_string();

        let (status, body) =
            call(create_router(h.state.clone()), post_json("/api/requests", submission())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["created"], false);
        assert_eq!(body["data"]["ref"], reference.as_str());

        let uri = format!("/api/requests/status?ref={}&contact=ali%40x.com", reference);
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_errors_render_code_envelope() {
        let h = TestHarness::new();
        let mut bad = submission();
        bad["phone"] = json!("12");

        let (status, body) =
            call(create_router(h.state.clone()), post_json("/api/requests", bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "invalid_phone");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_missing_field_reaches_validation() {
        let h = TestHarness::new();
        let mut body = submission();
        body.as_object_mut().unwrap().remove("name");

        let (status, body) =
            call(create_router(h.state.clone()), post_json("/api/requests", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "invalid_name");
        assert_eq!(h.store.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_body_keeps_envelope() {
        let h = TestHarness::new();

        let request = Request::builder()
            .method("POST")
            .uri("/api/requests")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "invalid_body");

        let request = Request::builder()
            .method("POST")
            .uri("/api/requests")
            .body(Body::from(submission().to_string()))
            .unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_body");

        let login = json!({ "identifier": "owner@desert.sa" });
        let (status, body) =
            call(create_router(h.state.clone()), post_json("/api/provider/login", login)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_body");
    }

    #[tokio::test]
    async fn test_admin_routes_require_key() {
        let h = TestHarness::new();

        let request = Request::get("/api/admin/requests").body(Body::empty()).unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let request = Request::get("/api/admin/requests")
            .header(ADMIN_KEY_HEADER, "wrong-key")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let request = Request::get("/api/admin/requests")
            .header(ADMIN_KEY_HEADER, h.config.admin_api_key.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_array());
    }

    #[tokio::test]
    async fn test_provider_login_unlocks_dashboard() {
        let h = TestHarness::new();

        let request = Request::get("/api/provider/requests").body(Body::empty()).unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["ok"], false);

        let provider = h
            .providers
            .register(RegisterProviderDto {
                name: "Desert Camps".to_string(),
                phone: "0551234567".to_string(),
                email: "owner@desert.sa".to_string(),
                city: "جدة".to_string(),
                service_types: vec!["مخيم".to_string()],
                password: "campfire-42".to_string(),
            })
            .await
            .unwrap();
        h.providers
            .set_approval(provider.id, ProviderApproval::Approved)
            .await
            .unwrap();
        h.submit().await;

        let login = json!({ "identifier": "owner@desert.sa", "password": "campfire-42" });
        let response = create_router(h.state.clone())
            .oneshot(post_json("/api/provider/login", login))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let request = Request::get("/api/provider/requests")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(create_router(h.state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["open_requests"].as_array().unwrap().len(), 1);
        assert!(body["data"]["open_requests"][0].get("phone").is_none());
    }
}
