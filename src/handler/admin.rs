use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;

use crate::{
    dtos::{providerdtos::ProviderApprovalDto, requestdtos::*, ApiResponse},
    error::HttpError,
    middleware::admin_auth,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/requests", get(list_requests))
        .route("/requests/:reference/history", get(request_history))
        .route("/requests/:reference/accept", post(accept_request))
        .route("/requests/:reference/reject", post(reject_request))
        .route("/providers/:provider_id/approval", put(set_provider_approval))
        .layer(middleware::from_fn(admin_auth))
}

pub async fn list_requests(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let requests = app_state.admin_service.list_requests(query).await?;
    Ok(Json(ApiResponse::success("Requests", requests)))
}

pub async fn request_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state.admin_service.request_history(&reference).await?;
    Ok(Json(ApiResponse::success("Request history", history)))
}

/// Target of the one-click links in the admin summary mail.
pub async fn accept_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AdminAcceptDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.offer_service.admin_accept(&reference, body).await?;
    Ok(Json(ApiResponse::success("Offer accepted on provider's behalf", outcome)))
}

pub async fn reject_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AdminRejectDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let request = app_state.offer_service.admin_reject(&reference, body).await?;
    Ok(Json(ApiResponse::success("Request rejected", request)))
}

pub async fn set_provider_approval(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(provider_id): Path<i64>,
    WithRejection(Json(body), _): WithRejection<Json<ProviderApprovalDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let provider = app_state
        .provider_service
        .set_approval(provider_id, body.status)
        .await?;
    Ok(Json(ApiResponse::success("Provider approval updated", provider)))
}
