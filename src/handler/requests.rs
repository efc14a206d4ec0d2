use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;

use crate::{
    dtos::{chatdtos::*, requestdtos::*, ApiResponse},
    error::HttpError,
    models::requestmodel::ServiceType,
    AppState,
};

/// Customer-facing routes. Ownership is proven per call with `ref` + contact.
pub fn requests_handler() -> Router {
    Router::new()
        .route("/", post(submit_request))
        .route("/service-types", get(list_service_types))
        .route("/status", get(get_status))
        .route("/complete", post(complete_request))
        .route("/route", get(refresh_route))
        .route("/messages", get(list_messages).post(send_message))
}

pub async fn submit_request(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<SubmitRequestDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.dispatch_service.submit_request(body).await?;

    let (status, message) = if outcome.created {
        (StatusCode::CREATED, "Request submitted")
    } else {
        (StatusCode::OK, "An active request already exists for this contact")
    };

    Ok((status, Json(ApiResponse::success(message, outcome))))
}

pub async fn list_service_types() -> impl IntoResponse {
    Json(ApiResponse::success("Service types", ServiceType::ALL.to_vec()))
}

pub async fn get_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<CustomerLookupDto>,
) -> Result<impl IntoResponse, HttpError> {
    let view = app_state.completion_service.get_status(query).await?;
    Ok(Json(ApiResponse::success("Request status", view)))
}

pub async fn complete_request(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<CompleteRequestDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.completion_service.complete_request(body).await?;

    let message = if outcome.updated {
        "Request completed"
    } else {
        "Request was already completed"
    };
    Ok(Json(ApiResponse::success(message, outcome)))
}

pub async fn refresh_route(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<CustomerLookupDto>,
) -> Result<impl IntoResponse, HttpError> {
    let view = app_state.tracking_service.refresh_route(query).await?;
    Ok(Json(ApiResponse::success("Route", view)))
}

pub async fn list_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<CustomerMessagesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state.chat_service.customer_messages(query).await?;
    Ok(Json(ApiResponse::success("Messages", messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<CustomerMessageDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let message = app_state.chat_service.send_customer_message(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message)),
    ))
}
