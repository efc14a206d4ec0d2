use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::{cookie::Cookie, WithRejection};

use crate::{
    dtos::{chatdtos::*, providerdtos::*, requestdtos::*, ApiResponse},
    error::HttpError,
    middleware::{provider_auth, ProviderAuth},
    AppState,
};

pub fn provider_handler() -> Router {
    let protected = Router::new()
        .route("/me", get(get_me))
        .route("/logout", post(logout))
        .route("/requests", get(dashboard))
        .route("/requests/:reference/accept", post(accept_request))
        .route("/requests/:reference/reject", post(reject_request))
        .route("/requests/:reference/tracking", post(update_tracking))
        .route(
            "/requests/:reference/messages",
            get(list_messages).post(send_message),
        )
        .layer(middleware::from_fn(provider_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

fn token_cookie(value: String, max_age: time::Duration) -> Result<HeaderMap, HttpError> {
    let cookie = Cookie::build(("token", value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Could not build session cookie"))?,
    );
    Ok(headers)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterProviderDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let provider = app_state.provider_service.register(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Registration received. An admin will review your profile",
            provider,
        )),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<LoginProviderDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let login = app_state.provider_service.login(body).await?;

    let headers = token_cookie(
        login.token.clone(),
        time::Duration::minutes(app_state.env.jwt_maxage),
    )?;

    let mut response = Json(ApiResponse::success("Logged in", login)).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let headers = token_cookie(String::new(), time::Duration::ZERO)?;

    let mut response = Json(ApiResponse::success("Logged out", ())).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

pub async fn get_me(Extension(auth): Extension<ProviderAuth>) -> impl IntoResponse {
    Json(ApiResponse::success("Provider profile", auth.provider))
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
) -> Result<impl IntoResponse, HttpError> {
    let dashboard = app_state
        .dispatch_service
        .provider_dashboard(&auth.provider)
        .await?;
    Ok(Json(ApiResponse::success("Provider requests", dashboard)))
}

pub async fn accept_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<OfferTermsDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .offer_service
        .accept_offer(&reference, auth.provider.id, body)
        .await?;
    Ok(Json(ApiResponse::success("Offer accepted", outcome)))
}

pub async fn reject_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<RejectOfferDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .offer_service
        .reject_offer(&reference, auth.provider.id, body)
        .await?;
    Ok(Json(ApiResponse::success("Response recorded", ())))
}

pub async fn update_tracking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<TrackingUpdateDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .tracking_service
        .update_tracking(&reference, auth.provider.id, body)
        .await?;
    Ok(Json(ApiResponse::success("Tracking updated", outcome)))
}

pub async fn list_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
    Path(reference): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .chat_service
        .provider_messages(&reference, auth.provider.id, query.since)
        .await?;
    Ok(Json(ApiResponse::success("Messages", messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<ProviderAuth>,
    Path(reference): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<SendMessageDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let message = app_state
        .chat_service
        .send_provider_message(&reference, auth.provider.id, body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message)),
    ))
}
