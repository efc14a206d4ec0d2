use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{
    error::{ErrorMessage, HttpError},
    models::providermodel::Provider,
    utils::token,
    AppState,
};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderAuth {
    pub provider: Provider,
}

/// Resolves the provider from the `token` cookie or a bearer header.
pub async fn provider_auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(str::to_owned)
        });

    let token = token
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;
    let provider_id = subject
        .parse::<i64>()
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let provider = app_state
        .db_client
        .get_provider(provider_id)
        .await
        .map_err(|e| {
            tracing::error!("Provider lookup failed during auth: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::ProviderNoLongerExist.to_string()))?;

    req.extensions_mut().insert(ProviderAuth { provider });

    Ok(next.run(req).await)
}

pub async fn admin_auth(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let supplied = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let expected = app_state.env.admin_api_key.as_bytes();

    let matches = !supplied.is_empty() && bool::from(supplied.as_bytes().ct_eq(expected));
    if !matches {
        tracing::warn!("Rejected admin call to {}", req.uri().path());
        return Err(HttpError::forbidden(ErrorMessage::InvalidAdminKey.to_string()));
    }

    Ok(next.run(req).await)
}
