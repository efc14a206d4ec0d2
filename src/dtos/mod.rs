use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::service::error::ServiceError;

pub mod chatdtos;
pub mod providerdtos;
pub mod requestdtos;

/// Success envelope: `{ ok: true, message, data }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data,
        }
    }
}

/// Maps derive-level failures to `invalid_<field>`, reporting the first
/// failing field in `order` so the code is deterministic.
pub fn first_invalid_field(errors: &ValidationErrors, order: &[&'static str]) -> ServiceError {
    let fields = errors.field_errors();
    let field = order
        .iter()
        .copied()
        .find(|name| fields.contains_key(name))
        .or_else(|| fields.keys().copied().min())
        .unwrap_or("params");
    ServiceError::InvalidField(field)
}
