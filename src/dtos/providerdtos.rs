use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::providermodel::{Provider, ProviderApproval};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterProviderDto {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 32, message = "Phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, max = 254, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, max = 80, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, max = 3, message = "Choose between 1 and 3 services"))]
    pub service_types: Vec<String>,

    #[validate(length(min = 8, max = 64, message = "Password must be between 8 and 64 characters"))]
    pub password: String,
}

impl RegisterProviderDto {
    pub const FIELD_ORDER: &'static [&'static str] =
        &["name", "phone", "email", "city", "service_types", "password"];
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginProviderDto {
    /// Phone or email.
    #[validate(length(min = 1, message = "Phone or email is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderLoginResponse {
    pub token: String,
    pub provider: Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderApprovalDto {
    pub status: ProviderApproval,
}
