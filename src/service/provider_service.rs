// service/provider_service.rs
use std::sync::Arc;

use validator::Validate;

use crate::{
    db::store::Store,
    dtos::{first_invalid_field, providerdtos::*},
    models::{
        providermodel::{NewProvider, Provider, ProviderApproval, ServiceList},
        requestmodel::ServiceType,
    },
    service::error::{DbContext, ServiceError},
    utils::{contact::*, password, token},
};

#[derive(Debug, Clone)]
pub struct ProviderService {
    db_client: Arc<dyn Store>,
    jwt_secret: String,
    jwt_maxage: i64,
}

impl ProviderService {
    pub fn new(db_client: Arc<dyn Store>, jwt_secret: String, jwt_maxage: i64) -> Self {
        Self {
            db_client,
            jwt_secret,
            jwt_maxage,
        }
    }

    fn normalize(body: RegisterProviderDto) -> Result<NewProvider, ServiceError> {
        body.validate()
            .map_err(|e| first_invalid_field(&e, RegisterProviderDto::FIELD_ORDER))?;

        let name = body.name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(ServiceError::InvalidField("name"));
        }
        let phone = normalize_phone(&body.phone);
        if !is_valid_phone(&phone) {
            return Err(ServiceError::InvalidField("phone"));
        }
        let email = normalize_email(&body.email);
        if !is_valid_email(&email) {
            return Err(ServiceError::InvalidField("email"));
        }
        let city = normalize_city(&body.city);
        if city.is_empty() {
            return Err(ServiceError::InvalidField("city"));
        }

        let services = body
            .service_types
            .iter()
            .map(|s| s.parse::<ServiceType>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ServiceError::InvalidField("service"))?;
        let service_types =
            ServiceList::new(services).map_err(|_| ServiceError::InvalidField("service_types"))?;

        let password_hash =
            password::hash(&body.password).map_err(|_| ServiceError::InvalidField("password"))?;

        Ok(NewProvider {
            name,
            phone,
            email,
            city,
            service_types,
            password_hash,
        })
    }

    /// New providers start `pending` until an admin approves them.
    pub async fn register(&self, body: RegisterProviderDto) -> Result<Provider, ServiceError> {
        let new_provider = Self::normalize(body)?;

        let provider = self
            .db_client
            .create_provider(&new_provider)
            .await
            .db("db_insert_failed")?
            .ok_or(ServiceError::ProviderExists)?;

        tracing::info!("Provider {} registered in {}", provider.id, provider.city);
        Ok(provider)
    }

    /// `identifier` is an email when it contains `@`, a phone otherwise.
    pub async fn login(&self, body: LoginProviderDto) -> Result<ProviderLoginResponse, ServiceError> {
        body.validate().map_err(|_| ServiceError::InvalidCredentials)?;

        let identifier = body.identifier.trim();
        let (phone, email) = if identifier.contains('@') {
            (None, Some(normalize_email(identifier)))
        } else {
            (Some(normalize_phone(identifier)), None)
        };

        let provider = self
            .db_client
            .get_provider_by_login(phone.as_deref(), email.as_deref())
            .await
            .db("db_read_failed")?
            .ok_or(ServiceError::InvalidCredentials)?;

        let matched = password::compare(&body.password, &provider.password_hash)
            .map_err(|_| ServiceError::InvalidCredentials)?;
        if !matched {
            tracing::warn!("Failed login for provider {}", provider.id);
            return Err(ServiceError::InvalidCredentials);
        }

        let token = token::create_token(
            &provider.id.to_string(),
            self.jwt_secret.as_bytes(),
            self.jwt_maxage,
        )
        .map_err(|e| ServiceError::Other(e.to_string()))?;

        Ok(ProviderLoginResponse { token, provider })
    }

    pub async fn get_provider(&self, provider_id: i64) -> Result<Provider, ServiceError> {
        self.db_client
            .get_provider(provider_id)
            .await
            .db("db_read_failed")?
            .ok_or(ServiceError::NotFound("Provider"))
    }

    pub async fn set_approval(
        &self,
        provider_id: i64,
        status: ProviderApproval,
    ) -> Result<Provider, ServiceError> {
        let provider = self
            .db_client
            .update_provider_status(provider_id, status)
            .await
            .db("db_update_failed")?
            .ok_or(ServiceError::NotFound("Provider"))?;

        tracing::info!("Provider {} approval set to {}", provider.id, status.to_str());
        Ok(provider)
    }
}
