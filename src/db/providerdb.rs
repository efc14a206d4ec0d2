// db/providerdb.rs
use async_trait::async_trait;
use sqlx::Error;

use super::db::DBClient;
use crate::models::{
    providermodel::{NewProvider, Provider, ProviderApproval},
    requestmodel::ServiceType,
};

#[async_trait]
pub trait ProviderExt {
    /// `None` when the phone or email is already registered.
    async fn create_provider(&self, provider: &NewProvider) -> Result<Option<Provider>, Error>;

    async fn get_provider(&self, provider_id: i64) -> Result<Option<Provider>, Error>;

    async fn get_provider_by_login(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Provider>, Error>;

    /// Approved providers in any of `cities` whose list contains `service`.
    async fn find_eligible_providers(
        &self,
        cities: &[String],
        service: ServiceType,
    ) -> Result<Vec<Provider>, Error>;

    async fn update_provider_status(
        &self,
        provider_id: i64,
        status: ProviderApproval,
    ) -> Result<Option<Provider>, Error>;
}

#[async_trait]
impl ProviderExt for DBClient {
    async fn create_provider(&self, provider: &NewProvider) -> Result<Option<Provider>, Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (name, phone, email, city, service_types, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING id, name, phone, email, city, service_types, status,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(&provider.name)
        .bind(&provider.phone)
        .bind(&provider.email)
        .bind(&provider.city)
        .bind(provider.service_types.as_slice())
        .bind(&provider.password_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_provider(&self, provider_id: i64) -> Result<Option<Provider>, Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT id, name, phone, email, city, service_types, status,
                   password_hash, created_at, updated_at
            FROM providers
            WHERE id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_provider_by_login(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Provider>, Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT id, name, phone, email, city, service_types, status,
                   password_hash, created_at, updated_at
            FROM providers
            WHERE ($1::text IS NOT NULL AND phone = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            LIMIT 1
            "#,
        )
        .bind(phone)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_eligible_providers(
        &self,
        cities: &[String],
        service: ServiceType,
    ) -> Result<Vec<Provider>, Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT id, name, phone, email, city, service_types, status,
                   password_hash, created_at, updated_at
            FROM providers
            WHERE status = 'approved'
              AND city = ANY($1)
              AND $2 = ANY(service_types)
            ORDER BY id
            "#,
        )
        .bind(cities)
        .bind(service)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_provider_status(
        &self,
        provider_id: i64,
        status: ProviderApproval,
    ) -> Result<Option<Provider>, Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, phone, email, city, service_types, status,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(provider_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }
}
