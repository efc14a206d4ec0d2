// service/dispatch_service.rs
use std::sync::Arc;

use validator::Validate;

use crate::{
    db::{requestdb::RequestExt, store::Store},
    dtos::{first_invalid_field, requestdtos::*},
    models::{
        providermodel::Provider,
        requestmodel::{CustomerRequest, NewRequest, ServiceType},
    },
    service::{
        error::{DbContext, ServiceError},
        notification_service::NotificationService,
    },
    utils::{contact::*, reference::generate_ref},
};

pub const MAX_REF_ATTEMPTS: usize = 5;
const DASHBOARD_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct DispatchService {
    db_client: Arc<dyn Store>,
    notification_service: Arc<NotificationService>,
    generate_ref: fn() -> String,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DispatchService {
    pub fn new(db_client: Arc<dyn Store>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
            generate_ref,
        }
    }

    #[cfg(test)]
    pub fn with_ref_generator(mut self, generate_ref: fn() -> String) -> Self {
        self.generate_ref = generate_ref;
        self
    }

    fn normalize(body: SubmitRequestDto) -> Result<NewRequest, ServiceError> {
        body.validate()
            .map_err(|e| first_invalid_field(&e, SubmitRequestDto::FIELD_ORDER))?;

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

        let service_type = body
            .service_type
            .parse::<ServiceType>()
            .map_err(|_| ServiceError::InvalidField("service"))?;

        let equipment = body
            .equipment
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        Ok(NewRequest {
            name,
            phone,
            email,
            city,
            service_type,
            group_type: trimmed(body.group_type),
            people_count: body.people_count,
            cooking: body.cooking,
            equipment,
            notes: trimmed(body.notes),
        })
    }

    /// Creates a `pending` request, or returns the contact's active one.
    pub async fn submit_request(&self, body: SubmitRequestDto) -> Result<SubmitOutcome, ServiceError> {
        let new_request = Self::normalize(body)?;

        if let Some(existing) = self
            .db_client
            .find_active_request_by_contact(&new_request.phone, &new_request.email)
            .await
            .db("db_read_failed")?
        {
            tracing::info!("Contact already holds active request {}", existing.reference);
            return Ok(Self::outcome(&existing, false));
        }

        let request = match self.insert_with_fresh_ref(&new_request).await? {
            Inserted::Created(request) => request,
            Inserted::Converged(existing) => {
                tracing::info!(
                    "Concurrent submission converged on active request {}",
                    existing.reference
                );
                return Ok(Self::outcome(&existing, false));
            }
        };

        tracing::info!(
            "Request {} created ({} in {})",
            request.reference,
            request.service_type,
            request.city
        );

        let providers = self.eligible_providers(&request).await;
        let report = self
            .notification_service
            .notify_new_request(&request, &providers)
            .await;
        tracing::info!(
            "Dispatched {}: {} matched, {} notified, {} failed, admin notified: {}",
            request.reference,
            providers.len(),
            report.providers_notified,
            report.providers_failed,
            report.admin_notified
        );

        Ok(Self::outcome(&request, true))
    }

    async fn insert_with_fresh_ref(&self, new_request: &NewRequest) -> Result<Inserted, ServiceError> {
        for attempt in 1..=MAX_REF_ATTEMPTS {
            let reference = (self.generate_ref)();

            if let Some(request) = self
                .db_client
                .insert_request(&reference, new_request)
                .await
                .db("db_insert_failed")?
            {
                return Ok(Inserted::Created(request));
            }

            // The insert lost to either a unique ref or an active-contact index.
            if let Some(existing) = self
                .db_client
                .find_active_request_by_contact(&new_request.phone, &new_request.email)
                .await
                .db("db_read_failed")?
            {
                return Ok(Inserted::Converged(existing));
            }

            tracing::warn!("Ref {} collided (attempt {}/{})", reference, attempt, MAX_REF_ATTEMPTS);
        }

        tracing::error!("Gave up allocating a ref after {} attempts", MAX_REF_ATTEMPTS);
        Err(ServiceError::RefCollision(MAX_REF_ATTEMPTS))
    }

    /// Approved providers in the request's city (any spelling) offering its service.
    pub async fn eligible_providers(&self, request: &CustomerRequest) -> Vec<Provider> {
        let cities = city_variants(&request.city);
        match self
            .db_client
            .find_eligible_providers(&cities, request.service_type)
            .await
        {
            Ok(providers) => providers,
            Err(e) => {
                tracing::error!("Eligibility lookup failed for {}: {}", request.reference, e);
                vec![]
            }
        }
    }

    pub async fn provider_dashboard(&self, provider: &Provider) -> Result<ProviderDashboard, ServiceError> {
        let open_requests = if provider.is_approved() {
            self.db_client
                .list_open_requests_for(
                    &city_variants(&provider.city),
                    &provider.service_types,
                    DASHBOARD_LIMIT,
                )
                .await
                .db("db_read_failed")?
                .iter()
                .map(OpenRequestView::from)
                .collect()
        } else {
            vec![]
        };

        let active_requests = self
            .db_client
            .list_provider_active_requests(provider.id)
            .await
            .db("db_read_failed")?;

        Ok(ProviderDashboard {
            open_requests,
            active_requests,
        })
    }

    fn outcome(request: &CustomerRequest, created: bool) -> SubmitOutcome {
        SubmitOutcome {
            created,
            reference: request.reference.clone(),
            status: request.status,
            completed: request.completed,
        }
    }
}

enum Inserted {
    Created(CustomerRequest),
    Converged(CustomerRequest),
}
