// service/offer_service.rs
use std::sync::Arc;

use num_traits::FromPrimitive;
use sqlx::types::BigDecimal;
use validator::Validate;

use crate::{
    db::{activitydb::ActivityExt, requestdb::RequestExt, store::Store},
    dtos::{first_invalid_field, requestdtos::*},
    models::requestmodel::{AcceptedOffer, CustomerRequest, RequestStatus},
    service::{
        error::{DbContext, ServiceError},
        lookup::request_by_ref,
        notification_service::NotificationService,
    },
    utils::{contact::same_city, geo::Coordinates, reference::normalize_ref},
};

pub const DEFAULT_CURRENCY: &str = "SAR";

#[derive(Debug, Clone)]
pub struct OfferService {
    db_client: Arc<dyn Store>,
    notification_service: Arc<NotificationService>,
}

/// Why a request can no longer take an offer, if it can't.
fn unavailable_reason(request: &CustomerRequest) -> Option<ServiceError> {
    if request.completed {
        return Some(ServiceError::AlreadyCompleted(request.reference.clone()));
    }
    match request.status {
        RequestStatus::Pending => None,
        RequestStatus::Approved => Some(ServiceError::AlreadyAccepted(request.reference.clone())),
        RequestStatus::Rejected => Some(ServiceError::RequestRejected(request.reference.clone())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_price(price: Option<f64>) -> Result<Option<BigDecimal>, ServiceError> {
    match price {
        None => Ok(None),
        Some(p) if !p.is_finite() || p < 0.0 => Err(ServiceError::InvalidField("price")),
        Some(p) => BigDecimal::from_f64(p)
            .map(|d| Some(d.round(2)))
            .ok_or(ServiceError::InvalidField("price")),
    }
}

fn parse_currency(currency: Option<String>) -> Result<String, ServiceError> {
    match non_empty(currency) {
        None => Ok(DEFAULT_CURRENCY.to_string()),
        Some(c) if c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => {
            Ok(c.to_ascii_uppercase())
        }
        Some(_) => Err(ServiceError::InvalidField("currency")),
    }
}

impl OfferService {
    pub fn new(db_client: Arc<dyn Store>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    /// `pending → approved` for `provider_id`, guarded so that exactly one
    /// concurrent acceptance wins.
    pub async fn accept_offer(
        &self,
        reference: &str,
        provider_id: i64,
        terms: OfferTermsDto,
    ) -> Result<AcceptOutcome, ServiceError> {
        let reference = normalize_ref(reference);
        if reference.is_empty() {
            return Err(ServiceError::MissingParams);
        }

        terms
            .validate()
            .map_err(|e| first_invalid_field(&e, OfferTermsDto::FIELD_ORDER))?;
        let price_total = parse_price(terms.price_total)?;
        let currency = parse_currency(terms.currency)?;

        let request = request_by_ref(self.db_client.as_ref(), &reference).await?;
        if let Some(reason) = unavailable_reason(&request) {
            return Err(reason);
        }

        let provider = self
            .db_client
            .get_provider(provider_id)
            .await
            .db("db_read_failed")?
            .filter(|p| p.is_approved())
            .ok_or(ServiceError::ProviderNotApproved(provider_id))?;

        if !same_city(&request.city, &provider.city) {
            return Err(ServiceError::CityMismatch);
        }
        if !provider.serves(request.service_type) {
            return Err(ServiceError::ServiceMismatch(request.service_type.to_string()));
        }

        let meeting_location = non_empty(terms.meeting_location);
        let meeting_point = meeting_location
            .as_deref()
            .and_then(Coordinates::parse)
            .map(|c| c.as_pair());

        let offer = AcceptedOffer {
            provider_id: provider.id,
            provider_name: provider.name.clone(),
            provider_phone: provider.phone.clone(),
            provider_email: provider.email.clone(),
            price_total,
            currency,
            price_notes: non_empty(terms.price_notes),
            meeting_location,
            meeting_point,
            payment_method: terms.payment_method.unwrap_or_default(),
            payment_details: non_empty(terms.payment_details),
        };

        let accepted = self
            .db_client
            .accept_request(&reference, &offer)
            .await
            .db("db_update_failed")?;

        let Some((request, conversation)) = accepted else {
            // Lost the conditional update; report what the winner left behind.
            let current = request_by_ref(self.db_client.as_ref(), &reference).await?;
            tracing::warn!(
                "Provider {} lost the race to accept {}",
                provider_id,
                reference
            );
            return Err(unavailable_reason(&current)
                .unwrap_or(ServiceError::AlreadyAccepted(reference.clone())));
        };

        tracing::info!(
            "Request {} accepted by provider {} (conversation {})",
            request.reference,
            provider.id,
            conversation.id
        );
        self.notification_service.notify_request_accepted(&request).await;

        Ok(AcceptOutcome {
            reference: request.reference.clone(),
            status: request.status,
            provider: ProviderSnapshotDto {
                id: provider.id,
                name: provider.name,
                phone: provider.phone,
                email: provider.email,
            },
            price_total: request.price_total,
            currency: request.currency,
            price_notes: request.price_notes,
            meeting_location: request.meeting_location,
            payment_method: request.payment_method,
            payment_details: request.payment_details,
            conversation_id: conversation.id,
        })
    }

    /// Records one provider declining. The request stays open for others.
    pub async fn reject_offer(
        &self,
        reference: &str,
        provider_id: i64,
        body: RejectOfferDto,
    ) -> Result<(), ServiceError> {
        let reference = normalize_ref(reference);
        if reference.is_empty() {
            return Err(ServiceError::MissingParams);
        }
        body.validate()
            .map_err(|e| first_invalid_field(&e, &["reason"]))?;

        let request = request_by_ref(self.db_client.as_ref(), &reference).await?;
        let reason = non_empty(body.reason);

        self.db_client
            .record_provider_rejection(&request.reference, provider_id, reason.as_deref())
            .await
            .db("db_insert_failed")?;

        tracing::info!(
            "Provider {} declined request {} (status stays {})",
            provider_id,
            request.reference,
            request.status.to_str()
        );
        Ok(())
    }

    /// Admin path: closes the request for everyone.
    pub async fn admin_reject(
        &self,
        reference: &str,
        body: AdminRejectDto,
    ) -> Result<CustomerRequest, ServiceError> {
        let reference = normalize_ref(reference);
        if reference.is_empty() {
            return Err(ServiceError::MissingRef);
        }
        body.validate()
            .map_err(|e| first_invalid_field(&e, &["note"]))?;
        let note = non_empty(body.note);

        let rejected = self
            .db_client
            .admin_reject_request(&reference, note.as_deref())
            .await
            .db("db_update_failed")?;

        let Some(request) = rejected else {
            let current = request_by_ref(self.db_client.as_ref(), &reference).await?;
            return Err(if current.completed {
                ServiceError::AlreadyCompleted(reference)
            } else if current.status == RequestStatus::Approved {
                ServiceError::AlreadyAccepted(reference)
            } else {
                ServiceError::RequestRejected(reference)
            });
        };

        tracing::info!("Request {} rejected by admin", request.reference);
        self.notification_service
            .notify_request_rejected(&request, note.as_deref())
            .await;

        Ok(request)
    }

    /// Admin acceptance on a provider's behalf; same contract as `accept_offer`.
    pub async fn admin_accept(
        &self,
        reference: &str,
        body: AdminAcceptDto,
    ) -> Result<AcceptOutcome, ServiceError> {
        let provider_id = body.provider_id.ok_or(ServiceError::MissingParams)?;
        self.accept_offer(reference, provider_id, body.terms).await
    }
}
