// service/testing.rs
//
// Shared fixtures for engine and router tests.
use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    config::Config,
    db::memory::MemoryStore,
    dtos::requestdtos::*,
    mail::sendmail::{MailError, Mailer, OutgoingMail},
    models::{
        providermodel::{Provider, ProviderApproval},
        requestmodel::ServiceType,
    },
    service::{
        admin_service::AdminService,
        chat_service::ChatService,
        completion_service::CompletionService,
        dispatch_service::DispatchService,
        notification_service::NotificationService,
        offer_service::OfferService,
        provider_service::ProviderService,
        route_provider::{RouteError, RouteProvider, RouteSummary},
        tracking_service::TrackingService,
    },
    utils::geo::Coordinates,
    AppState,
};

/// Captures outgoing mail; addresses passed to `fail_for` bounce.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingMailer {
    pub fn fail_for(&self, email: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.to_string());
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&mail.to) {
            return Err(MailError::Provider("mailbox unavailable".to_string()));
        }
        drop(failing);

        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push(mail.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

/// Fixed geocode result, a two-point route taking 400 seconds.
#[derive(Debug, Default)]
pub struct StubRouteProvider {
    geocode_calls: AtomicUsize,
    route_calls: AtomicUsize,
    failing: AtomicBool,
}

pub const STUB_GEOCODE: (f64, f64) = (21.72, 39.09);
pub const STUB_DURATION_SECONDS: f64 = 400.0;

impl StubRouteProvider {
    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RouteProvider for StubRouteProvider {
    async fn geocode(&self, query: &str) -> Result<Coordinates, RouteError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RouteError::NoResult(query.to_string()));
        }
        Coordinates::new(STUB_GEOCODE.0, STUB_GEOCODE.1)
            .ok_or_else(|| RouteError::NoResult(query.to_string()))
    }

    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<RouteSummary, RouteError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RouteError::NoResult("route".to_string()));
        }
        Ok(RouteSummary {
            polyline: vec![[from.lat, from.lng], [to.lat, to.lng]],
            distance_meters: 5200.0,
            duration_seconds: STUB_DURATION_SECONDS,
        })
    }
}

pub struct TestHarness {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub routes: Arc<StubRouteProvider>,
    pub state: Arc<AppState>,
    pub notifications: Arc<NotificationService>,
    pub dispatch: Arc<DispatchService>,
    pub offers: Arc<OfferService>,
    pub tracking: Arc<TrackingService>,
    pub completion: Arc<CompletionService>,
    pub chat: Arc<ChatService>,
    pub providers: Arc<ProviderService>,
    pub admin: Arc<AdminService>,
    next_contact: AtomicI64,
}

impl TestHarness {
    pub fn new() -> Self {
        let config = Config::for_tests();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let routes = Arc::new(StubRouteProvider::default());

        let state = Arc::new(AppState::new(
            config.clone(),
            store.clone(),
            mailer.clone(),
            routes.clone(),
            None,
        ));

        Self {
            config,
            store,
            mailer,
            routes,
            notifications: state.notification_service.clone(),
            dispatch: state.dispatch_service.clone(),
            offers: state.offer_service.clone(),
            tracking: state.tracking_service.clone(),
            completion: state.completion_service.clone(),
            chat: state.chat_service.clone(),
            providers: state.provider_service.clone(),
            admin: state.admin_service.clone(),
            state,
            next_contact: AtomicI64::new(1),
        }
    }

    /// An approved provider with a unique phone and email.
    pub async fn provider(&self, name: &str, city: &str, services: &[ServiceType]) -> Provider {
        let n = self.next_contact.fetch_add(1, Ordering::SeqCst);
        self.store
            .insert_provider(
                name,
                &format!("0540000{:03}", n),
                &format!("provider{}@camps.test", n),
                city,
                services,
                ProviderApproval::Approved,
            )
            .await
    }

    /// Submits the default customer request and returns its ref.
    pub async fn submit(&self) -> String {
        self.dispatch
            .submit_request(submit_dto())
            .await
            .expect("default submission succeeds")
            .reference
    }

    pub async fn accept(&self, reference: &str, provider_id: i64) -> AcceptOutcome {
        self.offers
            .accept_offer(reference, provider_id, offer_terms(300.0))
            .await
            .expect("acceptance succeeds")
    }
}

pub fn submit_dto() -> SubmitRequestDto {
    SubmitRequestDto {
        name: "Ali".to_string(),
        phone: "0501112222".to_string(),
        email: "ali@x.com".to_string(),
        city: "جده".to_string(),
        service_type: "مخيم".to_string(),
        people_count: Some(6),
        ..Default::default()
    }
}

pub fn offer_terms(price_total: f64) -> OfferTermsDto {
    OfferTermsDto {
        price_total: Some(price_total),
        meeting_location: Some("21.5,39.2".to_string()),
        price_notes: Some("includes firewood".to_string()),
        ..Default::default()
    }
}

pub fn tracking(status: &str, lat: Option<f64>, lng: Option<f64>) -> TrackingUpdateDto {
    TrackingUpdateDto {
        provider_status: Some(status.to_string()),
        lat,
        lng,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::{
        db::requestdb::RequestExt,
        models::requestmodel::{ProviderStatus, RequestStatus},
    };

    /// Submit, accept by provider 7, track, complete, then resubmit.
    #[tokio::test]
    async fn test_request_lifecycle_end_to_end() {
        let h = TestHarness::new();
        let now = Utc::now();
        h.store
            .insert_raw_provider(Provider {
                id: 7,
                name: "Najd Camps".to_string(),
                phone: "0549990007".to_string(),
                email: "najd@camps.test".to_string(),
                city: "جدة".to_string(),
                service_types: vec![ServiceType::Camp],
                status: ProviderApproval::Approved,
                password_hash: String::new(),
                created_at: now,
                updated_at: now,
            })
            .await;

        let submitted = h.dispatch.submit_request(submit_dto()).await.unwrap();
        assert!(submitted.created);
        assert_eq!(submitted.status, RequestStatus::Pending);
        assert!(h.mailer.recipients().contains(&"najd@camps.test".to_string()));

        let accepted = h.accept(&submitted.reference, 7).await;
        assert_eq!(accepted.status, RequestStatus::Approved);
        assert_eq!(accepted.provider.id, 7);
        assert!(accepted.price_total.is_some());

        let stored = h
            .store
            .get_request_by_ref(&submitted.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.provider_status, Some(ProviderStatus::Accepted));
        assert_eq!(stored.currency.as_deref(), Some("SAR"));
        assert_eq!(h.store.conversation_count().await, 1);

        let resubmitted = h.dispatch.submit_request(submit_dto()).await.unwrap();
        assert!(!resubmitted.created);
        assert_eq!(resubmitted.reference, submitted.reference);
        assert_eq!(h.store.request_count().await, 1);

        h.tracking
            .update_tracking(&submitted.reference, 7, tracking("en_route", Some(21.4), Some(39.1)))
            .await
            .unwrap();
        let route = h
            .tracking
            .refresh_route(CustomerLookupDto {
                reference: submitted.reference.clone(),
                contact: "ali@x.com".to_string(),
            })
            .await
            .unwrap();
        assert!(route.refreshed);

        let completed = h
            .completion
            .complete_request(CompleteRequestDto {
                reference: submitted.reference.clone(),
                contact: "0501112222".to_string(),
                rating: Some(json!(5)),
            })
            .await
            .unwrap();
        assert!(completed.completed);
        assert_eq!(completed.customer_rating, Some(5));

        // a completed request frees the contact for a new one
        let next = h.dispatch.submit_request(submit_dto()).await.unwrap();
        assert!(next.created);
        assert_ne!(next.reference, submitted.reference);
    }
}
