// db/memory.rs
//
// In-memory store for engine tests. One mutex serialises every call, and each
// method mirrors the conditional semantics of its SQL counterpart.
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, Error};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    activitydb::ActivityExt,
    chatdb::ChatExt,
    providerdb::ProviderExt,
    requestdb::{effective_provider_status, RequestExt, TrackingOutcome},
};
use crate::models::{chatmodels::*, providermodel::*, requestmodel::*};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    requests: Vec<CustomerRequest>,
    providers: Vec<Provider>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    history: Vec<StatusHistory>,
    responses: Vec<ProviderResponse>,
    mail: Vec<MailLog>,
    ratings: Vec<(String, i64, i16)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_history(
        &mut self,
        reference: &str,
        event: HistoryEvent,
        provider_id: Option<i64>,
        note: Option<String>,
    ) {
        let id = self.next_id();
        self.history.push(StatusHistory {
            id,
            reference: reference.to_string(),
            event,
            provider_id,
            note,
            created_at: Utc::now(),
        });
    }

    fn request_mut(&mut self, reference: &str) -> Option<&mut CustomerRequest> {
        self.requests.iter_mut().find(|r| r.reference == reference)
    }

    fn conversation_for(&mut self, request_id: i64) -> Conversation {
        if let Some(existing) = self.conversations.iter().find(|c| c.request_id == request_id) {
            return existing.clone();
        }
        let conversation = Conversation {
            id: Uuid::new_v4(),
            request_id,
            created_at: Utc::now(),
        };
        self.conversations.push(conversation.clone());
        conversation
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail like a lost connection.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::PoolTimedOut);
        }
        Ok(())
    }

    pub async fn insert_provider(
        &self,
        name: &str,
        phone: &str,
        email: &str,
        city: &str,
        services: &[ServiceType],
        status: ProviderApproval,
    ) -> Provider {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = Utc::now();
        let provider = Provider {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            city: city.to_string(),
            service_types: services.to_vec(),
            status,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        state.providers.push(provider.clone());
        provider
    }

    /// Seeds a provider under a fixed id.
    pub async fn insert_raw_provider(&self, provider: Provider) {
        self.state.lock().await.providers.push(provider);
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    pub async fn conversation_count(&self) -> usize {
        self.state.lock().await.conversations.len()
    }

    pub async fn ratings(&self) -> Vec<(String, i64, i16)> {
        self.state.lock().await.ratings.clone()
    }
}

#[async_trait]
impl RequestExt for MemoryStore {
    async fn insert_request(
        &self,
        reference: &str,
        request: &NewRequest,
    ) -> Result<Option<CustomerRequest>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        let conflict = state.requests.iter().any(|r| {
            r.reference == reference
                || (r.is_active() && (r.phone == request.phone || r.email == request.email))
        });
        if conflict {
            return Ok(None);
        }

        let id = state.next_id();
        let now = Utc::now();
        let row = CustomerRequest {
            id,
            reference: reference.to_string(),
            name: request.name.clone(),
            phone: request.phone.clone(),
            email: request.email.clone(),
            city: request.city.clone(),
            service_type: request.service_type,
            group_type: request.group_type.clone(),
            people_count: request.people_count,
            cooking: request.cooking,
            equipment: request.equipment.clone(),
            notes: request.notes.clone(),
            status: RequestStatus::Pending,
            completed: false,
            accepted_provider_id: None,
            provider_name: None,
            provider_phone: None,
            provider_email: None,
            price_total: None,
            currency: None,
            price_notes: None,
            meeting_location: None,
            meeting_lat: None,
            meeting_lng: None,
            payment_method: None,
            payment_details: None,
            accepted_at: None,
            provider_status: None,
            provider_current_lat: None,
            provider_current_lng: None,
            route_polyline: None,
            eta_minutes: None,
            route_updated_at: None,
            customer_rating: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.requests.push(row.clone());
        state.push_history(
            reference,
            HistoryEvent::Submitted,
            None,
            Some(request.service_type.to_str().to_string()),
        );
        Ok(Some(row))
    }

    async fn get_request_by_ref(&self, reference: &str) -> Result<Option<CustomerRequest>, Error> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.reference == reference).cloned())
    }

    async fn find_active_request_by_contact(
        &self,
        phone: &str,
        email: &str,
    ) -> Result<Option<CustomerRequest>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .find(|r| r.is_active() && (r.phone == phone || r.email == email))
            .cloned())
    }

    async fn accept_request(
        &self,
        reference: &str,
        offer: &AcceptedOffer,
    ) -> Result<Option<(CustomerRequest, Conversation)>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        let Some(row) = state.request_mut(reference) else {
            return Ok(None);
        };
        if row.status != RequestStatus::Pending || row.completed {
            return Ok(None);
        }

        let now = Utc::now();
        row.status = RequestStatus::Approved;
        row.accepted_provider_id = Some(offer.provider_id);
        row.provider_name = Some(offer.provider_name.clone());
        row.provider_phone = Some(offer.provider_phone.clone());
        row.provider_email = Some(offer.provider_email.clone());
        row.price_total = offer.price_total.clone();
        row.currency = Some(offer.currency.clone());
        row.price_notes = offer.price_notes.clone();
        row.meeting_location = offer.meeting_location.clone();
        row.meeting_lat = offer.meeting_point.map(|(lat, _)| lat);
        row.meeting_lng = offer.meeting_point.map(|(_, lng)| lng);
        row.payment_method = Some(offer.payment_method);
        row.payment_details = offer.payment_details.clone();
        row.provider_status = Some(ProviderStatus::Accepted);
        row.accepted_at = Some(now);
        row.updated_at = now;
        let accepted = row.clone();

        let conversation = state.conversation_for(accepted.id);
        let id = state.next_id();
        state.responses.push(ProviderResponse {
            id,
            reference: reference.to_string(),
            provider_id: offer.provider_id,
            accepted: true,
            reason: None,
            created_at: now,
        });
        state.push_history(
            reference,
            HistoryEvent::Accepted,
            Some(offer.provider_id),
            offer
                .price_total
                .as_ref()
                .map(|p| format!("{} {}", p, offer.currency)),
        );

        Ok(Some((accepted, conversation)))
    }

    async fn admin_reject_request(
        &self,
        reference: &str,
        note: Option<&str>,
    ) -> Result<Option<CustomerRequest>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        let Some(row) = state.request_mut(reference) else {
            return Ok(None);
        };
        if row.status != RequestStatus::Pending || row.completed {
            return Ok(None);
        }
        row.status = RequestStatus::Rejected;
        row.updated_at = Utc::now();
        let rejected = row.clone();

        state.push_history(
            reference,
            HistoryEvent::AdminRejected,
            None,
            note.map(str::to_string),
        );
        Ok(Some(rejected))
    }

    async fn update_tracking(
        &self,
        reference: &str,
        provider_id: i64,
        update: &TrackingWrite,
    ) -> Result<Option<TrackingOutcome>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        let Some(row) = state.request_mut(reference) else {
            return Ok(None);
        };
        if row.accepted_provider_id != Some(provider_id)
            || row.status != RequestStatus::Approved
            || row.completed
        {
            return Ok(None);
        }

        let previous_status = row.provider_status;
        let status = effective_provider_status(previous_status, update.provider_status);
        let now = Utc::now();

        row.provider_status = Some(status);
        if let Some((lat, lng)) = update.position {
            row.provider_current_lat = Some(lat);
            row.provider_current_lng = Some(lng);
        }
        if let Some((polyline, eta)) = &update.route {
            row.route_polyline = Some(Json(polyline.clone()));
            row.eta_minutes = Some(*eta);
            row.route_updated_at = Some(now);
        }
        row.updated_at = now;
        let request = row.clone();

        if previous_status != Some(status) {
            state.push_history(
                reference,
                HistoryEvent::TrackingChanged,
                Some(provider_id),
                Some(status.to_str().to_string()),
            );
        }

        Ok(Some(TrackingOutcome {
            request,
            previous_status,
        }))
    }

    async fn save_route(
        &self,
        reference: &str,
        polyline: &Polyline,
        eta_minutes: i32,
    ) -> Result<(), Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        if let Some(row) = state.request_mut(reference) {
            if row.status == RequestStatus::Approved {
                let now = Utc::now();
                row.route_polyline = Some(Json(polyline.clone()));
                row.eta_minutes = Some(eta_minutes);
                row.route_updated_at = Some(now);
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn save_meeting_point(&self, reference: &str, lat: f64, lng: f64) -> Result<(), Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        if let Some(row) = state.request_mut(reference) {
            if row.meeting_lat.is_none() {
                row.meeting_lat = Some(lat);
                row.meeting_lng = Some(lng);
            }
        }
        Ok(())
    }

    async fn complete_request(
        &self,
        reference: &str,
        rating: Option<i16>,
    ) -> Result<Option<CustomerRequest>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        let Some(row) = state.request_mut(reference) else {
            return Ok(None);
        };
        if row.completed || row.status != RequestStatus::Approved {
            return Ok(None);
        }

        let now = Utc::now();
        row.completed = true;
        row.customer_rating = row.customer_rating.or(rating);
        row.completed_at = Some(now);
        row.updated_at = now;
        let completed = row.clone();

        if let (Some(rating), Some(provider_id)) =
            (completed.customer_rating, completed.accepted_provider_id)
        {
            if !state.ratings.iter().any(|(r, _, _)| r == reference) {
                state.ratings.push((reference.to_string(), provider_id, rating));
            }
        }
        state.push_history(
            reference,
            HistoryEvent::Completed,
            completed.accepted_provider_id,
            completed.customer_rating.map(|r| format!("rating {}", r)),
        );

        Ok(Some(completed))
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_open_requests_for(
        &self,
        cities: &[String],
        services: &[ServiceType],
        limit: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .rev()
            .filter(|r| {
                r.status == RequestStatus::Pending
                    && !r.completed
                    && cities.contains(&r.city)
                    && services.contains(&r.service_type)
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_provider_active_requests(
        &self,
        provider_id: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| {
                r.accepted_provider_id == Some(provider_id)
                    && r.status == RequestStatus::Approved
                    && !r.completed
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProviderExt for MemoryStore {
    async fn create_provider(&self, provider: &NewProvider) -> Result<Option<Provider>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;

        if state
            .providers
            .iter()
            .any(|p| p.phone == provider.phone || p.email == provider.email)
        {
            return Ok(None);
        }

        let id = state.next_id();
        let now = Utc::now();
        let created = Provider {
            id,
            name: provider.name.clone(),
            phone: provider.phone.clone(),
            email: provider.email.clone(),
            city: provider.city.clone(),
            service_types: provider.service_types.as_slice().to_vec(),
            status: ProviderApproval::Pending,
            password_hash: provider.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        state.providers.push(created.clone());
        Ok(Some(created))
    }

    async fn get_provider(&self, provider_id: i64) -> Result<Option<Provider>, Error> {
        let state = self.state.lock().await;
        Ok(state.providers.iter().find(|p| p.id == provider_id).cloned())
    }

    async fn get_provider_by_login(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Provider>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .providers
            .iter()
            .find(|p| phone == Some(p.phone.as_str()) || email == Some(p.email.as_str()))
            .cloned())
    }

    async fn find_eligible_providers(
        &self,
        cities: &[String],
        service: ServiceType,
    ) -> Result<Vec<Provider>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .providers
            .iter()
            .filter(|p| p.is_approved() && cities.contains(&p.city) && p.serves(service))
            .cloned()
            .collect())
    }

    async fn update_provider_status(
        &self,
        provider_id: i64,
        status: ProviderApproval,
    ) -> Result<Option<Provider>, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let Some(provider) = state.providers.iter_mut().find(|p| p.id == provider_id) else {
            return Ok(None);
        };
        provider.status = status;
        provider.updated_at = Utc::now();
        Ok(Some(provider.clone()))
    }
}

#[async_trait]
impl ChatExt for MemoryStore {
    async fn get_or_create_conversation(&self, request_id: i64) -> Result<Conversation, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        Ok(state.conversation_for(request_id))
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned())
    }

    async fn find_conversation_for_request(
        &self,
        request_id: i64,
    ) -> Result<Option<Conversation>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .conversations
            .iter()
            .find(|c| c.request_id == request_id)
            .cloned())
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_role: SenderRole,
        media_type: MediaType,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<Message, Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_role,
            media_type,
            content: content.to_string(),
            media_url: media_url.map(str::to_string),
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| since.map_or(true, |s| m.created_at > s))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActivityExt for MemoryStore {
    async fn record_provider_rejection(
        &self,
        reference: &str,
        provider_id: i64,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.responses.push(ProviderResponse {
            id,
            reference: reference.to_string(),
            provider_id,
            accepted: false,
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        });
        state.push_history(
            reference,
            HistoryEvent::Rejected,
            Some(provider_id),
            reason.map(str::to_string),
        );
        Ok(())
    }

    async fn log_mail_attempt(
        &self,
        reference: Option<&str>,
        kind: &str,
        recipient: &str,
        ok: bool,
        error: Option<&str>,
    ) -> Result<(), Error> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.mail.push(MailLog {
            id,
            reference: reference.map(str::to_string),
            kind: kind.to_string(),
            recipient: recipient.to_string(),
            ok,
            error: error.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_status_history(&self, reference: &str) -> Result<Vec<StatusHistory>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|h| h.reference == reference)
            .cloned()
            .collect())
    }

    async fn get_provider_responses(&self, reference: &str) -> Result<Vec<ProviderResponse>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.reference == reference)
            .cloned()
            .collect())
    }

    async fn get_mail_log(&self, reference: &str) -> Result<Vec<MailLog>, Error> {
        let state = self.state.lock().await;
        Ok(state
            .mail
            .iter()
            .filter(|m| m.reference.as_deref() == Some(reference))
            .cloned()
            .collect())
    }
}
