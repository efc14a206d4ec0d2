use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::requestmodel::*,
    utils::geo::Coordinates,
};

// Customer submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmitRequestDto {
    #[serde(default)]
    #[validate(length(max = 120, message = "Name must be at most 120 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 80, message = "City must be at most 80 characters"))]
    pub city: String,

    #[serde(default)]
    pub service_type: String,

    #[validate(length(max = 60, message = "Group type must be at most 60 characters"))]
    pub group_type: Option<String>,

    #[validate(range(min = 1, max = 500, message = "People count must be between 1 and 500"))]
    pub people_count: Option<i32>,

    #[serde(default)]
    pub cooking: bool,

    #[serde(default)]
    #[validate(length(max = 30, message = "At most 30 equipment items"))]
    pub equipment: Vec<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl SubmitRequestDto {
    pub const FIELD_ORDER: &'static [&'static str] = &[
        "name",
        "phone",
        "email",
        "city",
        "service_type",
        "group_type",
        "people_count",
        "equipment",
        "notes",
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub created: bool,
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: RequestStatus,
    pub completed: bool,
}

/// `ref` + contact, used by every customer-side lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerLookupDto {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequestDto {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub contact: String,
    /// Kept loose so that `4.5` or `"five"` surface as `invalid_rating`.
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    #[serde(rename = "ref")]
    pub reference: String,
    pub completed: bool,
    pub updated: bool,
    pub customer_rating: Option<i16>,
}

// Offers
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct OfferTermsDto {
    pub price_total: Option<f64>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(length(max = 500, message = "Price notes must be at most 500 characters"))]
    pub price_notes: Option<String>,

    #[validate(length(max = 300, message = "Meeting location must be at most 300 characters"))]
    pub meeting_location: Option<String>,

    pub payment_method: Option<PaymentMethod>,

    #[validate(length(max = 500, message = "Payment details must be at most 500 characters"))]
    pub payment_details: Option<String>,
}

impl OfferTermsDto {
    pub const FIELD_ORDER: &'static [&'static str] = &[
        "price_total",
        "currency",
        "price_notes",
        "meeting_location",
        "payment_details",
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminAcceptDto {
    pub provider_id: Option<i64>,
    #[serde(flatten)]
    pub terms: OfferTermsDto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RejectOfferDto {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AdminRejectDto {
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSnapshotDto {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptOutcome {
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: RequestStatus,
    pub provider: ProviderSnapshotDto,
    pub price_total: Option<BigDecimal>,
    pub currency: Option<String>,
    pub price_notes: Option<String>,
    pub meeting_location: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: Option<String>,
    pub conversation_id: Uuid,
}

// Tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingUpdateDto {
    pub provider_status: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub polyline: Option<Vec<[f64; 2]>>,
    pub eta_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingUpdateOutcome {
    #[serde(rename = "ref")]
    pub reference: String,
    pub provider_status: ProviderStatus,
    /// `false` when the requested status would have moved backwards.
    pub applied: bool,
    pub position_saved: bool,
    pub route_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteView {
    pub refreshed: bool,
    pub polyline: Option<Polyline>,
    pub eta_minutes: Option<i32>,
    pub destination: Option<Coordinates>,
}

// Status view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferView {
    pub provider_id: Option<i64>,
    pub provider_name: Option<String>,
    pub provider_phone: Option<String>,
    pub provider_email: Option<String>,
    pub price_total: Option<BigDecimal>,
    pub currency: Option<String>,
    pub price_notes: Option<String>,
    pub meeting_location: Option<String>,
    pub meeting_lat: Option<f64>,
    pub meeting_lng: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingView {
    pub provider_status: Option<ProviderStatus>,
    pub provider_current_lat: Option<f64>,
    pub provider_current_lng: Option<f64>,
    pub route_polyline: Option<Polyline>,
    pub eta_minutes: Option<i32>,
    pub route_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStatusView {
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: RequestStatus,
    pub completed: bool,
    pub city: String,
    pub service_type: ServiceType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub offer: Option<OfferView>,
    pub tracking: Option<TrackingView>,
    pub conversation_id: Option<Uuid>,
    pub customer_rating: Option<i16>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestStatusView {
    pub fn from_request(request: &CustomerRequest, conversation_id: Option<Uuid>) -> Self {
        let offer = (request.status == RequestStatus::Approved).then(|| OfferView {
            provider_id: request.accepted_provider_id,
            provider_name: request.provider_name.clone(),
            provider_phone: request.provider_phone.clone(),
            provider_email: request.provider_email.clone(),
            price_total: request.price_total.clone(),
            currency: request.currency.clone(),
            price_notes: request.price_notes.clone(),
            meeting_location: request.meeting_location.clone(),
            meeting_lat: request.meeting_lat,
            meeting_lng: request.meeting_lng,
            payment_method: request.payment_method,
            payment_details: request.payment_details.clone(),
            accepted_at: request.accepted_at,
        });

        let tracking = request.provider_status.map(|status| TrackingView {
            provider_status: Some(status),
            provider_current_lat: request.provider_current_lat,
            provider_current_lng: request.provider_current_lng,
            route_polyline: request.route_polyline.as_ref().map(|p| p.0.clone()),
            eta_minutes: request.eta_minutes,
            route_updated_at: request.route_updated_at,
        });

        Self {
            reference: request.reference.clone(),
            status: request.status,
            completed: request.completed,
            city: request.city.clone(),
            service_type: request.service_type,
            created_at: request.created_at,
            updated_at: request.updated_at,
            offer,
            tracking,
            conversation_id,
            customer_rating: request.customer_rating,
            completed_at: request.completed_at,
        }
    }
}

// Admin
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,

    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHistoryView {
    pub request: CustomerRequest,
    pub history: Vec<StatusHistory>,
    pub provider_responses: Vec<ProviderResponse>,
    pub mail_log: Vec<MailLog>,
}

/// A provider's dashboard: open matches plus trips they are running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDashboard {
    pub open_requests: Vec<OpenRequestView>,
    pub active_requests: Vec<CustomerRequest>,
}

/// An open request as seen by a provider: no customer contact until accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRequestView {
    #[serde(rename = "ref")]
    pub reference: String,
    pub city: String,
    pub service_type: ServiceType,
    pub group_type: Option<String>,
    pub people_count: Option<i32>,
    pub cooking: bool,
    pub equipment: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CustomerRequest> for OpenRequestView {
    fn from(request: &CustomerRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            city: request.city.clone(),
            service_type: request.service_type,
            group_type: request.group_type.clone(),
            people_count: request.people_count,
            cooking: request.cooking,
            equipment: request.equipment.clone(),
            notes: request.notes.clone(),
            created_at: request.created_at,
        }
    }
}
