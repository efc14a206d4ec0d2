use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// Fine-grained fulfilment progress of an approved request.
///
/// Variants are declared in forward order; the derived `Ord` and the
/// Postgres enum ordering agree, so `a < b` means `a` comes earlier in a trip.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "provider_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Accepted,
    EnRoute,
    Arrived,
    InTrip,
    Completed,
}

impl ProviderStatus {
    pub const ALL: [ProviderStatus; 5] = [
        ProviderStatus::Accepted,
        ProviderStatus::EnRoute,
        ProviderStatus::Arrived,
        ProviderStatus::InTrip,
        ProviderStatus::Completed,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            ProviderStatus::Accepted => "accepted",
            ProviderStatus::EnRoute => "en_route",
            ProviderStatus::Arrived => "arrived",
            ProviderStatus::InTrip => "in_trip",
            ProviderStatus::Completed => "completed",
        }
    }

    /// Statuses that normally travel with a GPS fix.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            ProviderStatus::EnRoute | ProviderStatus::Arrived | ProviderStatus::InTrip
        )
    }
}

impl FromStr for ProviderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ProviderStatus::ALL
            .into_iter()
            .find(|status| status.to_str() == wanted)
            .ok_or_else(|| format!("Unknown provider status: {}", s.trim()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub fn to_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

/// The fixed list of outdoor services a request can ask for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "service_type")]
pub enum ServiceType {
    #[sqlx(rename = "مخيم")]
    #[serde(rename = "مخيم")]
    Camp,
    #[sqlx(rename = "رحلة برية")]
    #[serde(rename = "رحلة برية")]
    LandTrip,
    #[sqlx(rename = "كشتة")]
    #[serde(rename = "كشتة")]
    DayOuting,
    #[sqlx(rename = "سفاري")]
    #[serde(rename = "سفاري")]
    Safari,
    #[sqlx(rename = "هايكنج")]
    #[serde(rename = "هايكنج")]
    Hiking,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::Camp,
        ServiceType::LandTrip,
        ServiceType::DayOuting,
        ServiceType::Safari,
        ServiceType::Hiking,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            ServiceType::Camp => "مخيم",
            ServiceType::LandTrip => "رحلة برية",
            ServiceType::DayOuting => "كشتة",
            ServiceType::Safari => "سفاري",
            ServiceType::Hiking => "هايكنج",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ServiceType::ALL
            .into_iter()
            .find(|service| service.to_str() == trimmed)
            .ok_or_else(|| format!("Unknown service type: {}", trimmed))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "history_event", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HistoryEvent {
    Submitted,
    Accepted,
    Rejected,
    AdminRejected,
    TrackingChanged,
    Completed,
}

pub type Polyline = Vec<[f64; 2]>;

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct CustomerRequest {
    pub id: i64,
    #[sqlx(rename = "ref")]
    #[serde(rename = "ref")]
    pub reference: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub service_type: ServiceType,
    pub group_type: Option<String>,
    pub people_count: Option<i32>,
    pub cooking: bool,
    pub equipment: Vec<String>,
    pub notes: Option<String>,

    pub status: RequestStatus,
    pub completed: bool,

    pub accepted_provider_id: Option<i64>,
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

    pub provider_status: Option<ProviderStatus>,
    pub provider_current_lat: Option<f64>,
    pub provider_current_lng: Option<f64>,
    pub route_polyline: Option<Json<Polyline>>,
    pub eta_minutes: Option<i32>,
    pub route_updated_at: Option<DateTime<Utc>>,

    pub customer_rating: Option<i16>,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRequest {
    /// A contact still holding this request cannot open a new one.
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    pub fn is_accepted_by(&self, provider_id: i64) -> bool {
        self.accepted_provider_id == Some(provider_id)
    }
}

/// Validated and normalized facts for a new request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub service_type: ServiceType,
    pub group_type: Option<String>,
    pub people_count: Option<i32>,
    pub cooking: bool,
    pub equipment: Vec<String>,
    pub notes: Option<String>,
}

/// Everything written by a successful acceptance, as one unit.
#[derive(Debug, Clone)]
pub struct AcceptedOffer {
    pub provider_id: i64,
    pub provider_name: String,
    pub provider_phone: String,
    pub provider_email: String,
    pub price_total: Option<BigDecimal>,
    pub currency: String,
    pub price_notes: Option<String>,
    pub meeting_location: Option<String>,
    pub meeting_point: Option<(f64, f64)>,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<String>,
}

/// What a tracking ping is allowed to persist after validation.
#[derive(Debug, Clone)]
pub struct TrackingWrite {
    pub provider_status: ProviderStatus,
    pub position: Option<(f64, f64)>,
    pub route: Option<(Polyline, i32)>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct StatusHistory {
    pub id: i64,
    #[sqlx(rename = "ref")]
    #[serde(rename = "ref")]
    pub reference: String,
    pub event: HistoryEvent,
    pub provider_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct ProviderResponse {
    pub id: i64,
    #[sqlx(rename = "ref")]
    #[serde(rename = "ref")]
    pub reference: String,
    pub provider_id: i64,
    pub accepted: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct MailLog {
    pub id: i64,
    #[sqlx(rename = "ref")]
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub kind: String,
    pub recipient: String,
    pub ok: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
