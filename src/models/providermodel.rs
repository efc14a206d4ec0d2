use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::requestmodel::ServiceType;

pub const MAX_PROVIDER_SERVICES: usize = 3;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "provider_approval", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderApproval {
    Pending,
    Approved,
    Rejected,
}

impl ProviderApproval {
    pub fn to_str(&self) -> &'static str {
        match self {
            ProviderApproval::Pending => "pending",
            ProviderApproval::Approved => "approved",
            ProviderApproval::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub service_types: Vec<ServiceType>,
    pub status: ProviderApproval,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn is_approved(&self) -> bool {
        self.status == ProviderApproval::Approved
    }

    pub fn serves(&self, service: ServiceType) -> bool {
        self.service_types.contains(&service)
    }
}

/// One to three distinct services, in the order the provider listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceList(Vec<ServiceType>);

impl ServiceList {
    pub fn new(services: Vec<ServiceType>) -> Result<Self, String> {
        let mut list: Vec<ServiceType> = Vec::with_capacity(services.len());
        for service in services {
            if !list.contains(&service) {
                list.push(service);
            }
        }

        if list.is_empty() {
            return Err("At least one service type is required".to_string());
        }
        if list.len() > MAX_PROVIDER_SERVICES {
            return Err(format!(
                "A provider can offer at most {} service types",
                MAX_PROVIDER_SERVICES
            ));
        }

        Ok(Self(list))
    }

    pub fn as_slice(&self) -> &[ServiceType] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub service_types: ServiceList,
    pub password_hash: String,
}
