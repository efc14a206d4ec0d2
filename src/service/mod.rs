pub mod admin_service;
pub mod chat_service;
pub mod completion_service;
pub mod dispatch_service;
pub mod error;
pub mod lookup;
pub mod notification_service;
pub mod offer_service;
pub mod provider_service;
pub mod route_provider;
pub mod tracking_service;

#[cfg(test)]
pub mod testing;
