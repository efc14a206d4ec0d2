// service/lookup.rs
use crate::{
    db::store::Store,
    models::requestmodel::CustomerRequest,
    service::error::{DbContext, ServiceError},
    utils::{contact::ContactKey, reference::normalize_ref},
};

/// Resolves a request for a customer who proves ownership with the stored
/// phone or email.
pub async fn request_for_contact(
    db_client: &dyn Store,
    reference: &str,
    contact: &str,
) -> Result<CustomerRequest, ServiceError> {
    let reference = normalize_ref(reference);
    if reference.is_empty() {
        return Err(ServiceError::MissingRef);
    }
    if contact.trim().is_empty() {
        return Err(ServiceError::MissingContact);
    }
    let contact = ContactKey::parse(contact).ok_or(ServiceError::InvalidField("contact"))?;

    let request = db_client
        .get_request_by_ref(&reference)
        .await
        .db("db_read_failed")?
        .ok_or(ServiceError::NotFound("Request"))?;

    if !contact.matches(&request.phone, &request.email) {
        tracing::warn!("Contact mismatch on request {}", reference);
        return Err(ServiceError::ContactMismatch);
    }

    Ok(request)
}

/// Plain lookup by ref for provider and admin paths.
pub async fn request_by_ref(
    db_client: &dyn Store,
    reference: &str,
) -> Result<CustomerRequest, ServiceError> {
    db_client
        .get_request_by_ref(reference)
        .await
        .db("db_read_failed")?
        .ok_or(ServiceError::NotFound("Request"))
}
