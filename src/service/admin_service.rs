// service/admin_service.rs
use std::sync::Arc;

use validator::Validate;

use crate::{
    db::{activitydb::ActivityExt, store::Store},
    dtos::requestdtos::*,
    models::requestmodel::CustomerRequest,
    service::{
        error::{DbContext, ServiceError},
        lookup::request_by_ref,
    },
    utils::reference::normalize_ref,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct AdminService {
    db_client: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(db_client: Arc<dyn Store>) -> Self {
        Self { db_client }
    }

    /// Newest first.
    pub async fn list_requests(
        &self,
        query: ListRequestsQuery,
    ) -> Result<Vec<CustomerRequest>, ServiceError> {
        query.validate().map_err(|e| {
            if e.field_errors().contains_key("page") {
                ServiceError::InvalidField("page")
            } else {
                ServiceError::InvalidField("limit")
            }
        })?;

        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = (page - 1) as i64 * limit as i64;

        self.db_client
            .list_requests(query.status, limit as i64, offset)
            .await
            .db("db_read_failed")
    }

    /// Everything that happened to one request, for support and audits.
    pub async fn request_history(&self, reference: &str) -> Result<RequestHistoryView, ServiceError> {
        let reference = normalize_ref(reference);
        if reference.is_empty() {
            return Err(ServiceError::MissingRef);
        }
        let request = request_by_ref(self.db_client.as_ref(), &reference).await?;

        let (history, provider_responses, mail_log) = tokio::try_join!(
            self.db_client.get_status_history(&reference),
            self.db_client.get_provider_responses(&reference),
            self.db_client.get_mail_log(&reference),
        )
        .db("db_read_failed")?;

        Ok(RequestHistoryView {
            request,
            history,
            provider_responses,
            mail_log,
        })
    }
}
