// service/completion_service.rs
use std::sync::Arc;

use serde_json::Value;

use crate::{
    db::{chatdb::ChatExt, store::Store},
    dtos::requestdtos::*,
    models::requestmodel::{CustomerRequest, RequestStatus},
    service::{
        error::{DbContext, ServiceError},
        lookup::{request_by_ref, request_for_contact},
    },
};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Accepts whole numbers in range, including `5.0` and `"5"` from loose
/// clients. `null` means no rating.
fn parse_rating(raw: Option<&Value>) -> Result<Option<i16>, ServiceError> {
    let invalid = ServiceError::InvalidField("rating");
    let value = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e6 => f as i64,
            _ => return Err(invalid),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid)?,
        Some(_) => return Err(invalid),
    };

    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(ServiceError::InvalidField("rating"));
    }
    Ok(Some(value as i16))
}

fn completed_outcome(request: &CustomerRequest, updated: bool) -> CompletionOutcome {
    CompletionOutcome {
        reference: request.reference.clone(),
        completed: request.completed,
        updated,
        customer_rating: request.customer_rating,
    }
}

#[derive(Debug, Clone)]
pub struct CompletionService {
    db_client: Arc<dyn Store>,
}

impl CompletionService {
    pub fn new(db_client: Arc<dyn Store>) -> Self {
        Self { db_client }
    }

    pub async fn get_status(
        &self,
        lookup: CustomerLookupDto,
    ) -> Result<RequestStatusView, ServiceError> {
        let request =
            request_for_contact(self.db_client.as_ref(), &lookup.reference, &lookup.contact).await?;

        let conversation_id = match request.accepted_provider_id {
            Some(_) => self
                .db_client
                .find_conversation_for_request(request.id)
                .await
                .db("db_read_failed")?
                .map(|c| c.id),
            None => None,
        };

        Ok(RequestStatusView::from_request(&request, conversation_id))
    }

    /// Idempotent: a second call reports `updated=false` and never replaces
    /// the first rating.
    pub async fn complete_request(
        &self,
        body: CompleteRequestDto,
    ) -> Result<CompletionOutcome, ServiceError> {
        let request =
            request_for_contact(self.db_client.as_ref(), &body.reference, &body.contact).await?;

        // terminal states answer before the rating is looked at
        if request.completed {
            return Ok(completed_outcome(&request, false));
        }
        if request.status == RequestStatus::Rejected {
            return Err(ServiceError::CannotCompleteRejected);
        }

        let rating = parse_rating(body.rating.as_ref())?;
        if request.status == RequestStatus::Pending {
            return Err(ServiceError::NotApproved(request.reference));
        }

        let completed = self
            .db_client
            .complete_request(&request.reference, rating)
            .await
            .db("db_update_failed")?;

        match completed {
            Some(completed) => {
                tracing::info!(
                    "Request {} completed (rating: {:?})",
                    completed.reference,
                    completed.customer_rating
                );
                Ok(completed_outcome(&completed, true))
            }
            None => {
                // lost a race with another completion or an admin reject
                let current = request_by_ref(self.db_client.as_ref(), &request.reference).await?;
                if current.completed {
                    Ok(completed_outcome(&current, false))
                } else if current.status == RequestStatus::Rejected {
                    Err(ServiceError::CannotCompleteRejected)
                } else {
                    Err(ServiceError::NotApproved(current.reference))
                }
            }
        }
    }
}
