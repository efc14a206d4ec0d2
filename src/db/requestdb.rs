// db/requestdb.rs
use async_trait::async_trait;
use sqlx::{types::Json, Error};

use super::db::DBClient;
use crate::models::{chatmodels::Conversation, requestmodel::*};

/// Result of a tracking write: the row after the write and the tracking
/// status it held before.
#[derive(Debug, Clone)]
pub struct TrackingOutcome {
    pub request: CustomerRequest,
    pub previous_status: Option<ProviderStatus>,
}

/// Forward-only merge: a regression keeps the stored status.
pub fn effective_provider_status(
    previous: Option<ProviderStatus>,
    requested: ProviderStatus,
) -> ProviderStatus {
    match previous {
        Some(current) if requested < current => current,
        _ => requested,
    }
}

#[async_trait]
pub trait RequestExt {
    /// Inserts a `pending` request. `None` means a unique index refused the
    /// row: either the ref is taken or the contact already has an active
    /// request.
    async fn insert_request(
        &self,
        reference: &str,
        request: &NewRequest,
    ) -> Result<Option<CustomerRequest>, Error>;

    async fn get_request_by_ref(&self, reference: &str) -> Result<Option<CustomerRequest>, Error>;

    async fn find_active_request_by_contact(
        &self,
        phone: &str,
        email: &str,
    ) -> Result<Option<CustomerRequest>, Error>;

    /// `pending → approved` with the offer, conversation and audit rows in
    /// one transaction. `None` when the request was no longer pending.
    async fn accept_request(
        &self,
        reference: &str,
        offer: &AcceptedOffer,
    ) -> Result<Option<(CustomerRequest, Conversation)>, Error>;

    async fn admin_reject_request(
        &self,
        reference: &str,
        note: Option<&str>,
    ) -> Result<Option<CustomerRequest>, Error>;

    /// `None` unless `provider_id` is the accepted provider of an approved,
    /// not yet completed request.
    async fn update_tracking(
        &self,
        reference: &str,
        provider_id: i64,
        update: &TrackingWrite,
    ) -> Result<Option<TrackingOutcome>, Error>;

    async fn save_route(
        &self,
        reference: &str,
        polyline: &Polyline,
        eta_minutes: i32,
    ) -> Result<(), Error>;

    /// Caches a resolved meeting point; the first stored point wins.
    async fn save_meeting_point(&self, reference: &str, lat: f64, lng: f64) -> Result<(), Error>;

    /// Marks an approved request completed. `None` when it was already
    /// completed or is not approved.
    async fn complete_request(
        &self,
        reference: &str,
        rating: Option<i16>,
    ) -> Result<Option<CustomerRequest>, Error>;

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CustomerRequest>, Error>;

    async fn list_open_requests_for(
        &self,
        cities: &[String],
        services: &[ServiceType],
        limit: i64,
    ) -> Result<Vec<CustomerRequest>, Error>;

    async fn list_provider_active_requests(
        &self,
        provider_id: i64,
    ) -> Result<Vec<CustomerRequest>, Error>;
}

#[async_trait]
impl RequestExt for DBClient {
    async fn insert_request(
        &self,
        reference: &str,
        request: &NewRequest,
    ) -> Result<Option<CustomerRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, CustomerRequest>(
            r#"
            INSERT INTO customer_requests
                (ref, name, phone, email, city, service_type, group_type,
                 people_count, cooking, equipment, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.city)
        .bind(request.service_type)
        .bind(&request.group_type)
        .bind(request.people_count)
        .bind(request.cooking)
        .bind(&request.equipment)
        .bind(&request.notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(inserted) = inserted else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO status_history (ref, event, note)
            VALUES ($1, 'submitted', $2)
            "#,
        )
        .bind(reference)
        .bind(request.service_type.to_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(inserted))
    }

    async fn get_request_by_ref(&self, reference: &str) -> Result<Option<CustomerRequest>, Error> {
        sqlx::query_as::<_, CustomerRequest>(
            r#"
            SELECT * FROM customer_requests WHERE ref = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_active_request_by_contact(
        &self,
        phone: &str,
        email: &str,
    ) -> Result<Option<CustomerRequest>, Error> {
        sqlx::query_as::<_, CustomerRequest>(
            r#"
            SELECT * FROM customer_requests
            WHERE (phone = $1 OR email = $2) AND NOT completed
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(phone)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn accept_request(
        &self,
        reference: &str,
        offer: &AcceptedOffer,
    ) -> Result<Option<(CustomerRequest, Conversation)>, Error> {
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query_as::<_, CustomerRequest>(
            r#"
            UPDATE customer_requests
            SET status = 'approved',
                accepted_provider_id = $2,
                provider_name = $3,
                provider_phone = $4,
                provider_email = $5,
                price_total = $6,
                currency = $7,
                price_notes = $8,
                meeting_location = $9,
                meeting_lat = $10,
                meeting_lng = $11,
                payment_method = $12,
                payment_details = $13,
                provider_status = 'accepted',
                accepted_at = NOW(),
                updated_at = NOW()
            WHERE ref = $1 AND status = 'pending' AND NOT completed
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(offer.provider_id)
        .bind(&offer.provider_name)
        .bind(&offer.provider_phone)
        .bind(&offer.provider_email)
        .bind(offer.price_total.clone())
        .bind(&offer.currency)
        .bind(&offer.price_notes)
        .bind(&offer.meeting_location)
        .bind(offer.meeting_point.map(|(lat, _)| lat))
        .bind(offer.meeting_point.map(|(_, lng)| lng))
        .bind(offer.payment_method)
        .bind(&offer.payment_details)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(accepted) = accepted else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO conversations (request_id)
            VALUES ($1)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(accepted.id)
        .execute(&mut *tx)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, request_id, created_at
            FROM conversations
            WHERE request_id = $1
            "#,
        )
        .bind(accepted.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO provider_responses (ref, provider_id, accepted)
            VALUES ($1, $2, TRUE)
            "#,
        )
        .bind(reference)
        .bind(offer.provider_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO status_history (ref, event, provider_id, note)
            VALUES ($1, 'accepted', $2, $3)
            "#,
        )
        .bind(reference)
        .bind(offer.provider_id)
        .bind(offer.price_total.as_ref().map(|p| format!("{} {}", p, offer.currency)))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((accepted, conversation)))
    }

    async fn admin_reject_request(
        &self,
        reference: &str,
        note: Option<&str>,
    ) -> Result<Option<CustomerRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let rejected = sqlx::query_as::<_, CustomerRequest>(
            r#"
            UPDATE customer_requests
            SET status = 'rejected', updated_at = NOW()
            WHERE ref = $1 AND status = 'pending' AND NOT completed
            RETURNING *
            "#,
        )
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(rejected) = rejected else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO status_history (ref, event, note)
            VALUES ($1, 'admin_rejected', $2)
            "#,
        )
        .bind(reference)
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(rejected))
    }

    async fn update_tracking(
        &self,
        reference: &str,
        provider_id: i64,
        update: &TrackingWrite,
    ) -> Result<Option<TrackingOutcome>, Error> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<ProviderStatus>>(
            r#"
            SELECT provider_status
            FROM customer_requests
            WHERE ref = $1 AND accepted_provider_id = $2
              AND status = 'approved' AND NOT completed
            FOR UPDATE
            "#,
        )
        .bind(reference)
        .bind(provider_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous_status) = previous else {
            return Ok(None);
        };

        let status = effective_provider_status(previous_status, update.provider_status);
        let route = update
            .route
            .as_ref()
            .map(|(polyline, eta)| (Json(polyline.clone()), *eta));

        let request = sqlx::query_as::<_, CustomerRequest>(
            r#"
            UPDATE customer_requests
            SET provider_status = $2,
                provider_current_lat = COALESCE($3, provider_current_lat),
                provider_current_lng = COALESCE($4, provider_current_lng),
                route_polyline = COALESCE($5, route_polyline),
                eta_minutes = COALESCE($6, eta_minutes),
                route_updated_at = CASE WHEN $5::jsonb IS NULL THEN route_updated_at ELSE NOW() END,
                updated_at = NOW()
            WHERE ref = $1
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(status)
        .bind(update.position.map(|(lat, _)| lat))
        .bind(update.position.map(|(_, lng)| lng))
        .bind(route.as_ref().map(|(polyline, _)| polyline.clone()))
        .bind(route.as_ref().map(|(_, eta)| *eta))
        .fetch_one(&mut *tx)
        .await?;

        if previous_status != Some(status) {
            sqlx::query(
                r#"
                INSERT INTO status_history (ref, event, provider_id, note)
                VALUES ($1, 'tracking_changed', $2, $3)
                "#,
            )
            .bind(reference)
            .bind(provider_id)
            .bind(status.to_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
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
        sqlx::query(
            r#"
            UPDATE customer_requests
            SET route_polyline = $2,
                eta_minutes = $3,
                route_updated_at = NOW(),
                updated_at = NOW()
            WHERE ref = $1 AND status = 'approved'
            "#,
        )
        .bind(reference)
        .bind(Json(polyline))
        .bind(eta_minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_meeting_point(&self, reference: &str, lat: f64, lng: f64) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE customer_requests
            SET meeting_lat = $2, meeting_lng = $3
            WHERE ref = $1 AND meeting_lat IS NULL
            "#,
        )
        .bind(reference)
        .bind(lat)
        .bind(lng)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_request(
        &self,
        reference: &str,
        rating: Option<i16>,
    ) -> Result<Option<CustomerRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let completed = sqlx::query_as::<_, CustomerRequest>(
            r#"
            UPDATE customer_requests
            SET completed = TRUE,
                customer_rating = COALESCE(customer_rating, $2),
                completed_at = NOW(),
                updated_at = NOW()
            WHERE ref = $1 AND NOT completed AND status = 'approved'
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(rating)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(completed) = completed else {
            return Ok(None);
        };

        if let (Some(rating), Some(provider_id)) = (completed.customer_rating, completed.accepted_provider_id) {
            sqlx::query(
                r#"
                INSERT INTO ratings (ref, provider_id, rating)
                VALUES ($1, $2, $3)
                ON CONFLICT (ref) DO NOTHING
                "#,
            )
            .bind(reference)
            .bind(provider_id)
            .bind(rating)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO status_history (ref, event, provider_id, note)
            VALUES ($1, 'completed', $2, $3)
            "#,
        )
        .bind(reference)
        .bind(completed.accepted_provider_id)
        .bind(completed.customer_rating.map(|r| format!("rating {}", r)))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(completed))
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        sqlx::query_as::<_, CustomerRequest>(
            r#"
            SELECT * FROM customer_requests
            WHERE ($1::request_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_open_requests_for(
        &self,
        cities: &[String],
        services: &[ServiceType],
        limit: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        sqlx::query_as::<_, CustomerRequest>(
            r#"
            SELECT * FROM customer_requests
            WHERE status = 'pending'
              AND NOT completed
              AND city = ANY($1)
              AND service_type = ANY($2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(cities)
        .bind(services)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_provider_active_requests(
        &self,
        provider_id: i64,
    ) -> Result<Vec<CustomerRequest>, Error> {
        sqlx::query_as::<_, CustomerRequest>(
            r#"
            SELECT * FROM customer_requests
            WHERE accepted_provider_id = $1 AND status = 'approved' AND NOT completed
            ORDER BY accepted_at DESC
            "#,
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await
    }
}
