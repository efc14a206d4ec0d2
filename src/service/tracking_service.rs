// service/tracking_service.rs
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use redis::aio::ConnectionManager;
use tokio::time::{Duration, Instant};

use crate::{
    db::{requestdb::RequestExt, store::Store},
    dtos::requestdtos::*,
    models::requestmodel::{CustomerRequest, ProviderStatus, RequestStatus, TrackingWrite},
    service::{
        error::{DbContext, ServiceError},
        lookup::{request_by_ref, request_for_contact},
        route_provider::RouteProvider,
    },
    utils::{
        geo::{validate_polyline, Coordinates, RouteKey},
        reference::normalize_ref,
    },
};

const COOLDOWN_KEY_PREFIX: &str = "kashta:route:";

/// Suppresses repeated route computations for the same rounded key.
/// Shared through redis when available, per process otherwise.
pub struct RouteCooldown {
    window: Duration,
    redis: Option<Arc<ConnectionManager>>,
    local: Mutex<HashMap<String, Instant>>,
}

impl std::fmt::Debug for RouteCooldown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCooldown")
            .field("window", &self.window)
            .field("shared", &self.redis.is_some())
            .finish()
    }
}

impl RouteCooldown {
    pub fn new(window: Duration, redis: Option<Arc<ConnectionManager>>) -> Self {
        Self {
            window,
            redis,
            local: Mutex::new(HashMap::new()),
        }
    }

    /// `true` when the caller may compute this route now.
    pub async fn try_acquire(&self, key: &RouteKey) -> bool {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let acquired = redis::cmd("SET")
                .arg(format!("{}{}", COOLDOWN_KEY_PREFIX, key.as_str()))
                .arg(1)
                .arg("NX")
                .arg("EX")
                .arg(self.window.as_secs().max(1))
                .query_async::<_, Option<String>>(&mut conn)
                .await;

            match acquired {
                Ok(reply) => return reply.is_some(),
                Err(e) => tracing::warn!("Route cooldown via redis failed: {}. Using local map", e),
            }
        }

        self.try_acquire_local(key)
    }

    fn try_acquire_local(&self, key: &RouteKey) -> bool {
        let now = Instant::now();
        let mut entries = self.local.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, started| now.duration_since(*started) < self.window);

        if entries.contains_key(key.as_str()) {
            return false;
        }
        entries.insert(key.as_str().to_string(), now);
        true
    }
}

#[derive(Debug)]
pub struct TrackingService {
    db_client: Arc<dyn Store>,
    route_provider: Arc<dyn RouteProvider>,
    cooldown: RouteCooldown,
}

fn stored_route(request: &CustomerRequest, destination: Option<Coordinates>) -> RouteView {
    RouteView {
        refreshed: false,
        polyline: request.route_polyline.as_ref().map(|p| p.0.clone()),
        eta_minutes: request.eta_minutes,
        destination,
    }
}

impl TrackingService {
    pub fn new(
        db_client: Arc<dyn Store>,
        route_provider: Arc<dyn RouteProvider>,
        cooldown: RouteCooldown,
    ) -> Self {
        Self {
            db_client,
            route_provider,
            cooldown,
        }
    }

    /// Provider push. Bad coordinates are dropped rather than failing the
    /// update; a route is kept only with a valid position, polyline and eta.
    pub async fn update_tracking(
        &self,
        reference: &str,
        provider_id: i64,
        body: TrackingUpdateDto,
    ) -> Result<TrackingUpdateOutcome, ServiceError> {
        let reference = normalize_ref(reference);
        let raw_status = body.provider_status.as_deref().map(str::trim).unwrap_or("");
        if reference.is_empty() || raw_status.is_empty() {
            return Err(ServiceError::MissingFields);
        }
        let requested = raw_status
            .parse::<ProviderStatus>()
            .map_err(|_| ServiceError::InvalidField("provider_status"))?;

        let position = Coordinates::from_pair(body.lat, body.lng);
        if position.is_none() && (body.lat.is_some() || body.lng.is_some()) {
            tracing::debug!("Dropping invalid coordinates for {}", reference);
        } else if position.is_none() && requested.is_positional() {
            tracing::debug!("{} update for {} carries no position", requested.to_str(), reference);
        }

        let route = match (position, body.polyline.as_deref(), body.eta_minutes) {
            (Some(_), Some(points), Some(eta)) if eta >= 0 => {
                validate_polyline(points).map(|polyline| (polyline, eta))
            }
            _ => None,
        };

        let write = TrackingWrite {
            provider_status: requested,
            position: position.map(|p| p.as_pair()),
            route,
        };
        let route_saved = write.route.is_some();

        let outcome = self
            .db_client
            .update_tracking(&reference, provider_id, &write)
            .await
            .db("db_update_failed")?;

        let Some(outcome) = outcome else {
            let current = request_by_ref(self.db_client.as_ref(), &reference).await?;
            return Err(if !current.is_accepted_by(provider_id) {
                ServiceError::Unauthorized(provider_id, reference)
            } else if current.completed {
                ServiceError::AlreadyCompleted(reference)
            } else {
                ServiceError::RequestRejected(reference)
            });
        };

        let stored_status = outcome.request.provider_status.unwrap_or(requested);
        let applied = stored_status == requested;
        if !applied {
            tracing::warn!(
                "Ignoring provider_status regression on {}: {} -> {}",
                reference,
                stored_status.to_str(),
                requested.to_str()
            );
        } else if outcome.previous_status != Some(requested) {
            tracing::info!(
                "Request {} tracking {} -> {}",
                reference,
                outcome.previous_status.map(|s| s.to_str()).unwrap_or("none"),
                requested.to_str()
            );
        }

        Ok(TrackingUpdateOutcome {
            reference,
            provider_status: stored_status,
            applied,
            position_saved: write.position.is_some(),
            route_saved,
        })
    }

    /// Meeting point from the offer, geocoding the free text once if needed.
    async fn resolve_destination(&self, request: &CustomerRequest) -> Option<Coordinates> {
        if let Some(point) = Coordinates::from_pair(request.meeting_lat, request.meeting_lng) {
            return Some(point);
        }

        let text = request
            .meeting_location
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?;

        match self.route_provider.geocode(text).await {
            Ok(point) => {
                if let Err(e) = self
                    .db_client
                    .save_meeting_point(&request.reference, point.lat, point.lng)
                    .await
                {
                    tracing::warn!("Could not cache meeting point for {}: {}", request.reference, e);
                }
                Some(point)
            }
            Err(e) => {
                tracing::warn!("Geocoding failed for {}: {}", request.reference, e);
                None
            }
        }
    }

    /// Customer-driven route/ETA refresh between the provider and the
    /// meeting point. Falls back to the stored route whenever a fresh one
    /// is not warranted or not available.
    pub async fn refresh_route(&self, lookup: CustomerLookupDto) -> Result<RouteView, ServiceError> {
        let request =
            request_for_contact(self.db_client.as_ref(), &lookup.reference, &lookup.contact).await?;

        let en_route = request.status == RequestStatus::Approved
            && !request.completed
            && request.provider_status == Some(ProviderStatus::EnRoute);
        let known = Coordinates::from_pair(request.meeting_lat, request.meeting_lng);
        if !en_route {
            return Ok(stored_route(&request, known));
        }

        let Some(from) =
            Coordinates::from_pair(request.provider_current_lat, request.provider_current_lng)
        else {
            return Ok(stored_route(&request, known));
        };
        let Some(to) = self.resolve_destination(&request).await else {
            return Ok(stored_route(&request, None));
        };

        let key = RouteKey::new(&from, &to);
        if !self.cooldown.try_acquire(&key).await {
            tracing::debug!("Route {} within cooldown", key.as_str());
            return Ok(stored_route(&request, Some(to)));
        }

        let summary = match self.route_provider.route(from, to).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Route lookup failed for {}: {}", request.reference, e);
                return Ok(stored_route(&request, Some(to)));
            }
        };

        let eta = summary.eta_minutes();
        self.db_client
            .save_route(&request.reference, &summary.polyline, eta)
            .await
            .db("db_update_failed")?;

        Ok(RouteView {
            refreshed: true,
            polyline: Some(summary.polyline),
            eta_minutes: Some(eta),
            destination: Some(to),
        })
    }
}
