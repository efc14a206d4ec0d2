mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use redis::aio::ConnectionManager;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::{
    db::{db::DBClient, store::Store},
    mail::sendmail::{Mailer, ResendMailer},
    middleware::ADMIN_KEY_HEADER,
    service::{
        admin_service::AdminService,
        chat_service::ChatService,
        completion_service::CompletionService,
        dispatch_service::DispatchService,
        notification_service::NotificationService,
        offer_service::OfferService,
        provider_service::ProviderService,
        route_provider::{OsrmRouteProvider, RouteProvider},
        tracking_service::{RouteCooldown, TrackingService},
    },
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Store>,
    // Services
    pub notification_service: Arc<NotificationService>,
    pub dispatch_service: Arc<DispatchService>,
    pub offer_service: Arc<OfferService>,
    pub tracking_service: Arc<TrackingService>,
    pub completion_service: Arc<CompletionService>,
    pub chat_service: Arc<ChatService>,
    pub provider_service: Arc<ProviderService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    pub fn new(
        config: Config,
        db_client: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        route_provider: Arc<dyn RouteProvider>,
        redis: Option<Arc<ConnectionManager>>,
    ) -> Self {
        let notification_service = Arc::new(NotificationService::new(
            db_client.clone(),
            mailer,
            &config,
        ));

        let dispatch_service = Arc::new(DispatchService::new(
            db_client.clone(),
            notification_service.clone(),
        ));
        let offer_service = Arc::new(OfferService::new(
            db_client.clone(),
            notification_service.clone(),
        ));

        let cooldown = RouteCooldown::new(Duration::from_secs(config.route_cooldown_secs), redis);
        let tracking_service = Arc::new(TrackingService::new(
            db_client.clone(),
            route_provider,
            cooldown,
        ));

        let completion_service = Arc::new(CompletionService::new(db_client.clone()));
        let chat_service = Arc::new(ChatService::new(db_client.clone()));
        let provider_service = Arc::new(ProviderService::new(
            db_client.clone(),
            config.jwt_secret.clone(),
            config.jwt_maxage,
        ));
        let admin_service = Arc::new(AdminService::new(db_client.clone()));

        Self {
            env: config,
            db_client,
            notification_service,
            dispatch_service,
            offer_service,
            tracking_service,
            completion_service,
            chat_service,
            provider_service,
            admin_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = match &config.redis_url {
        Some(redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => {
            tracing::info!("REDIS_URL not set; route cooldown is per process");
            DBClient::new(pool)
        }
    };

    if let Err(err) = db_client.run_migrations().await {
        tracing::error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }
    tracing::info!("Route cooldown: {}", db_client.cache_status());

    let redis = db_client.redis_client.clone();
    let mailer: Arc<dyn Mailer> = Arc::new(ResendMailer::new(&config));
    let route_provider: Arc<dyn RouteProvider> = Arc::new(OsrmRouteProvider::new(&config));

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(ADMIN_KEY_HEADER),
        ])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let port = config.port;
    let app_state = Arc::new(AppState::new(
        config,
        Arc::new(db_client),
        mailer,
        route_provider,
        redis,
    ));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", port, err);
            std::process::exit(1);
        }
    };
    tracing::info!("Server is running on http://localhost:{}", port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
