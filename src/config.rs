// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub admin_api_key: String,
    pub admin_email: Option<String>,
    pub admin_bcc: Vec<String>,
    // Mail delivery
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_timeout_secs: u64,
    // Routing / geocoding
    pub redis_url: Option<String>,
    pub routing_base_url: String,
    pub geocoding_base_url: String,
    pub route_cooldown_secs: u64,
    pub cors_origins: Vec<String>,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn comma_list(key: &str) -> Vec<String> {
    optional(key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    optional(key)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");
        let admin_api_key = std::env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY must be set");

        Config {
            database_url,
            app_url: app_url.trim_end_matches('/').to_string(),
            jwt_secret,
            jwt_maxage: jwt_maxage
                .parse::<i64>()
                .expect("JWT_MAXAGE must be a number of minutes"),
            port: parsed_or("PORT", 8000),
            admin_api_key,
            admin_email: optional("ADMIN_EMAIL"),
            admin_bcc: comma_list("ADMIN_BCC"),
            resend_api_key: optional("RESEND_API_KEY"),
            from_email: optional("FROM_EMAIL")
                .unwrap_or_else(|| "Kashta <noreply@kashta.app>".to_string()),
            smtp_host: optional("SMTP_HOST"),
            smtp_port: parsed_or("SMTP_PORT", 587),
            smtp_username: optional("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: optional("SMTP_PASSWORD").unwrap_or_default(),
            mail_timeout_secs: parsed_or("MAIL_TIMEOUT_SECS", 10),
            redis_url: optional("REDIS_URL"),
            routing_base_url: optional("ROUTING_BASE_URL")
                .unwrap_or_else(|| "https://router.project-osrm.org".to_string()),
            geocoding_base_url: optional("GEOCODING_BASE_URL")
                .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
            route_cooldown_secs: parsed_or("ROUTE_COOLDOWN_SECS", 15),
            cors_origins: comma_list("CORS_ORIGINS"),
        }
    }

    /// Fixed configuration for in-process tests.
    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/kashta_test".to_string(),
            app_url: "https://kashta.test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            port: 8000,
            admin_api_key: "admin-key".to_string(),
            admin_email: Some("ops@kashta.test".to_string()),
            admin_bcc: vec!["audit@kashta.test".to_string()],
            resend_api_key: None,
            from_email: "Kashta <noreply@kashta.test>".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            mail_timeout_secs: 2,
            redis_url: None,
            routing_base_url: "http://routing.invalid".to_string(),
            geocoding_base_url: "http://geocoding.invalid".to_string(),
            route_cooldown_secs: 15,
            cors_origins: vec![],
        }
    }
}
