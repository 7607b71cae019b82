use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/spa-desk.db";
const DEFAULT_JWT_SECRET: &str = "spa-desk-dev-secret";

/// Process configuration, read once from the environment at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin: AdminSeed,
    pub seed_catalog: bool,
}

/// Bootstrap admin, only inserted when no admin exists yet.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub account_name: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        if jwt_secret == DEFAULT_JWT_SECRET {
            log::warn!("JWT_SECRET not set. Using the development secret. Set JWT_SECRET in production.");
        }

        let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
        if password == "admin" {
            log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            jwt_secret,
            admin: AdminSeed {
                account_name: env::var("ADMIN_ACCOUNT").unwrap_or_else(|_| "admin".to_string()),
                password,
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@spa.local".to_string()),
                phone: env::var("ADMIN_PHONE").unwrap_or_else(|_| "0000000000".to_string()),
            },
            seed_catalog: env::var("SEED_CATALOG")
                .map(|value| value == "true")
                .unwrap_or(false),
        }
    }
}
