use std::{env, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process maps, snapshotted to `DATA_FILE` after each write when set.
    Memory { snapshot: Option<PathBuf> },
    /// Flat JSON document, re-read and re-written on every operation.
    JsonFile { path: PathBuf },
    Mongo { uri: String, db: String },
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,
    pub jwt_ttl_days: i64,
    pub cookie_secure: bool,

    pub storage: StorageBackend,

    pub coingecko_api_url: String,
    pub coingecko_api_key: Option<String>,
    pub price_retry_base_ms: u64,

    pub cron_secret: Option<String>,
    pub smtp: Option<SmtpSettings>,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn storage_from_env() -> StorageBackend {
    let data_file = non_empty("DATA_FILE");
    let backend = non_empty("STORAGE_BACKEND").map(|s| s.to_lowercase());

    match backend.as_deref() {
        Some("json") => StorageBackend::JsonFile {
            path: PathBuf::from(data_file.unwrap_or_else(|| "data.json".to_string())),
        },
        Some("mongo") | Some("mongodb") => StorageBackend::Mongo {
            uri: non_empty("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            db: non_empty("MONGODB_DB").unwrap_or_else(|| "cryptoalert".to_string()),
        },
        _ => StorageBackend::Memory {
            snapshot: data_file.map(PathBuf::from),
        },
    }
}

fn smtp_from_env() -> Option<SmtpSettings> {
    // No host => email delivery is not configured.
    let host = non_empty("SMTP_HOST")?;

    Some(SmtpSettings {
        host,
        port: env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(587),
        from_address: non_empty("SMTP_FROM").unwrap_or_else(|| "alerts@cryptoalert.local".to_string()),
        user: non_empty("SMTP_USER"),
        password: non_empty("SMTP_PASSWORD"),
    })
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());
    let jwt_ttl_days = env::var("JWT_TTL_DAYS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|d| *d > 0)
        .unwrap_or(7);
    let cookie_secure = env::var("COOKIE_SECURE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let coingecko_api_url = env::var("COINGECKO_API_URL")
        .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string());
    let price_retry_base_ms = env::var("PRICE_RETRY_BASE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1000);

    Settings {
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        jwt_ttl_days,
        cookie_secure,
        storage: storage_from_env(),
        coingecko_api_url,
        coingecko_api_key: non_empty("COINGECKO_API_KEY"),
        price_retry_base_ms,
        cron_secret: non_empty("CRON_SECRET"),
        smtp: smtp_from_env(),
    }
}
