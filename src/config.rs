use std::net::IpAddr;

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub cors_origin: String,
    pub max_body_size: usize,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let jwt_secret = env_required("JWT_SECRET")?;
        let jwt_refresh_secret = env_required("JWT_REFRESH_SECRET")?;

        if jwt_secret == jwt_refresh_secret {
            return Err("JWT_SECRET and JWT_REFRESH_SECRET must be different".to_string());
        }

        let access_token_ttl = parse_duration(&env_or("JWT_EXPIRE", "15m"))
            .map_err(|e| format!("Invalid JWT_EXPIRE: {e}"))?;
        let refresh_token_ttl = parse_duration(&env_or("JWT_REFRESH_EXPIRE", "7d"))
            .map_err(|e| format!("Invalid JWT_REFRESH_EXPIRE: {e}"))?;
        let reset_token_ttl = parse_duration(&env_or("RESET_PASSWORD_EXPIRE", "1h"))
            .map_err(|e| format!("Invalid RESET_PASSWORD_EXPIRE: {e}"))?;

        let host: IpAddr = env_or("SKILLTRACK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SKILLTRACK_HOST: {e}"))?;

        let port: u16 = env_or("SKILLTRACK_PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid SKILLTRACK_PORT: {e}"))?;

        let base_url = env_or("SKILLTRACK_BASE_URL", &format!("http://{host}:{port}"));
        let cors_origin = env_or("CORS_ORIGIN", "*");

        let max_body_size: usize = env_or("SKILLTRACK_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid SKILLTRACK_MAX_BODY_SIZE: {e}"))?;

        let db_max_connections: u32 = env_or("SKILLTRACK_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid SKILLTRACK_DB_MAX_CONNECTIONS: {e}"))?;

        let db_acquire_timeout = parse_duration(&env_or("SKILLTRACK_DB_ACQUIRE_TIMEOUT", "5s"))
            .map_err(|e| format!("Invalid SKILLTRACK_DB_ACQUIRE_TIMEOUT: {e}"))?;

        let log_level = env_or("SKILLTRACK_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("SKILLTRACK_SMTP_HOST").ok(),
            std::env::var("SKILLTRACK_SMTP_PORT").ok(),
            std::env::var("SKILLTRACK_SMTP_USER").ok(),
            std::env::var("SKILLTRACK_SMTP_PASS").ok(),
            std::env::var("SKILLTRACK_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid SKILLTRACK_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_refresh_secret,
            access_token_ttl,
            refresh_token_ttl,
            reset_token_ttl,
            host,
            port,
            base_url,
            cors_origin,
            max_body_size,
            db_max_connections,
            db_acquire_timeout,
            log_level,
            smtp,
        })
    }
}

/// Parse a lifetime such as `90`, `30s`, `15m`, `12h` or `7d`.
/// A bare number is read as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => value.split_at(idx),
        None => (value, "s"),
    };

    if digits.is_empty() {
        return Err(format!("'{value}' does not start with a number"));
    }

    let amount: i64 = digits
        .parse()
        .map_err(|e| format!("'{value}' is not a valid duration: {e}"))?;

    let duration = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => {
            return Err(format!(
                "unknown duration unit '{other}' (expected s, m, h or d)"
            ));
        }
    };

    duration.ok_or_else(|| format!("'{value}' is out of range"))
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
