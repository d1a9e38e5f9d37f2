use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Tests drive this with a `HashMap` lookup instead of mutating the process env.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("TRENDSCOUT_ENV", "development"))?;

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    if database_url.is_none() && env == Environment::Production {
        return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
    }

    let mut bind_addr = or_default("TRENDSCOUT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRENDSCOUT_BIND_ADDR", e.to_string()))?;
    if let Ok(port) = lookup("PORT") {
        let port = port
            .parse::<u16>()
            .map_err(|e| invalid("PORT", e.to_string()))?;
        bind_addr.set_port(port);
    }

    let log_level = or_default("TRENDSCOUT_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("TRENDSCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("TRENDSCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("TRENDSCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_base_url = or_default(
        "TRENDSCOUT_SCRAPER_BASE_URL",
        "https://trends.google.com/trending",
    );
    let scraper_user_agent = or_default(
        "TRENDSCOUT_SCRAPER_USER_AGENT",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    );
    let scraper_max_retries = parse_u32("TRENDSCOUT_SCRAPER_MAX_RETRIES", "3")?;
    if scraper_max_retries == 0 {
        return Err(invalid(
            "TRENDSCOUT_SCRAPER_MAX_RETRIES",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_retry_base_delay_ms = parse_u64("TRENDSCOUT_SCRAPER_RETRY_BASE_DELAY_MS", "3000")?;
    let scraper_navigation_timeout_secs =
        parse_u64("TRENDSCOUT_SCRAPER_NAVIGATION_TIMEOUT_SECS", "60")?;
    let scraper_ready_timeout_secs = parse_u64("TRENDSCOUT_SCRAPER_READY_TIMEOUT_SECS", "30")?;
    let scraper_settle_delay_ms = parse_u64("TRENDSCOUT_SCRAPER_SETTLE_DELAY_MS", "5000")?;
    let chrome_path = lookup("TRENDSCOUT_CHROME_PATH").ok().map(PathBuf::from);

    let dedup_window_hours = parse_u32("TRENDSCOUT_DEDUP_WINDOW_HOURS", "2")?;
    let retention_days = parse_u32("TRENDSCOUT_RETENTION_DAYS", "7")?;

    let schedule_enabled = parse_bool("TRENDSCOUT_SCHEDULE_ENABLED", "false")?;
    let schedule_regions: Vec<String> = or_default("TRENDSCOUT_SCHEDULE_REGIONS", "IN,US,GB")
        .split(',')
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect();
    let update_cron = or_default("TRENDSCOUT_UPDATE_CRON", "0 0 * * * *");
    let cleanup_cron = or_default("TRENDSCOUT_CLEANUP_CRON", "0 30 3 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_base_url,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_base_delay_ms,
        scraper_navigation_timeout_secs,
        scraper_ready_timeout_secs,
        scraper_settle_delay_ms,
        chrome_path,
        dedup_window_hours,
        retention_days,
        schedule_enabled,
        schedule_regions,
        update_cron,
        cleanup_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRENDSCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
