use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` only outside production; the server then keeps trends in memory.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_base_url: String,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_base_delay_ms: u64,
    pub scraper_navigation_timeout_secs: u64,
    pub scraper_ready_timeout_secs: u64,
    pub scraper_settle_delay_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub dedup_window_hours: u32,
    pub retention_days: u32,
    pub schedule_enabled: bool,
    pub schedule_regions: Vec<String>,
    pub update_cron: String,
    pub cleanup_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("scraper_base_url", &self.scraper_base_url)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_base_delay_ms",
                &self.scraper_retry_base_delay_ms,
            )
            .field(
                "scraper_navigation_timeout_secs",
                &self.scraper_navigation_timeout_secs,
            )
            .field(
                "scraper_ready_timeout_secs",
                &self.scraper_ready_timeout_secs,
            )
            .field("scraper_settle_delay_ms", &self.scraper_settle_delay_ms)
            .field("chrome_path", &self.chrome_path)
            .field("dedup_window_hours", &self.dedup_window_hours)
            .field("retention_days", &self.retention_days)
            .field("schedule_enabled", &self.schedule_enabled)
            .field("schedule_regions", &self.schedule_regions)
            .field("update_cron", &self.update_cron)
            .field("cleanup_cron", &self.cleanup_cron)
            .finish()
    }
}
