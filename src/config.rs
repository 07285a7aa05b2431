use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Auth
    pub admin_password: String,
    pub session_ttl_seconds: u64,
    pub remember_me_days: u64,

    // Fetching
    pub fetch_timeout_ms: u64,
    pub user_agent: String,

    // Storage
    pub data_dir: String,

    // API
    pub max_items_page: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),

            // Auth
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600), // 1 hour
            remember_me_days: env::var("REMEMBER_ME_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),

            // Fetching
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "15000".to_string())
                .parse()
                .unwrap_or(15_000), // 15 seconds per relay
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "ChannelHaven-IPTV/1.0".to_string()),

            // Storage
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| ".data".to_string()),

            // API
            max_items_page: env::var("MAX_ITEMS_PAGE")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
