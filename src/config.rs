use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::error::{FareWatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub serpapi_key: String,
    pub database_url: String,

    // Route settings
    pub origin: String,
    pub destination: String,
    pub airline_code: String,
    pub adults: u32,
    pub children: u32,
    pub lookahead_days: i64,

    // Deal detection
    pub absolute_threshold: f64,
    pub relative_drop_pct: f64,
    pub min_data_points: usize,

    // SMTP email settings
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub alert_to: Option<String>,
}

impl Config {
    pub fn passenger_count(&self) -> u32 {
        self.adults + self.children
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serpapi_key: String::new(),
            database_url: "sqlite://flights.db".to_string(),
            origin: "MSP".to_string(),
            destination: "DFW".to_string(),
            airline_code: "DL".to_string(),
            adults: 2,
            children: 2,
            lookahead_days: 90,
            absolute_threshold: 250.0, // per-person price in USD
            relative_drop_pct: 0.15,   // 15% below median
            min_data_points: 7,        // need this many before relative detection kicks in
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            alert_to: None,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    // Override defaults with environment variables
    if let Ok(key) = env::var("SERPAPI_KEY") {
        config.serpapi_key = key;
    }

    if let Ok(url) = env::var("FAREWATCH_DB") {
        config.database_url = url;
    }

    if let Ok(host) = env::var("SMTP_HOST") {
        config.smtp_host = host;
    }

    if let Ok(port) = env::var("SMTP_PORT") {
        config.smtp_port = port
            .parse()
            .map_err(|_| FareWatchError::config_error(format!("SMTP_PORT is not a valid port number: {port}")))?;
    }

    if let Ok(user) = env::var("SMTP_USER") {
        config.smtp_user = Some(user);
    }

    if let Ok(password) = env::var("SMTP_PASSWORD") {
        config.smtp_password = Some(password);
    }

    // Alerts default to the sending account when no recipient is given
    config.alert_to = env::var("ALERT_TO").ok().or_else(|| config.smtp_user.clone());

    if let Ok(threshold) = env::var("ABSOLUTE_THRESHOLD") {
        config.absolute_threshold = threshold
            .parse()
            .map_err(|_| FareWatchError::config_error(format!("ABSOLUTE_THRESHOLD is not a number: {threshold}")))?;
    }

    Ok(config)
}

/// Sanity-check the configuration: database reachable, credentials present.
/// Missing pieces are warnings, not errors - the run degrades instead.
pub async fn initialize_config() -> Result<()> {
    info!("Initializing configuration...");

    let config = load_config()?;

    if config.serpapi_key.is_empty() {
        warn!("SERPAPI_KEY is not set - flight searches will fail");
    } else {
        info!("SerpAPI key configured");
    }

    match crate::tracker::Database::connect(&config.database_url).await {
        Ok(_) => info!("Database ready at {}", config.database_url),
        Err(e) => warn!("Could not open database {}: {}", config.database_url, e),
    }

    match (&config.smtp_user, &config.smtp_password) {
        (Some(user), Some(_)) => info!("SMTP configured for {}", user),
        _ => warn!("SMTP credentials not configured - deal alerts will be skipped"),
    }

    info!(
        "Watching {} -> {} for {} passengers, {} day lookahead",
        config.origin,
        config.destination,
        config.passenger_count(),
        config.lookahead_days,
    );

    Ok(())
}
