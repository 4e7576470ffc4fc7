use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::nhc::track::DuplicatePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings shared by every data source adapter.
///
/// Read once and handed to each client; nothing in the crate mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub nhc_base_url: String,
    pub usgs_base_url: String,
    pub coops_api_url: String,
    pub coops_stations_url: String,
    pub coops_harcon_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub cache_dir: Option<PathBuf>,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nhc_base_url: "https://ftp.nhc.noaa.gov/atcf/".to_string(),
            usgs_base_url: "https://stn.wim.usgs.gov/STNServices/".to_string(),
            coops_api_url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter"
                .to_string(),
            coops_stations_url: "https://access.co-ops.nos.noaa.gov/nwsproducts.html".to_string(),
            coops_harcon_url: "https://tidesandcurrents.noaa.gov/harcon.html".to_string(),
            request_timeout_secs: 60,
            user_agent: format!("storm-events/{}", env!("CARGO_PKG_VERSION")),
            cache_dir: None,
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }
}

impl Config {
    /// Build a config from `STORMEVENTS_*` environment variables, falling back to the
    /// public endpoints for anything unset. A `.env` file is honoured if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let duplicate_policy = match env::var("STORMEVENTS_DUPLICATE_POLICY") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "STORMEVENTS_DUPLICATE_POLICY",
                value,
            })?,
            Err(_) => defaults.duplicate_policy,
        };

        Ok(Config {
            nhc_base_url: env::var("STORMEVENTS_NHC_URL").unwrap_or(defaults.nhc_base_url),
            usgs_base_url: env::var("STORMEVENTS_USGS_URL").unwrap_or(defaults.usgs_base_url),
            coops_api_url: env::var("STORMEVENTS_COOPS_API_URL")
                .unwrap_or(defaults.coops_api_url),
            coops_stations_url: env::var("STORMEVENTS_COOPS_STATIONS_URL")
                .unwrap_or(defaults.coops_stations_url),
            coops_harcon_url: env::var("STORMEVENTS_COOPS_HARCON_URL")
                .unwrap_or(defaults.coops_harcon_url),
            request_timeout_secs: env::var("STORMEVENTS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            user_agent: defaults.user_agent,
            cache_dir: env::var("STORMEVENTS_CACHE_DIR").ok().map(PathBuf::from),
            duplicate_policy,
        })
    }

    /// Point all three services at one host, as used against mock servers.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Config {
            nhc_base_url: format!("{base}/atcf/"),
            usgs_base_url: format!("{base}/STNServices/"),
            coops_api_url: format!("{base}/api/prod/datagetter"),
            coops_stations_url: format!("{base}/nwsproducts.html"),
            coops_harcon_url: format!("{base}/harcon.html"),
            ..Config::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
