// Environment-driven configuration tests
// Serialized because they mutate process environment variables

use std::env;
use std::path::PathBuf;

use serial_test::serial;
use storm_events::config::ConfigError;
use storm_events::nhc::DuplicatePolicy;
use storm_events::Config;

const VARS: [&str; 8] = [
    "STORMEVENTS_NHC_URL",
    "STORMEVENTS_USGS_URL",
    "STORMEVENTS_COOPS_API_URL",
    "STORMEVENTS_COOPS_STATIONS_URL",
    "STORMEVENTS_COOPS_HARCON_URL",
    "STORMEVENTS_TIMEOUT_SECS",
    "STORMEVENTS_CACHE_DIR",
    "STORMEVENTS_DUPLICATE_POLICY",
];

fn clear_env() {
    for name in VARS {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.nhc_base_url, "https://ftp.nhc.noaa.gov/atcf/");
    assert_eq!(config.request_timeout_secs, 60);
    assert!(config.cache_dir.is_none());
    assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
    assert!(config.user_agent.starts_with("storm-events/"));
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("STORMEVENTS_NHC_URL", "http://localhost:9000/atcf/");
    env::set_var("STORMEVENTS_USGS_URL", "http://localhost:9000/STNServices/");
    env::set_var("STORMEVENTS_TIMEOUT_SECS", "15");
    env::set_var("STORMEVENTS_CACHE_DIR", "/tmp/storm-events");
    env::set_var("STORMEVENTS_DUPLICATE_POLICY", "keep-all");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.nhc_base_url, "http://localhost:9000/atcf/");
    assert_eq!(config.usgs_base_url, "http://localhost:9000/STNServices/");
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/storm-events")));
    assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepAll);
}

#[test]
#[serial]
fn test_unparseable_timeout_falls_back() {
    clear_env();
    env::set_var("STORMEVENTS_TIMEOUT_SECS", "soon");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.request_timeout_secs, 60);
}

#[test]
#[serial]
fn test_invalid_duplicate_policy() {
    clear_env();
    env::set_var("STORMEVENTS_DUPLICATE_POLICY", "newest");

    let result = Config::from_env();
    clear_env();

    match result {
        Err(ConfigError::InvalidValue { name, value }) => {
            assert_eq!(name, "STORMEVENTS_DUPLICATE_POLICY");
            assert_eq!(value, "newest");
        }
        other => panic!("expected an invalid value error, got {other:?}"),
    }
}
