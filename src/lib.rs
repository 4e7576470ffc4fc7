pub mod atcf;
pub mod config;
pub mod coops;
pub mod fetch_error;
pub mod fetcher;
pub mod interval;
pub mod nhc;
pub mod spatial;
pub mod storm_event;
pub mod usgs;
pub mod utils;

pub use config::Config;
pub use fetch_error::FetchError;
pub use storm_event::StormEvent;
