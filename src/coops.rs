// NOAA CO-OPS (Center for Operational Oceanographic Products and Services) stations
//
// - stations: station listing and harmonic constituents scraped from HTML tables
// - query: data API requests and per-product responses
// - dataset: several station series on one time axis
// - client: HTTP access to the data API and station pages

pub mod client;
pub mod dataset;
pub mod query;
pub mod stations;

pub use client::CoopsClient;
pub use dataset::CoopsDataset;
pub use query::{
    CoopsQuery, CoopsReading, Datum, DatumValue, Product, QueryOptions, SamplingInterval,
    StationSeries, TimeZone, Units,
};
pub use stations::{Constituent, CoopsStation, StationType};
