use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::coops::dataset::CoopsDataset;
use crate::coops::query::{parse_response, CoopsQuery, QueryOptions, StationSeries};
use crate::coops::stations::{
    parse_constituents, parse_stations, Constituent, CoopsStation, StationType,
};
use crate::fetch_error::FetchError;
use crate::fetcher::HttpFetcher;
use crate::spatial::{filter_within, Region};

#[derive(Clone)]
pub struct CoopsClient {
    fetcher: HttpFetcher,
    api_url: String,
    stations_url: String,
    harcon_url: String,
}

impl CoopsClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            api_url: config.coops_api_url.clone(),
            stations_url: config.coops_stations_url.clone(),
            harcon_url: config.coops_harcon_url.clone(),
        })
    }

    /// Stations of one type, or current followed by historical when `None`.
    #[instrument(skip(self))]
    pub async fn stations(
        &self,
        station_type: Option<StationType>,
    ) -> Result<Vec<CoopsStation>, FetchError> {
        let html = self
            .fetcher
            .get_text(&self.stations_url, &[("type", "current")])
            .await?;

        let types = match station_type {
            Some(station_type) => vec![station_type],
            None => StationType::ALL.to_vec(),
        };
        let mut stations = Vec::new();
        for station_type in types {
            stations.extend(parse_stations(&html, station_type)?);
        }
        debug!("{} CO-OPS stations listed", stations.len());
        Ok(stations)
    }

    /// Stations inside `region` (boundary included), one entry per NOS id.
    pub async fn stations_within_region(
        &self,
        region: &Region,
        station_type: Option<StationType>,
    ) -> Result<Vec<CoopsStation>, FetchError> {
        let stations = self.stations(station_type).await?;
        let mut seen = HashSet::new();
        let within: Vec<CoopsStation> = filter_within(stations, region)
            .into_iter()
            .filter(|station| seen.insert(station.nos_id))
            .collect();
        info!("{} CO-OPS stations within region", within.len());
        Ok(within)
    }

    #[instrument(skip(self, query), fields(station = %query.station, product = %query.options.product))]
    pub async fn product(&self, query: &CoopsQuery) -> Result<StationSeries, FetchError> {
        let text = self.fetcher.get_text(&self.api_url, &query.params()).await?;
        parse_response(&query.station, query.options.product, &text)
    }

    /// One product for every station in `region`, gridded on the union of timestamps.
    /// Stations are requested one after another; stations without data are left out.
    #[instrument(skip(self, region))]
    pub async fn data_within_region(
        &self,
        region: &Region,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        options: QueryOptions,
        station_type: Option<StationType>,
    ) -> Result<CoopsDataset, FetchError> {
        let stations = self.stations_within_region(region, station_type).await?;

        let mut series = Vec::with_capacity(stations.len());
        for station in &stations {
            let query = CoopsQuery::new(&station.nos_id.to_string(), start, end).with_options(options);
            let station_series = self.product(&query).await?;
            if station_series.readings.is_empty() {
                debug!("No {} data for station {}", options.product, station.nos_id);
                continue;
            }
            series.push(station_series);
        }

        let dataset = CoopsDataset::from_series(&series);
        info!(
            "Gridded {} stations over {} timestamps",
            dataset.stations.len(),
            dataset.times.len()
        );
        Ok(dataset)
    }

    #[instrument(skip(self))]
    pub async fn constituents(&self, station: &str) -> Result<Vec<Constituent>, FetchError> {
        let html = self
            .fetcher
            .get_text(&self.harcon_url, &[("id", station.trim())])
            .await?;
        parse_constituents(&html)
    }
}
