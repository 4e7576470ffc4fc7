use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::fetch_error::FetchError;
use crate::fetcher::{HttpFetcher, NO_QUERY};
use crate::nhc::NhcClient;
use crate::usgs::events::{match_storm_events, parse_events, EventFilter, FloodEvent, StormFloodEvent};
use crate::usgs::highwatermarks::{parse_high_water_marks, HighWaterMark, HighWaterMarksQuery};
use crate::usgs::sensors::{parse_sensors, Sensor, SensorFilter};

#[derive(Clone)]
pub struct UsgsClient {
    fetcher: HttpFetcher,
    base_url: String,
    nhc: NhcClient,
}

impl UsgsClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            base_url: config.usgs_base_url.trim_end_matches('/').to_string(),
            nhc: NhcClient::new(config)?,
        })
    }

    #[instrument(skip(self))]
    pub async fn flood_events(&self, filter: &EventFilter) -> Result<Vec<FloodEvent>, FetchError> {
        let url = format!("{}/Events.json", self.base_url);
        let text = self.fetcher.get_text(&url, NO_QUERY).await?;
        let events: Vec<FloodEvent> = parse_events(&text)?
            .into_iter()
            .filter(|event| filter.matches(event))
            .collect();
        debug!("{} flood events after filtering", events.len());
        Ok(events)
    }

    pub async fn flood_event(&self, usgs_id: i64) -> Result<Option<FloodEvent>, FetchError> {
        let events = self.flood_events(&EventFilter::default()).await?;
        Ok(events.into_iter().find(|event| event.usgs_id == usgs_id))
    }

    /// Hurricane flood events that name an NHC storm of the same year.
    #[instrument(skip(self))]
    pub async fn storm_flood_events(
        &self,
        year: Option<i32>,
    ) -> Result<Vec<StormFloodEvent>, FetchError> {
        let events = self.flood_events(&EventFilter::hurricanes(year)).await?;
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let storms = self.nhc.storms(year).await?;
        let matched = match_storm_events(&events, &storms);
        info!(
            "Matched {} of {} hurricane events to NHC storms",
            matched.len(),
            events.len()
        );
        Ok(matched)
    }

    /// High-water marks for `query`. An empty response is an empty result.
    #[instrument(skip(self, query), fields(event = ?query.event_id))]
    pub async fn high_water_marks(
        &self,
        query: &HighWaterMarksQuery,
    ) -> Result<Vec<HighWaterMark>, FetchError> {
        let url = format!("{}/{}", self.base_url, query.path());
        let text = self.fetcher.get_text(&url, &query.params()).await?;
        let marks = parse_high_water_marks(&text)?;
        info!("Retrieved {} high-water marks", marks.len());
        Ok(marks)
    }

    /// Deployed instruments from `Instruments.json`, narrowed by `filter`.
    #[instrument(skip(self))]
    pub async fn sensors(&self, filter: &SensorFilter) -> Result<Vec<Sensor>, FetchError> {
        let url = format!("{}/Instruments.json", self.base_url);
        let text = self.fetcher.get_text(&url, NO_QUERY).await?;
        let sensors: Vec<Sensor> = parse_sensors(&text)?
            .into_iter()
            .filter(|sensor| filter.matches(sensor))
            .collect();
        debug!("{} sensors after filtering", sensors.len());
        Ok(sensors)
    }
}
