//! One named storm tying the NHC, USGS and CO-OPS sources together.
//!
//! A [`StormEvent`] is located in the NHC storm list and carries a resolved time
//! window; every retrieval it offers is restricted to that window unless narrowed
//! further.

use tracing::{debug, info, instrument, warn};

use crate::atcf::record::Advisory;
use crate::atcf::url::FileDeck;
use crate::config::Config;
use crate::coops::{CoopsClient, CoopsDataset, QueryOptions, StationType};
use crate::fetch_error::FetchError;
use crate::interval::{Interval, IntervalRequest};
use crate::nhc::isotach::{self, DEFAULT_SEGMENTS};
use crate::nhc::{NhcClient, NhcStorm, StormQuery, StormTrack, TrackRequest};
use crate::spatial::Region;
use crate::usgs::{HighWaterMark, HighWaterMarksQuery, UsgsClient};
use crate::utils::NhcCode;

pub struct StormEvent {
    storm: NhcStorm,
    interval: Interval,
    usgs_id: Option<i64>,
    nhc: NhcClient,
    usgs: UsgsClient,
    coops: CoopsClient,
}

struct Clients {
    nhc: NhcClient,
    usgs: UsgsClient,
    coops: CoopsClient,
}

impl Clients {
    fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Clients {
            nhc: NhcClient::new(config)?,
            usgs: UsgsClient::new(config)?,
            coops: CoopsClient::new(config)?,
        })
    }
}

impl StormEvent {
    /// Storm by name and year, e.g. `("florence", 2018)`.
    #[instrument(skip(config, interval))]
    pub async fn from_name(
        config: &Config,
        name: &str,
        year: i32,
        interval: IntervalRequest,
    ) -> Result<Self, FetchError> {
        interval.validate()?;
        let clients = Clients::new(config)?;
        let query = StormQuery::name(name, year);
        let storm = Self::lookup(&clients.nhc, &query).await?;
        Self::build(clients, storm, interval, None).await
    }

    /// Storm by NHC code, e.g. `AL062018`.
    #[instrument(skip(config, interval))]
    pub async fn from_nhc_code(
        config: &Config,
        nhc_code: &str,
        interval: IntervalRequest,
    ) -> Result<Self, FetchError> {
        interval.validate()?;
        let code: NhcCode = nhc_code.parse()?;
        let clients = Clients::new(config)?;
        let storm = Self::lookup(&clients.nhc, &StormQuery::Code(code)).await?;
        Self::build(clients, storm, interval, None).await
    }

    /// Storm recorded by a USGS flood event.
    #[instrument(skip(config, interval))]
    pub async fn from_usgs_id(
        config: &Config,
        usgs_id: i64,
        year: Option<i32>,
        interval: IntervalRequest,
    ) -> Result<Self, FetchError> {
        interval.validate()?;
        let clients = Clients::new(config)?;

        let events = clients.usgs.storm_flood_events(year).await?;
        let Some(event) = events.into_iter().find(|event| event.event.usgs_id == usgs_id) else {
            return Err(FetchError::InvalidStorm(format!(
                "flood event {usgs_id} does not match any NHC storm"
            )));
        };
        let code: NhcCode = event.nhc_code.parse()?;
        let storm = Self::lookup(&clients.nhc, &StormQuery::Code(code)).await?;
        Self::build(clients, storm, interval, Some(usgs_id)).await
    }

    async fn lookup(nhc: &NhcClient, query: &StormQuery) -> Result<NhcStorm, FetchError> {
        nhc.find_storm(query)
            .await?
            .ok_or_else(|| FetchError::InvalidStorm(format!("{query:?} not found in the NHC storm list")))
    }

    async fn build(
        clients: Clients,
        storm: NhcStorm,
        interval: IntervalRequest,
        usgs_id: Option<i64>,
    ) -> Result<Self, FetchError> {
        let bounds = match (storm.start_date, storm.end_date) {
            (Some(start), Some(end)) => Interval::new(start, end)?,
            (start, end) => {
                debug!("Storm list lacks bounds for {}, reading the best track", storm.nhc_code);
                let track = clients
                    .nhc
                    .vortex_track(&TrackRequest::new(&storm.nhc_code).file_deck(FileDeck::Best))
                    .await?;
                let track_bounds = track.and_then(|track| track.interval()).ok_or_else(|| {
                    FetchError::InvalidStorm(format!("{} has no track data", storm.nhc_code))
                })?;
                Interval::new(
                    start.unwrap_or(track_bounds.start()),
                    end.unwrap_or(track_bounds.end()),
                )?
            }
        };

        let interval = interval.resolve(&bounds)?;
        info!(
            "Storm {} ({}) from {} to {}",
            storm.name,
            storm.nhc_code,
            interval.start(),
            interval.end()
        );

        Ok(StormEvent {
            storm,
            interval,
            usgs_id,
            nhc: clients.nhc,
            usgs: clients.usgs,
            coops: clients.coops,
        })
    }

    pub fn storm(&self) -> &NhcStorm {
        &self.storm
    }

    pub fn name(&self) -> &str {
        &self.storm.name
    }

    pub fn year(&self) -> i32 {
        self.storm.year
    }

    pub fn nhc_code(&self) -> &str {
        &self.storm.nhc_code
    }

    pub fn basin(&self) -> &str {
        &self.storm.basin
    }

    pub fn number(&self) -> u32 {
        self.storm.number
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Narrow the event window. Offsets are anchored on the event window itself.
    pub fn subinterval(&self, request: &IntervalRequest) -> Result<Interval, FetchError> {
        Ok(request.resolve(&self.interval)?)
    }

    /// USGS flood event recording this storm, if any.
    pub async fn usgs_id(&self) -> Result<Option<i64>, FetchError> {
        if self.usgs_id.is_some() {
            return Ok(self.usgs_id);
        }
        let events = self.usgs.storm_flood_events(Some(self.storm.year)).await?;
        Ok(events
            .into_iter()
            .find(|event| event.nhc_code == self.storm.nhc_code)
            .map(|event| event.event.usgs_id))
    }

    /// Track of the storm within the event window.
    #[instrument(skip(self), fields(storm = %self.storm.nhc_code))]
    pub async fn track(
        &self,
        file_deck: Option<FileDeck>,
        advisories: Option<Vec<Advisory>>,
    ) -> Result<Option<StormTrack>, FetchError> {
        let mut request = TrackRequest::new(&self.storm.nhc_code);
        request.file_deck = file_deck;
        request.advisories = advisories;

        let track = self.nhc.vortex_track(&request).await?;
        Ok(track.map(|track| track.subset(&self.interval)))
    }

    /// High-water marks surveyed for the storm; empty when USGS has no matching event.
    /// The event id of `query` is replaced with the storm's.
    #[instrument(skip(self, query), fields(storm = %self.storm.nhc_code))]
    pub async fn high_water_marks(
        &self,
        query: HighWaterMarksQuery,
    ) -> Result<Vec<HighWaterMark>, FetchError> {
        let Some(usgs_id) = self.usgs_id().await? else {
            info!("No USGS flood event for {}", self.storm.nhc_code);
            return Ok(Vec::new());
        };
        let query = HighWaterMarksQuery {
            event_id: Some(usgs_id),
            ..query
        };
        self.usgs.high_water_marks(&query).await
    }

    /// CO-OPS `options.product` for stations inside `region`.
    #[instrument(skip(self, region, interval), fields(storm = %self.storm.nhc_code))]
    pub async fn coops_product_within_region(
        &self,
        region: &Region,
        options: QueryOptions,
        interval: &IntervalRequest,
        station_type: Option<StationType>,
    ) -> Result<CoopsDataset, FetchError> {
        let window = self.subinterval(interval)?;
        self.coops
            .data_within_region(region, window.start(), window.end(), options, station_type)
            .await
    }

    /// CO-OPS `options.product` for stations swept by the `wind_speed` isotach
    /// (34, 50 or 64 kt) of the best track.
    #[instrument(skip(self, interval), fields(storm = %self.storm.nhc_code))]
    pub async fn coops_product_within_isotach(
        &self,
        wind_speed: i32,
        options: QueryOptions,
        interval: &IntervalRequest,
        station_type: Option<StationType>,
    ) -> Result<CoopsDataset, FetchError> {
        isotach::validate(wind_speed, DEFAULT_SEGMENTS)?;
        let window = self.subinterval(interval)?;

        let Some(track) = self.track(Some(FileDeck::Best), None).await? else {
            warn!("No track for {}, no isotach region", self.storm.nhc_code);
            return Ok(CoopsDataset::default());
        };
        let region = track
            .subset(&window)
            .wind_swath_region(wind_speed, DEFAULT_SEGMENTS)?;
        if region.is_empty() {
            info!("No {} kt isotach for {}", wind_speed, self.storm.nhc_code);
            return Ok(CoopsDataset::default());
        }

        self.coops
            .data_within_region(&region, window.start(), window.end(), options, station_type)
            .await
    }
}
