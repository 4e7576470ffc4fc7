use scraper::Html;
use tracing::{debug, info, instrument, warn};

use crate::atcf::reader::read_atcf_bytes;
use crate::atcf::record::Advisory;
use crate::atcf::url::{atcf_directory_url, atcf_url, AtcfMode, FileDeck};
use crate::config::Config;
use crate::fetch_error::FetchError;
use crate::fetcher::{self, HttpFetcher, NO_QUERY};
use crate::interval::IntervalRequest;
use crate::nhc::storms::{self, parse_storm_list, NhcStorm, StormQuery};
use crate::nhc::track::{assemble, DuplicatePolicy, StormTrack};
use crate::utils::{parse_storm_identifier, NhcCode, StormIdentifier};

/// Parameters for [`NhcClient::vortex_track`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    /// NHC code (`AL112017`) or name and year (`irma2017`).
    pub storm: String,
    pub interval: IntervalRequest,
    pub file_deck: Option<FileDeck>,
    pub mode: Option<AtcfMode>,
    pub advisories: Option<Vec<Advisory>>,
}

impl TrackRequest {
    pub fn new(storm: &str) -> Self {
        Self {
            storm: storm.trim().to_string(),
            interval: IntervalRequest::unbounded(),
            file_deck: None,
            mode: None,
            advisories: None,
        }
    }

    pub fn interval(mut self, interval: IntervalRequest) -> Self {
        self.interval = interval;
        self
    }

    pub fn file_deck(mut self, file_deck: FileDeck) -> Self {
        self.file_deck = Some(file_deck);
        self
    }

    pub fn mode(mut self, mode: AtcfMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn advisories(mut self, advisories: Vec<Advisory>) -> Self {
        self.advisories = Some(advisories);
        self
    }

    /// BEST track unless only forecast advisories were asked for.
    fn deck(&self) -> FileDeck {
        self.file_deck.unwrap_or(match &self.advisories {
            Some(advisories) if !advisories.iter().any(Advisory::is_best) => FileDeck::Advisory,
            _ => FileDeck::Best,
        })
    }

    /// Advisories to read from the file. CARQ rides along with OFCL so forecast gaps
    /// can be filled.
    fn read_filter(&self) -> Option<Vec<Advisory>> {
        let mut advisories = self.advisories.clone()?;
        if advisories.contains(&Advisory::Ofcl) && !advisories.contains(&Advisory::Carq) {
            advisories.push(Advisory::Carq);
        }
        Some(advisories)
    }
}

#[derive(Clone)]
pub struct NhcClient {
    fetcher: HttpFetcher,
    base_url: String,
    policy: DuplicatePolicy,
}

impl NhcClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: HttpFetcher::new(config)?,
            base_url: config.nhc_base_url.trim_end_matches('/').to_string(),
            policy: config.duplicate_policy,
        })
    }

    /// Every storm in the NHC storm list, optionally restricted to one year.
    #[instrument(skip(self))]
    pub async fn storms(&self, year: Option<i32>) -> Result<Vec<NhcStorm>, FetchError> {
        let url = format!("{}/index/storm_list.txt", self.base_url);
        let text = self.fetcher.get_text(&url, NO_QUERY).await?;
        let mut storms = parse_storm_list(&text)?;
        if let Some(year) = year {
            storms.retain(|storm| storm.year == year);
        }
        debug!("{} storms listed", storms.len());
        Ok(storms)
    }

    pub async fn find_storm(&self, query: &StormQuery) -> Result<Option<NhcStorm>, FetchError> {
        let storms = self.storms(Some(query.year())).await?;
        Ok(storms::find_storm(&storms, query).cloned())
    }

    /// URLs of the ATCF files published for `deck`: newest year first, then by basin
    /// and latest cyclone number within a year.
    #[instrument(skip(self))]
    pub async fn atcf_files(
        &self,
        deck: FileDeck,
        mode: AtcfMode,
        year: Option<i32>,
    ) -> Result<Vec<String>, FetchError> {
        let directory = atcf_directory_url(&self.base_url, deck, mode, year)?;
        let html = self.fetcher.get_text(&directory, NO_QUERY).await?;

        let document = Html::parse_document(&html);
        let links = fetcher::selector("a[href]")?;

        let mut files: Vec<(NhcCode, String)> = document
            .select(&links)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| {
                let code = deck_file_code(href, deck)?;
                year.map_or(true, |year| code.year == year)
                    .then(|| (code, format!("{directory}{href}")))
            })
            .collect();
        files.sort_by(|(a, _), (b, _)| {
            b.year
                .cmp(&a.year)
                .then_with(|| a.basin.cmp(&b.basin))
                .then_with(|| b.number.cmp(&a.number))
        });
        let mut files: Vec<String> = files.into_iter().map(|(_, url)| url).collect();
        files.dedup();

        debug!("Found {} {} deck files in {}", files.len(), deck, directory);
        Ok(files)
    }

    /// Fetch, parse and assemble the track of one storm.
    ///
    /// The interval is validated before any request is sent. `None` when the storm is
    /// not in the storm list or its file holds no matching records.
    #[instrument(skip(self, request), fields(storm = %request.storm))]
    pub async fn vortex_track(
        &self,
        request: &TrackRequest,
    ) -> Result<Option<StormTrack>, FetchError> {
        request.interval.validate()?;

        let Some((code, mode)) = self.locate(request).await? else {
            warn!("Storm {} not found in the NHC storm list", request.storm);
            return Ok(None);
        };

        let deck = request.deck();
        let filter = request.read_filter();
        let bytes = self.fetch_atcf(&code, deck, mode).await?;
        let read = read_atcf_bytes(bytes, filter.as_deref())?;
        if !read.skipped.is_empty() {
            warn!("Skipped {} malformed lines for {}", read.skipped.len(), code);
        }

        let mut tracks = assemble(read.records, self.policy);
        if tracks.is_empty() {
            return Ok(None);
        }
        if tracks.len() > 1 {
            warn!(
                "{} file for {} holds {} storm keys, keeping the matching one",
                deck,
                code,
                tracks.len()
            );
        }
        let position = tracks
            .iter()
            .position(|track| track.nhc_code() == code)
            .unwrap_or(0);
        let mut track = tracks.swap_remove(position);

        // unspecified advisories mean all of them, OFCL included
        let requested = request.advisories.as_deref();
        if requested.map_or(true, |advisories| advisories.contains(&Advisory::Ofcl)) {
            track = track.fill_forecast_gaps();
        }
        if let Some(requested) = requested {
            track = track.with_advisories(requested);
        }

        if !request.interval.is_unbounded() {
            if let Some(bounds) = track.interval() {
                let interval = request.interval.resolve(&bounds)?;
                track = track.subset(&interval);
            }
        }

        info!("Retrieved {} records for {}", track.len(), code);
        Ok(Some(track))
    }

    async fn locate(&self, request: &TrackRequest) -> Result<Option<(NhcCode, AtcfMode)>, FetchError> {
        let query = match parse_storm_identifier(&request.storm)? {
            StormIdentifier::Code(code) => {
                if let Some(mode) = request.mode {
                    return Ok(Some((code, mode)));
                }
                StormQuery::Code(code)
            }
            StormIdentifier::NameYear { name, year } => StormQuery::Name { name, year },
        };

        let listed = self.find_storm(&query).await?;
        let located = match (query, listed) {
            (_, Some(storm)) => {
                let mode = request
                    .mode
                    .unwrap_or_else(|| AtcfMode::from_source(storm.source.as_deref()));
                Some((storm.code()?, mode))
            }
            // codes missing from the list are tried in the real-time directories
            (StormQuery::Code(code), None) => Some((code, AtcfMode::Realtime)),
            (_, None) => None,
        };
        Ok(located)
    }

    async fn fetch_atcf(
        &self,
        code: &NhcCode,
        deck: FileDeck,
        mode: AtcfMode,
    ) -> Result<Vec<u8>, FetchError> {
        let url = atcf_url(&self.base_url, code, deck, mode);
        match mode {
            AtcfMode::Historical => self.fetcher.get_archived(&url).await,
            AtcfMode::Realtime => match self.fetcher.get_bytes(&url, NO_QUERY).await {
                Err(FetchError::NotFound(_)) => {
                    warn!("{} not found, falling back to the archive", url);
                    let archived = atcf_url(&self.base_url, code, deck, AtcfMode::Historical);
                    self.fetcher.get_archived(&archived).await
                }
                fetched => fetched,
            },
        }
    }
}

/// Storm of a deck file name such as `bal112017.dat.gz`: deck letter, basin, number, year.
fn deck_file_code(href: &str, deck: FileDeck) -> Option<NhcCode> {
    let name = href.rsplit('/').next().unwrap_or(href).to_lowercase();
    if !name.starts_with(deck.letter()) || !name.contains(".dat") {
        return None;
    }
    let stem = name.get(1..name.find('.').unwrap_or(name.len()))?;
    stem.parse().ok()
}
