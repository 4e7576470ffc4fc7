use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc};
use geo::{GeodesicBearing, GeodesicDistance, Point};
use tracing::{debug, instrument};

use crate::atcf::reader::read_atcf_file;
use crate::atcf::record::{Advisory, TrackRecord};
use crate::fetch_error::FetchError;
use crate::interval::Interval;
use crate::spatial::Located;
use crate::utils::NhcCode;

/// Air density used by the Holland B relation.
const HOLLAND_RHO: f64 = 1.15;
pub const METERS_PER_SECOND_PER_KNOT: f64 = 0.514444;

/// Which record survives when two share advisory, issuance time, valid time and
/// isotach radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    LastWins,
    FirstWins,
    KeepAll,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DuplicatePolicy::LastWins => "last_wins",
            DuplicatePolicy::FirstWins => "first_wins",
            DuplicatePolicy::KeepAll => "keep_all",
        };
        f.write_str(name)
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "last_wins" | "last" => Ok(DuplicatePolicy::LastWins),
            "first_wins" | "first" => Ok(DuplicatePolicy::FirstWins),
            "keep_all" | "all" => Ok(DuplicatePolicy::KeepAll),
            other => Err(format!("unknown duplicate policy: {other}")),
        }
    }
}

/// Basin, cyclone number and the year of the storm's first issuance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StormKey {
    pub basin: String,
    pub number: u32,
    pub year: i32,
}

impl StormKey {
    /// Key of a group of records sharing basin and number. A storm that runs past
    /// 31 December keeps the year it started in.
    pub fn of_group(records: &[TrackRecord]) -> Option<Self> {
        let first = records.iter().min_by_key(|record| record.datetime)?;
        Some(Self {
            basin: first.basin.clone(),
            number: first.storm_number,
            year: first.datetime.year(),
        })
    }

    pub fn nhc_code(&self) -> NhcCode {
        NhcCode::new(&self.basin, self.number, self.year)
    }
}

/// Storm motion between consecutive valid times.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation {
    pub speed_mps: f64,
    /// Degrees clockwise from north, in `[0, 360)`.
    pub bearing_deg: f64,
}

impl Translation {
    pub fn speed_knots(&self) -> f64 {
        self.speed_mps / METERS_PER_SECOND_PER_KNOT
    }
}

/// Records of one advisory grouped by track start (issuance time, or the first
/// time of the best track).
pub type Tracks<'a> = BTreeMap<Advisory, BTreeMap<DateTime<Utc>, Vec<&'a TrackRecord>>>;

type TrackIndices = BTreeMap<Advisory, BTreeMap<DateTime<Utc>, Vec<usize>>>;

/// All records of one storm, ordered by valid time, then advisory precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct StormTrack {
    key: StormKey,
    records: Vec<TrackRecord>,
}

/// Group records by storm (basin and cyclone number), in order of first appearance.
pub fn assemble(records: Vec<TrackRecord>, policy: DuplicatePolicy) -> Vec<StormTrack> {
    let mut order: Vec<(String, u32)> = Vec::new();
    let mut groups: HashMap<(String, u32), Vec<TrackRecord>> = HashMap::new();

    for record in records {
        let group = (record.basin.clone(), record.storm_number);
        groups
            .entry(group.clone())
            .or_insert_with(|| {
                order.push(group);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .filter_map(|group| {
            let records = groups.remove(&group)?;
            let key = StormKey::of_group(&records)?;
            Some(StormTrack::build(key, records, policy))
        })
        .collect()
}

fn deduplicate(records: Vec<TrackRecord>, policy: DuplicatePolicy) -> Vec<TrackRecord> {
    if policy == DuplicatePolicy::KeepAll {
        return records;
    }

    type DuplicateKey = (Advisory, DateTime<Utc>, DateTime<Utc>, Option<i32>);
    let mut seen: HashMap<DuplicateKey, usize> = HashMap::new();
    let mut kept: Vec<TrackRecord> = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        let key = (
            record.advisory.clone(),
            record.datetime,
            record.valid_time(),
            record.isotach_radius,
        );
        match seen.get(&key) {
            Some(&index) => {
                duplicates += 1;
                if policy == DuplicatePolicy::LastWins {
                    kept[index] = record;
                }
            }
            None => {
                seen.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    if duplicates > 0 {
        debug!("Resolved {} duplicate records ({})", duplicates, policy);
    }
    kept
}

fn sort_records(records: &mut [TrackRecord]) {
    records.sort_by(|a, b| {
        a.valid_time()
            .cmp(&b.valid_time())
            .then_with(|| a.advisory.cmp(&b.advisory))
            .then_with(|| a.datetime.cmp(&b.datetime))
            .then_with(|| a.isotach_radius.cmp(&b.isotach_radius))
    });
}

impl StormTrack {
    fn build(key: StormKey, records: Vec<TrackRecord>, policy: DuplicatePolicy) -> Self {
        let mut records = deduplicate(records, policy);
        sort_records(&mut records);
        Self { key, records }
    }

    /// Assemble records that all belong to one storm. `None` when there are no records.
    pub fn from_records(
        records: Vec<TrackRecord>,
        policy: DuplicatePolicy,
    ) -> Result<Option<Self>, FetchError> {
        let mut tracks = assemble(records, policy);
        match tracks.len() {
            0 | 1 => Ok(tracks.pop()),
            _ => {
                let codes: Vec<String> = tracks
                    .iter()
                    .map(|track| track.nhc_code().to_string())
                    .collect();
                Err(FetchError::InvalidStorm(format!(
                    "records describe more than one storm: {}",
                    codes.join(", ")
                )))
            }
        }
    }

    /// Read a local ATCF or fort.22 file.
    #[instrument(skip(path, advisories), fields(path = %path.display()))]
    pub async fn from_file(
        path: &Path,
        advisories: Option<&[Advisory]>,
        policy: DuplicatePolicy,
    ) -> Result<Option<Self>, FetchError> {
        let read = read_atcf_file(path, advisories).await?;
        Self::from_records(read.records, policy)
    }

    pub fn key(&self) -> &StormKey {
        &self.key
    }

    pub fn nhc_code(&self) -> NhcCode {
        self.key.nhc_code()
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TrackRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most frequent storm name; the earliest seen wins a tie.
    pub fn name(&self) -> Option<String> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (index, name) in self
            .records
            .iter()
            .filter_map(|record| record.name.as_deref())
            .enumerate()
        {
            counts.entry(name).or_insert((0, index)).0 += 1;
        }
        counts
            .into_iter()
            .max_by(|(_, (a, a_first)), (_, (b, b_first))| a.cmp(b).then(b_first.cmp(a_first)))
            .map(|(name, _)| name.to_string())
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.records.first().map(TrackRecord::valid_time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(TrackRecord::valid_time)
    }

    pub fn interval(&self) -> Option<Interval> {
        Interval::new(self.start_time()?, self.end_time()?).ok()
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }

    /// Distinct advisories present, in precedence order.
    pub fn advisories(&self) -> Vec<Advisory> {
        let mut advisories: Vec<Advisory> =
            self.records.iter().map(|r| r.advisory.clone()).collect();
        advisories.sort();
        advisories.dedup();
        advisories
    }

    /// Records whose valid time lies within the closed interval.
    pub fn subset(&self, interval: &Interval) -> StormTrack {
        self.filtered(|record| interval.contains(record.valid_time()))
    }

    pub fn with_advisories(&self, advisories: &[Advisory]) -> StormTrack {
        self.filtered(|record| advisories.contains(&record.advisory))
    }

    fn filtered(&self, keep: impl Fn(&TrackRecord) -> bool) -> StormTrack {
        StormTrack {
            key: self.key.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub(crate) fn track_indices(&self) -> TrackIndices {
        let best_start = self
            .records
            .iter()
            .find(|record| record.advisory.is_best())
            .map(TrackRecord::valid_time);

        let mut tracks: TrackIndices = BTreeMap::new();
        for (index, record) in self.records.iter().enumerate() {
            let start = match (&record.advisory, best_start) {
                (Advisory::Best, Some(start)) => start,
                _ => record.datetime,
            };
            tracks
                .entry(record.advisory.clone())
                .or_default()
                .entry(start)
                .or_default()
                .push(index);
        }

        for (advisory, advisory_tracks) in tracks.iter_mut() {
            if !advisory.is_best() {
                for indices in advisory_tracks.values_mut() {
                    indices.sort_by_key(|&index| self.records[index].forecast_hours);
                }
            }
        }
        tracks
    }

    /// Separate into advisories and individual forecasts; the best track is one
    /// hindcast keyed by its first time.
    pub fn tracks(&self) -> Tracks<'_> {
        self.track_indices()
            .into_iter()
            .map(|(advisory, advisory_tracks)| {
                let advisory_tracks = advisory_tracks
                    .into_iter()
                    .map(|(start, indices)| {
                        (start, indices.iter().map(|&i| &self.records[i]).collect())
                    })
                    .collect();
                (advisory, advisory_tracks)
            })
            .collect()
    }

    /// Translation speed and bearing per record, aligned with [`StormTrack::records`].
    ///
    /// Computed along each individual track between consecutive distinct valid times;
    /// the first time of a track does not move.
    pub fn translations(&self) -> Vec<Translation> {
        let mut translations = vec![Translation::default(); self.records.len()];

        for advisory_tracks in self.track_indices().values() {
            for indices in advisory_tracks.values() {
                let mut previous: Option<(Point<f64>, DateTime<Utc>)> = None;
                let mut position = 0;

                while position < indices.len() {
                    let time = self.records[indices[position]].valid_time();
                    let group: Vec<usize> = indices[position..]
                        .iter()
                        .copied()
                        .take_while(|&index| self.records[index].valid_time() == time)
                        .collect();
                    let point = self.records[group[0]].location();

                    let translation = match previous {
                        Some((previous_point, previous_time)) => {
                            let seconds = (time - previous_time).num_seconds() as f64;
                            let distance = previous_point.geodesic_distance(&point);
                            Translation {
                                speed_mps: if seconds > 0.0 { distance / seconds } else { 0.0 },
                                bearing_deg: previous_point
                                    .geodesic_bearing(point)
                                    .rem_euclid(360.0),
                            }
                        }
                        None => Translation::default(),
                    };

                    for index in &group {
                        translations[*index] = translation;
                    }
                    previous = Some((point, time));
                    position += group.len();
                }
            }
        }

        translations
    }

    /// Geodesic length in metres of every individual track with more than one position.
    pub fn distances(&self) -> BTreeMap<Advisory, BTreeMap<DateTime<Utc>, f64>> {
        let mut distances = BTreeMap::new();

        for (advisory, advisory_tracks) in self.tracks() {
            let mut lengths = BTreeMap::new();
            for (start, records) in advisory_tracks {
                let mut points: Vec<Point<f64>> = records.iter().map(|r| r.location()).collect();
                points.dedup();
                if points.len() > 1 {
                    let length = points
                        .windows(2)
                        .map(|pair| pair[0].geodesic_distance(&pair[1]))
                        .sum::<f64>();
                    lengths.insert(start, length);
                }
            }
            distances.insert(advisory, lengths);
        }

        distances
    }

    /// Fill missing OFCL radius of maximum winds, background pressure and central
    /// pressure from the CARQ track issued at the same time (or the first CARQ track).
    ///
    /// Central pressure preserves the mean Holland B of the CARQ track.
    pub fn fill_forecast_gaps(&self) -> StormTrack {
        let tracks = self.track_indices();
        let (Some(official), Some(carq)) =
            (tracks.get(&Advisory::Ofcl), tracks.get(&Advisory::Carq))
        else {
            return self.clone();
        };

        let mut records = self.records.clone();
        let mut filled = 0;

        for (start, forecast) in official {
            let Some(reference) = carq.get(start).or_else(|| carq.values().next()) else {
                continue;
            };
            let Some(first) = reference.first().map(|&index| &self.records[index]) else {
                continue;
            };
            let holland_b = mean_holland_b(reference.iter().map(|&index| &self.records[index]));

            for &index in forecast {
                let record = &mut records[index];
                if record.radius_of_maximum_winds.is_none() {
                    record.radius_of_maximum_winds = first.radius_of_maximum_winds;
                    filled += 1;
                }
                if record.background_pressure.is_none() {
                    record.background_pressure = first.central_pressure;
                    filled += 1;
                }
                if record.central_pressure.is_none() {
                    if let (Some(b), Some(vmax), Some(radp)) = (
                        holland_b,
                        record.max_sustained_wind_speed,
                        record.background_pressure,
                    ) {
                        let pressure = holland_central_pressure(vmax, radp, b);
                        if pressure.is_finite() {
                            record.central_pressure = Some(pressure.round() as i32);
                            filled += 1;
                        }
                    }
                }
            }
        }

        debug!("Filled {} missing OFCL values from CARQ", filled);
        StormTrack {
            key: self.key.clone(),
            records,
        }
    }

    /// Fill missing direction (degrees) and speed (knots) from computed translations.
    pub fn fill_motion(&self) -> StormTrack {
        let translations = self.translations();
        let records = self
            .records
            .iter()
            .zip(translations)
            .map(|(record, translation)| {
                let mut record = record.clone();
                if record.direction.is_none() {
                    record.direction = Some(translation.bearing_deg.round() as i32 % 360);
                }
                if record.speed.is_none() {
                    record.speed = Some(translation.speed_knots().round() as i32);
                }
                record
            })
            .collect();
        StormTrack {
            key: self.key.clone(),
            records,
        }
    }
}

impl fmt::Display for StormTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let advisories: Vec<String> = self.advisories().iter().map(|a| a.to_string()).collect();
        write!(
            f,
            "{} ({}) track with {} entries over {} hours",
            self.nhc_code(),
            advisories.join(" + "),
            self.records.len(),
            self.duration().num_hours()
        )
    }
}

/// `B = vmax^2 * rho * e / (radp - mslp)`
pub fn holland_b(
    max_sustained_wind_speed: f64,
    background_pressure: f64,
    central_pressure: f64,
) -> f64 {
    max_sustained_wind_speed.powi(2) * HOLLAND_RHO * std::f64::consts::E
        / (background_pressure - central_pressure)
}

/// Central pressure that preserves `holland_b` for the given wind and background pressure.
pub fn holland_central_pressure(
    max_sustained_wind_speed: i32,
    background_pressure: i32,
    holland_b: f64,
) -> f64 {
    -f64::from(max_sustained_wind_speed).powi(2) * HOLLAND_RHO * std::f64::consts::E / holland_b
        + f64::from(background_pressure)
}

fn mean_holland_b<'a>(records: impl Iterator<Item = &'a TrackRecord>) -> Option<f64> {
    let values: Vec<f64> = records
        .filter_map(|record| {
            let vmax = record.max_sustained_wind_speed?;
            let radp = record.background_pressure?;
            let mslp = record.central_pressure?;
            Some(holland_b(f64::from(vmax), f64::from(radp), f64::from(mslp)))
        })
        .filter(|b| b.is_finite())
        .collect();

    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (mean != 0.0).then_some(mean)
}
