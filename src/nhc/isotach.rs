//! Isotachs (contours of constant wind speed) and the swaths they sweep along a track.
//!
//! Quadrant radii are read as geographic quadrants (NE covers bearings 0-90, and so
//! on clockwise); each quadrant becomes a pie slice around the storm centre.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::{
    BooleanOps, ConvexHull, Coord, GeodesicDestination, LineString, MultiPolygon, Point, Polygon,
};
use tracing::debug;

use crate::atcf::record::{Advisory, TrackRecord};
use crate::nhc::track::StormTrack;
use crate::spatial::{Located, Region};

pub const ISOTACH_WIND_SPEEDS: [i32; 3] = [34, 50, 64];
pub const DEFAULT_SEGMENTS: usize = 91;
const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IsotachError {
    #[error("isotach must be one of 34, 50 or 64 knots, got {0}")]
    InvalidWindSpeed(i32),
    #[error("at least two segments per quadrant are required, got {0}")]
    TooFewSegments(usize),
}

/// Isotach polygons keyed by advisory, track start and valid time.
pub type Isotachs =
    BTreeMap<Advisory, BTreeMap<DateTime<Utc>, BTreeMap<DateTime<Utc>, MultiPolygon<f64>>>>;

/// Wind swath polygons keyed by advisory and track start.
pub type WindSwaths = BTreeMap<Advisory, BTreeMap<DateTime<Utc>, MultiPolygon<f64>>>;

pub(crate) fn validate(wind_speed: i32, segments: usize) -> Result<(), IsotachError> {
    if !ISOTACH_WIND_SPEEDS.contains(&wind_speed) {
        return Err(IsotachError::InvalidWindSpeed(wind_speed));
    }
    if segments < 2 {
        return Err(IsotachError::TooFewSegments(segments));
    }
    Ok(())
}

fn quadrant(center: Point<f64>, start_bearing: f64, radius_m: f64, segments: usize) -> Polygon<f64> {
    let step = 90.0 / (segments - 1) as f64;
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(segments + 2);
    coords.push(center.into());
    for index in 0..segments {
        let bearing = start_bearing + step * index as f64;
        coords.push(center.geodesic_destination(bearing, radius_m).into());
    }
    coords.push(center.into());
    Polygon::new(LineString::new(coords), vec![])
}

/// Union of the non-zero quadrants of one record; `None` when every radius is empty.
pub fn isotach_polygon(record: &TrackRecord, segments: usize) -> Option<MultiPolygon<f64>> {
    let center = record.location();
    let quadrants: Vec<Polygon<f64>> = record
        .isotach_radii
        .iter()
        .enumerate()
        .filter_map(|(index, radius)| {
            let radius = (*radius)?;
            (radius > 0).then(|| {
                quadrant(
                    center,
                    90.0 * index as f64,
                    f64::from(radius) * METERS_PER_NAUTICAL_MILE,
                    segments,
                )
            })
        })
        .collect();

    union_all(quadrants.into_iter().map(|polygon| MultiPolygon::new(vec![polygon])))
}

fn union_all(shapes: impl Iterator<Item = MultiPolygon<f64>>) -> Option<MultiPolygon<f64>> {
    shapes.reduce(|merged, shape| merged.union(&shape))
}

impl StormTrack {
    /// Isotach at `wind_speed` knots for every record reporting that radius.
    pub fn isotachs(&self, wind_speed: i32, segments: usize) -> Result<Isotachs, IsotachError> {
        validate(wind_speed, segments)?;

        let mut isotachs: Isotachs = BTreeMap::new();
        for (advisory, advisory_tracks) in self.tracks() {
            let mut advisory_isotachs = BTreeMap::new();
            for (start, records) in advisory_tracks {
                let track_isotachs: BTreeMap<DateTime<Utc>, MultiPolygon<f64>> = records
                    .iter()
                    .filter(|record| record.isotach_radius == Some(wind_speed))
                    .filter_map(|record| {
                        isotach_polygon(record, segments).map(|polygon| (record.valid_time(), polygon))
                    })
                    .collect();
                if !track_isotachs.is_empty() {
                    advisory_isotachs.insert(start, track_isotachs);
                }
            }
            if !advisory_isotachs.is_empty() {
                isotachs.insert(advisory, advisory_isotachs);
            }
        }

        Ok(isotachs)
    }

    /// Area swept by the `wind_speed` isotach along each individual track: the union of
    /// the convex hulls of consecutive isotach pairs.
    pub fn wind_swaths(&self, wind_speed: i32, segments: usize) -> Result<WindSwaths, IsotachError> {
        let isotachs = self.isotachs(wind_speed, segments)?;

        let mut swaths: WindSwaths = BTreeMap::new();
        for (advisory, advisory_isotachs) in isotachs {
            let mut advisory_swaths = BTreeMap::new();
            for (start, track_isotachs) in advisory_isotachs {
                let polygons: Vec<&MultiPolygon<f64>> = track_isotachs.values().collect();
                let hulls = polygons.windows(2).map(|pair| {
                    let hull = pair[0].union(pair[1]).convex_hull();
                    MultiPolygon::new(vec![hull])
                });
                if let Some(swath) = union_all(hulls) {
                    advisory_swaths.insert(start, swath);
                }
            }
            if !advisory_swaths.is_empty() {
                swaths.insert(advisory, advisory_swaths);
            }
        }

        Ok(swaths)
    }

    /// Union of every wind swath of the track, as a query region.
    pub fn wind_swath_region(&self, wind_speed: i32, segments: usize) -> Result<Region, IsotachError> {
        let swaths = self.wind_swaths(wind_speed, segments)?;
        let region = union_all(swaths.into_values().flat_map(|tracks| tracks.into_values()))
            .unwrap_or_else(|| MultiPolygon::new(vec![]));
        debug!("Wind swath region has {} polygons", region.0.len());
        Ok(Region::from(region))
    }
}
