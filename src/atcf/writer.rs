// Writers for ATCF (`*.dat`) and ADCIRC forcing (`fort.22`) files
//
// fort.22 reference: https://wiki.adcirc.org/wiki/Fort.22_file

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::atcf::record::{pad, Advisory, Layout, TrackRecord};
use crate::fetch_error::FetchError;
use crate::nhc::track::StormTrack;

const FORT22_LAYOUT: Layout = Layout {
    gust_width: 5,
    direction_width: 3,
    name_width: 12,
};

/// Pressure (mb) below which a background pressure must exceed the central pressure.
const AMBIENT_PRESSURE: i32 = 1013;

fn selected<'a>(
    track: &'a StormTrack,
    advisory: Option<&'a Advisory>,
) -> impl Iterator<Item = &'a TrackRecord> {
    track
        .records()
        .iter()
        .filter(move |record| advisory.map_or(true, |advisory| &record.advisory == advisory))
}

pub fn atcf_lines(track: &StormTrack, advisory: Option<&Advisory>) -> Vec<String> {
    selected(track, advisory)
        .map(TrackRecord::to_atcf_line)
        .collect()
}

/// fort.22 lines for the NWS=20 family of ADCIRC wind models.
///
/// Trailing ATCF fields are dropped and a record number (1-based index of the record's
/// valid time) is appended. Background pressure is forward-filled and kept above the
/// central pressure; missing direction and speed come from the track's translations.
pub fn fort22_lines(track: &StormTrack, advisory: Option<&Advisory>) -> Vec<String> {
    let track = track.fill_motion();
    let storm_name = track.name();

    let mut valid_times: Vec<DateTime<Utc>> = selected(&track, advisory)
        .map(TrackRecord::valid_time)
        .collect();
    valid_times.sort();
    valid_times.dedup();

    let mut background_pressure = None;

    selected(&track, advisory)
        .map(|record| {
            let mut record = record.clone();

            match record.background_pressure {
                Some(pressure) => background_pressure = Some(pressure),
                None => record.background_pressure = background_pressure,
            }
            if let (Some(central), Some(background)) =
                (record.central_pressure, record.background_pressure)
            {
                if background <= central && central < AMBIENT_PRESSURE {
                    record.background_pressure = Some(central + 1);
                }
            }

            if record.name.is_none() {
                record.name = storm_name.clone();
            }

            let valid_time = record.valid_time();
            let record_number = valid_times.partition_point(|time| *time < valid_time) + 1;

            let mut columns = record.columns(&FORT22_LAYOUT);
            columns.push(pad(&record_number.to_string(), 4));
            columns.join(",")
        })
        .collect()
}

/// Write `track` as ATCF (`*.dat`) or fort.22 (`*.22`), chosen by extension.
///
/// Returns `false` when the file exists and `overwrite` is not set.
#[instrument(skip(track, path, advisory), fields(path = %path.display(), storm = %track.nhc_code()))]
pub async fn write_track(
    track: &StormTrack,
    path: &Path,
    advisory: Option<&Advisory>,
    overwrite: bool,
) -> Result<bool, FetchError> {
    let lines = match path.extension().and_then(|extension| extension.to_str()) {
        Some("dat") => atcf_lines(track, advisory),
        Some("22") => fort22_lines(track, advisory),
        _ => return Err(FetchError::UnsupportedFormat(path.display().to_string())),
    };

    if !overwrite && tokio::fs::try_exists(path).await? {
        warn!("Skipping existing file {}", path.display());
        return Ok(false);
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    tokio::fs::write(path, contents).await?;
    debug!("Wrote {} lines", lines.len());

    Ok(true)
}

impl StormTrack {
    pub async fn to_file(
        &self,
        path: &Path,
        advisory: Option<&Advisory>,
        overwrite: bool,
    ) -> Result<bool, FetchError> {
        write_track(self, path, advisory, overwrite).await
    }
}
