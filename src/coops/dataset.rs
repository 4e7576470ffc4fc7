use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coops::query::StationSeries;

/// Readings of several stations on a shared time axis.
///
/// `values[station][time]` is `None` where a station has no reading at that time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoopsDataset {
    pub stations: Vec<String>,
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CoopsDataset {
    /// Grid over the union of all timestamps, stations in input order.
    pub fn from_series(series: &[StationSeries]) -> Self {
        let times: Vec<DateTime<Utc>> = series
            .iter()
            .flat_map(|s| s.readings.iter().map(|reading| reading.time))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let values = series
            .iter()
            .map(|s| {
                let mut row = vec![None; times.len()];
                for reading in &s.readings {
                    if let Ok(index) = times.binary_search(&reading.time) {
                        row[index] = reading.value;
                    }
                }
                row
            })
            .collect();

        CoopsDataset {
            stations: series.iter().map(|s| s.station.clone()).collect(),
            times,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() || self.times.is_empty()
    }

    pub fn station(&self, station: &str) -> Option<&[Option<f64>]> {
        let index = self.stations.iter().position(|s| s == station)?;
        self.values.get(index).map(Vec::as_slice)
    }

    pub fn value(&self, station: &str, time: DateTime<Utc>) -> Option<f64> {
        let index = self.times.binary_search(&time).ok()?;
        self.station(station)?.get(index).copied().flatten()
    }
}
