use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use geo::{point, Point};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fetch_error::FetchError;
use crate::fetcher::selector;
use crate::spatial::Located;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationType {
    Current,
    Historical,
}

impl StationType {
    pub const ALL: [StationType; 2] = [StationType::Current, StationType::Historical];

    fn table_id(&self) -> &'static str {
        match self {
            StationType::Current => "NWSTable",
            StationType::Historical => "HistNWSTable",
        }
    }
}

/// A CO-OPS station as listed on the NWS products page. Historical entries repeat a
/// station once per removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoopsStation {
    pub nos_id: i64,
    pub nws_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub state: Option<String>,
    pub name: String,
    pub removed: Option<DateTime<Utc>>,
    pub station_type: StationType,
}

impl Located for CoopsStation {
    fn location(&self) -> Point<f64> {
        point!(x: self.longitude, y: self.latitude)
    }
}

/// One row of a station's harmonic constituents table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub number: u32,
    pub name: String,
    pub amplitude: f64,
    pub phase: f64,
    /// Degrees per hour.
    pub speed: f64,
    pub description: Option<String>,
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Header names mapped to column positions, plus the text of every body row.
struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn read(table: ElementRef<'_>) -> Result<Self, FetchError> {
        let header_cells = selector("th")?;
        let row_selector = selector("tr")?;
        let data_cells = selector("td")?;

        let columns = table
            .select(&header_cells)
            .map(cell_text)
            .enumerate()
            .map(|(index, name)| (name, index))
            .collect();

        let rows = table
            .select(&row_selector)
            .map(|row| row.select(&data_cells).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();

        Ok(Table { columns, rows })
    }

    fn column(&self, name: &'static str) -> Result<usize, FetchError> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| FetchError::ParseError(format!("table has no {name:?} column")))
    }
}

/// Parse one station table of the NWS products page. A missing table is an empty list.
pub fn parse_stations(html: &str, station_type: StationType) -> Result<Vec<CoopsStation>, FetchError> {
    let document = Html::parse_document(html);
    let table_selector = selector(&format!("table#{}", station_type.table_id()))?;

    let Some(element) = document.select(&table_selector).next() else {
        warn!("No {} table on the CO-OPS stations page", station_type.table_id());
        return Ok(Vec::new());
    };
    let table = Table::read(element)?;

    let nos_id = table.column("NOS ID")?;
    let nws_id = table.column("NWS ID")?;
    let latitude = table.column("Latitude")?;
    let longitude = table.column("Longitude")?;
    let name = table.column("Station Name")?;
    let state = table.column("State").ok();
    let removed = match station_type {
        StationType::Historical => table.column("Removed Date/Time").ok(),
        StationType::Current => None,
    };

    let mut stations = Vec::with_capacity(table.rows.len());
    let mut skipped = 0;

    for row in &table.rows {
        let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("");
        let optional = |index: Option<usize>| {
            index
                .map(cell)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let parsed = (
            cell(nos_id).parse::<i64>(),
            cell(latitude).parse::<f64>(),
            cell(longitude).parse::<f64>(),
        );
        let (Ok(id), Ok(lat), Ok(lon)) = parsed else {
            debug!("Skipping station row {:?}", row);
            skipped += 1;
            continue;
        };

        stations.push(CoopsStation {
            nos_id: id,
            nws_id: optional(Some(nws_id)),
            latitude: lat,
            longitude: lon,
            state: optional(state),
            name: cell(name).to_string(),
            removed: optional(removed).as_deref().and_then(parse_removed),
            station_type,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable station rows", skipped);
    }
    debug!("Parsed {} {:?} stations", stations.len(), station_type);
    Ok(stations)
}

fn parse_removed(value: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Parse the harmonic constituents table (`table.table.table-striped`) of `harcon.html`.
pub fn parse_constituents(html: &str) -> Result<Vec<Constituent>, FetchError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.table.table-striped")?;

    let Some(element) = document.select(&table_selector).next() else {
        return Ok(Vec::new());
    };
    let table = Table::read(element)?;

    let number = table.column("Constituent #")?;
    let name = table.column("Name")?;
    let amplitude = table.column("Amplitude")?;
    let phase = table.column("Phase")?;
    let speed = table.column("Speed")?;
    let description = table.column("Description").ok();

    let mut constituents = Vec::with_capacity(table.rows.len());
    let mut skipped = 0;

    for row in &table.rows {
        let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("");

        let parsed = (
            cell(number).parse::<u32>(),
            cell(amplitude).parse::<f64>(),
            cell(phase).parse::<f64>(),
            cell(speed).parse::<f64>(),
        );
        let (Ok(number), Ok(amplitude), Ok(phase), Ok(speed)) = parsed else {
            debug!("Skipping constituent row {:?}", row);
            skipped += 1;
            continue;
        };

        constituents.push(Constituent {
            number,
            name: cell(name).to_string(),
            amplitude,
            phase,
            speed,
            description: description
                .map(cell)
                .filter(|value| !value.is_empty())
                .map(String::from),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable constituent rows", skipped);
    }
    Ok(constituents)
}
