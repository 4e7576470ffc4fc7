use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;
use crate::utils::NhcCode;

const STORM_LIST_COLUMNS: usize = 21;
const NO_DATE: &str = "9999999999";

/// One row of the NHC storm list (`index/storm_list.txt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NhcStorm {
    pub nhc_code: String,
    pub name: String,
    pub basin: String,
    pub number: u32,
    pub year: i32,
    /// Strongest development level reached, e.g. `HU`, `TS`.
    pub class: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// `ARCHIVE` once the storm's files have moved to the yearly archive.
    pub source: Option<String>,
}

impl NhcStorm {
    pub fn code(&self) -> Result<NhcCode, FetchError> {
        self.nhc_code.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StormQuery {
    Name { name: String, year: i32 },
    Number { basin: String, number: u32, year: i32 },
    Code(NhcCode),
}

impl StormQuery {
    pub fn name(name: &str, year: i32) -> Self {
        StormQuery::Name {
            name: name.trim().to_uppercase(),
            year,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            StormQuery::Name { year, .. } | StormQuery::Number { year, .. } => *year,
            StormQuery::Code(code) => code.year,
        }
    }
}

/// Parse the headerless storm list CSV. Rows that do not parse are logged and skipped.
#[instrument(skip(text), fields(text_size = text.len()))]
pub fn parse_storm_list(text: &str) -> Result<Vec<NhcStorm>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut storms = Vec::new();
    let mut skipped = 0;

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        match parse_row(&row) {
            Ok(storm) => storms.push(storm),
            Err(e) => {
                warn!("Skipping storm list row {}: {}", index + 1, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable storm list rows", skipped);
    }
    debug!("Parsed {} storms", storms.len());

    Ok(storms)
}

fn parse_row(row: &csv::StringRecord) -> Result<NhcStorm, FetchError> {
    if row.len() < STORM_LIST_COLUMNS {
        return Err(FetchError::ParseError(format!(
            "expected {} columns, found {}",
            STORM_LIST_COLUMNS,
            row.len()
        )));
    }
    let column = |index: usize| row.get(index).unwrap_or("").trim();
    let text = |index: usize| Some(column(index)).filter(|v| !v.is_empty()).map(String::from);

    let basin = column(1).to_uppercase();
    let number: u32 = column(7)
        .parse()
        .map_err(|_| FetchError::ParseError(format!("invalid storm number {:?}", column(7))))?;
    let year: i32 = column(8)
        .parse()
        .map_err(|_| FetchError::ParseError(format!("invalid year {:?}", column(8))))?;

    let nhc_code = match text(20) {
        Some(code) => code.to_uppercase(),
        None => NhcCode::new(&basin, number, year).to_string(),
    };

    Ok(NhcStorm {
        nhc_code,
        name: column(0).to_uppercase(),
        basin,
        number,
        year,
        class: text(9),
        start_date: parse_storm_date(column(11))?,
        end_date: parse_storm_date(column(12))?,
        source: text(18),
    })
}

fn parse_storm_date(value: &str) -> Result<Option<DateTime<Utc>>, FetchError> {
    if value.is_empty() || value == NO_DATE {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(&format!("{value}00"), "%Y%m%d%H%M")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| FetchError::DateTimeError(format!("{value}: {e}")))
}

/// Exact name matches win over substring matches; the first match in list order is kept.
pub fn find_storm<'a>(storms: &'a [NhcStorm], query: &StormQuery) -> Option<&'a NhcStorm> {
    match query {
        StormQuery::Name { name, year } => {
            let name = name.trim().to_uppercase();
            let in_year = || storms.iter().filter(move |storm| storm.year == *year);
            in_year()
                .find(|storm| storm.name == name)
                .or_else(|| in_year().find(|storm| storm.name.contains(&name)))
        }
        StormQuery::Number {
            basin,
            number,
            year,
        } => storms.iter().find(|storm| {
            storm.basin.eq_ignore_ascii_case(basin.trim())
                && storm.number == *number
                && storm.year == *year
        }),
        StormQuery::Code(code) => {
            let code = code.to_string();
            storms.iter().find(|storm| storm.nhc_code == code)
        }
    }
}
