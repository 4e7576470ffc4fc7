//! CO-OPS data API requests and responses
//!
//! API reference: https://api.tidesandcurrents.noaa.gov/api/prod/

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::fetch_error::FetchError;

const APPLICATION: &str = "storm-events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Preliminary or verified water levels, depending on availability.
    #[default]
    WaterLevel,
    AirTemperature,
    WaterTemperature,
    /// Speed, direction and gusts.
    Wind,
    AirPressure,
    /// Distance between a bridge and the water's surface.
    AirGap,
    Conductivity,
    Visibility,
    Humidity,
    Salinity,
    HourlyHeight,
    HighLow,
    DailyMean,
    MonthlyMean,
    OneMinuteWaterLevel,
    Predictions,
    Datums,
    Currents,
    CurrentsPredictions,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::WaterLevel => "water_level",
            Product::AirTemperature => "air_temperature",
            Product::WaterTemperature => "water_temperature",
            Product::Wind => "wind",
            Product::AirPressure => "air_pressure",
            Product::AirGap => "air_gap",
            Product::Conductivity => "conductivity",
            Product::Visibility => "visibility",
            Product::Humidity => "humidity",
            Product::Salinity => "salinity",
            Product::HourlyHeight => "hourly_height",
            Product::HighLow => "high_low",
            Product::DailyMean => "daily_mean",
            Product::MonthlyMean => "monthly_mean",
            Product::OneMinuteWaterLevel => "one_minute_water_level",
            Product::Predictions => "predictions",
            Product::Datums => "datums",
            Product::Currents => "currents",
            Product::CurrentsPredictions => "currents_predictions",
        }
    }
}

/// Tidal datum the water levels are referenced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Datum {
    /// Columbia River Datum
    Crd,
    /// International Great Lakes Datum
    Igld,
    /// Great Lakes Low Water Datum
    Lwd,
    Mhhw,
    Mhw,
    Mtl,
    Msl,
    Mlw,
    #[default]
    Mllw,
    Navd,
    /// Station datum
    Stnd,
}

impl Datum {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datum::Crd => "CRD",
            Datum::Igld => "IGLD",
            Datum::Lwd => "LWD",
            Datum::Mhhw => "MHHW",
            Datum::Mhw => "MHW",
            Datum::Mtl => "MTL",
            Datum::Msl => "MSL",
            Datum::Mlw => "MLW",
            Datum::Mllw => "MLLW",
            Datum::Navd => "NAVD",
            Datum::Stnd => "STND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    English,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::English => "english",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeZone {
    #[default]
    Gmt,
    /// Local standard time of the station.
    Lst,
    /// Local standard / daylight time of the station.
    LstLdt,
}

impl TimeZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeZone::Gmt => "gmt",
            TimeZone::Lst => "lst",
            TimeZone::LstLdt => "lst_ldt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingInterval {
    /// Hourly met data and harmonic predictions.
    #[default]
    H,
    /// High / low tide predictions.
    Hilo,
}

impl SamplingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingInterval::H => "h",
            SamplingInterval::Hilo => "hilo",
        }
    }
}

macro_rules! display_as_str {
    ($($name:ty),*) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Product, Datum, Units, TimeZone, SamplingInterval);

/// Everything about a CO-OPS request except the station and time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub product: Product,
    pub datum: Datum,
    pub units: Units,
    pub time_zone: TimeZone,
    pub interval: SamplingInterval,
}

impl QueryOptions {
    pub fn product(product: Product) -> Self {
        QueryOptions {
            product,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoopsQuery {
    /// NOS station id.
    pub station: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub options: QueryOptions,
}

impl CoopsQuery {
    pub fn new(station: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        CoopsQuery {
            station: station.trim().to_string(),
            start,
            end,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let options = &self.options;
        vec![
            ("station", self.station.clone()),
            ("begin_date", self.start.format("%Y%m%d %H:%M").to_string()),
            ("end_date", self.end.format("%Y%m%d %H:%M").to_string()),
            ("product", options.product.to_string()),
            ("datum", options.datum.to_string()),
            ("units", options.units.to_string()),
            ("time_zone", options.time_zone.to_string()),
            ("interval", options.interval.to_string()),
            ("format", "json".to_string()),
            ("application", APPLICATION.to_string()),
        ]
    }
}

/// One timed row of a product.
///
/// `value` is the principal column of the product: `v` for water levels, met data and
/// predictions, the speed `s` for wind and currents, `MSL` for monthly means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoopsReading {
    pub time: DateTime<Utc>,
    pub value: Option<f64>,
    /// Standard deviation of the samples behind a 6 minute value.
    pub sigma: Option<f64>,
    /// Degrees true.
    pub direction: Option<f64>,
    /// Compass point, e.g. `NNE`.
    pub compass: Option<String>,
    pub gust: Option<f64>,
    /// `H`, `HH`, `L` or `LL`.
    pub tide_type: Option<String>,
    /// Current meter bin.
    pub bin: Option<String>,
    pub flags: Option<String>,
    pub quality: Option<String>,
    /// Columns without a field above.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, JsonValue>,
}

impl CoopsReading {
    /// Reading at `time` with every column empty.
    pub fn at(time: DateTime<Utc>) -> Self {
        CoopsReading {
            time,
            value: None,
            sigma: None,
            direction: None,
            compass: None,
            gust: None,
            tide_type: None,
            bin: None,
            flags: None,
            quality: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Elevation of a tidal datum (`datums` product), e.g. `MHHW`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumValue {
    pub name: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationSeries {
    pub station: String,
    pub readings: Vec<CoopsReading>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datums: Vec<DatumValue>,
}

impl StationSeries {
    pub fn empty(station: &str) -> Self {
        StationSeries {
            station: station.to_string(),
            readings: Vec::new(),
            datums: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty() && self.datums.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    data: Option<Vec<RawReading>>,
    #[serde(default)]
    predictions: Option<Vec<RawReading>>,
    #[serde(default)]
    current_predictions: Option<RawCurrentPredictions>,
    #[serde(default)]
    datums: Option<Vec<RawDatum>>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawCurrentPredictions {
    #[serde(default)]
    cp: Vec<RawReading>,
}

#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(default, alias = "Time")]
    t: Option<String>,
    #[serde(default, alias = "Velocity_Major")]
    v: Option<JsonValue>,
    #[serde(default)]
    s: Option<JsonValue>,
    #[serde(default)]
    d: Option<JsonValue>,
    #[serde(default)]
    dr: Option<String>,
    #[serde(default)]
    g: Option<JsonValue>,
    #[serde(default, alias = "type")]
    ty: Option<String>,
    #[serde(default, alias = "Bin")]
    b: Option<JsonValue>,
    #[serde(default)]
    f: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawDatum {
    n: String,
    #[serde(default)]
    v: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    message: String,
}

/// Parse a `format=json` response of `product`. An API `error` payload means no data
/// and yields an empty series.
pub fn parse_response(
    station: &str,
    product: Product,
    text: &str,
) -> Result<StationSeries, FetchError> {
    let response: RawResponse = serde_json::from_str(text)?;

    if let Some(error) = response.error {
        warn!("No CO-OPS data for station {}: {}", station, error.message);
        return Ok(StationSeries::empty(station));
    }

    let datums: Vec<DatumValue> = response
        .datums
        .unwrap_or_default()
        .into_iter()
        .map(|datum| DatumValue {
            name: datum.n.trim().to_string(),
            value: number(datum.v),
        })
        .collect();

    let rows = response
        .data
        .or(response.predictions)
        .or(response.current_predictions.map(|predictions| predictions.cp))
        .unwrap_or_default();
    let readings = rows
        .into_iter()
        .map(|row| reading(product, row))
        .collect::<Result<Vec<_>, FetchError>>()?;

    debug!(
        "Parsed {} readings and {} datums for station {}",
        readings.len(),
        datums.len(),
        station
    );
    Ok(StationSeries {
        station: station.to_string(),
        readings,
        datums,
    })
}

fn reading(product: Product, mut row: RawReading) -> Result<CoopsReading, FetchError> {
    let time = match row.t.as_deref() {
        Some(t) => parse_time(t)?,
        None => month_start(&row.extra)?,
    };

    // wind and currents report their speed in `s`, which is sigma elsewhere
    let (value, sigma) = match product {
        Product::Wind | Product::Currents => (number(row.s), None),
        Product::MonthlyMean => (row.extra.remove("MSL").and_then(|msl| number(Some(msl))), None),
        _ => (number(row.v), number(row.s)),
    };

    Ok(CoopsReading {
        time,
        value,
        sigma,
        direction: number(row.d),
        compass: row.dr.filter(|dr| !dr.trim().is_empty()),
        gust: number(row.g),
        tide_type: row.ty.filter(|ty| !ty.trim().is_empty()),
        bin: row.b.and_then(|b| match b {
            JsonValue::String(text) if !text.trim().is_empty() => Some(text),
            JsonValue::Number(number) => Some(number.to_string()),
            _ => None,
        }),
        flags: row.f.filter(|f| !f.is_empty()),
        quality: row.q.filter(|q| !q.is_empty()),
        extra: row.extra,
    })
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, FetchError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc())
        .map_err(|e| FetchError::DateTimeError(format!("{value}: {e}")))
}

// monthly means carry `year` and `month` columns instead of `t`
fn month_start(columns: &BTreeMap<String, JsonValue>) -> Result<DateTime<Utc>, FetchError> {
    let field = |name: &str| columns.get(name).cloned().and_then(|value| number(Some(value)));
    let (Some(year), Some(month)) = (field("year"), field("month")) else {
        return Err(FetchError::DateTimeError("row without a time".to_string()));
    };
    NaiveDate::from_ymd_opt(year as i32, month as u32, 1)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| FetchError::DateTimeError(format!("invalid month {year}-{month}")))
}

// values arrive as strings ("1.234"), occasionally as numbers, and blank when missing
fn number(value: Option<JsonValue>) -> Option<f64> {
    match value? {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn test_default_params() {
        let query = CoopsQuery::new(
            "8724580",
            Utc.with_ymd_and_hms(2017, 9, 9, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2017, 9, 12, 6, 30, 0).unwrap(),
        );
        let params = query.params();
        let value = |name: &str| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(value("station"), Some("8724580"));
        assert_eq!(value("begin_date"), Some("20170909 00:00"));
        assert_eq!(value("end_date"), Some("20170912 06:30"));
        assert_eq!(value("product"), Some("water_level"));
        assert_eq!(value("datum"), Some("MLLW"));
        assert_eq!(value("units"), Some("metric"));
        assert_eq!(value("time_zone"), Some("gmt"));
        assert_eq!(value("interval"), Some("h"));
        assert_eq!(value("format"), Some("json"));
    }

    #[test]
    fn test_options_override() {
        let query = CoopsQuery::new("8724580", Utc::now(), Utc::now()).with_options(QueryOptions {
            datum: Datum::Navd,
            units: Units::English,
            ..QueryOptions::product(Product::Wind)
        });
        let params = query.params();
        assert!(params.contains(&("product", "wind".to_string())));
        assert!(params.contains(&("datum", "NAVD".to_string())));
        assert!(params.contains(&("units", "english".to_string())));
    }

    #[test]
    fn test_parse_response() {
        let text = r#"{"metadata": {"id": "8724580", "name": "Key West", "lat": "24.5508", "lon": "-81.8081"},
            "data": [
                {"t": "2017-09-10 12:00", "v": "1.234", "s": "0.003", "f": "0,0,0,0", "q": "p"},
                {"t": "2017-09-10 13:00", "v": "", "s": "", "f": "1,0,0,0", "q": "p"}
            ]}"#;
        let series = parse_response("8724580", Product::WaterLevel, text).unwrap();
        assert_eq!(series.readings.len(), 2);
        assert_eq!(
            series.readings[0].time,
            Utc.with_ymd_and_hms(2017, 9, 10, 12, 0, 0).unwrap()
        );
        assert_eq!(series.readings[0].value, Some(1.234));
        assert_eq!(series.readings[0].quality.as_deref(), Some("p"));
        assert_eq!(series.readings[1].value, None);
    }

    #[test]
    fn test_error_payload_is_empty_series() {
        let text = r#"{"error": {"message": "No data was found. This product may not be offered at this station at the requested time."}}"#;
        let series = parse_response("8724580", Product::WaterLevel, text).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.station, "8724580");
    }

    #[test]
    fn test_wind_speed_is_the_value() {
        let text = r#"{"data": [
            {"t": "2017-09-10 12:00", "s": "23.14", "d": "35.00", "dr": "NE", "g": "30.57", "f": "0,0"},
            {"t": "2017-09-10 13:00", "s": "", "d": "", "dr": "", "g": "", "f": "1,1"}
        ]}"#;
        let series = parse_response("8724580", Product::Wind, text).unwrap();
        let first = &series.readings[0];
        assert_eq!(first.value, Some(23.14));
        assert_eq!(first.sigma, None);
        assert_eq!(first.direction, Some(35.0));
        assert_eq!(first.compass.as_deref(), Some("NE"));
        assert_eq!(first.gust, Some(30.57));
        assert_eq!(series.readings[1].value, None);
        assert_eq!(series.readings[1].compass, None);
    }

    #[test]
    fn test_high_low_types() {
        let text = r#"{"data": [
            {"t": "2017-09-10 04:12", "v": "0.981", "ty": "HH", "f": "0,0,0,0"},
            {"t": "2017-09-10 10:30", "v": "0.102", "ty": "L ", "f": "0,0,0,0"}
        ]}"#;
        let series = parse_response("8724580", Product::HighLow, text).unwrap();
        assert_eq!(series.readings[0].tide_type.as_deref(), Some("HH"));
        assert_eq!(series.readings[1].value, Some(0.102));

        let text = r#"{"predictions": [{"t": "2017-09-10 04:06", "v": "0.912", "type": "H"}]}"#;
        let series = parse_response("8724580", Product::Predictions, text).unwrap();
        assert_eq!(series.readings[0].tide_type.as_deref(), Some("H"));
    }

    #[test]
    fn test_datums() {
        let text = r#"{"datums": [{"n": "MHHW", "v": "2.131"}, {"n": "MLLW", "v": "1.576"}, {"n": "LAT", "v": ""}]}"#;
        let series = parse_response("8724580", Product::Datums, text).unwrap();
        assert!(!series.is_empty());
        assert!(series.readings.is_empty());
        assert_eq!(series.datums.len(), 3);
        assert_eq!(series.datums[0].name, "MHHW");
        assert_eq!(series.datums[1].value, Some(1.576));
        assert_eq!(series.datums[2].value, None);
    }

    #[test]
    fn test_current_predictions() {
        let text = r#"{"current_predictions": {"units": "knots", "cp": [
            {"Time": "2017-09-10 00:00", "Velocity_Major": -1.42, "meanFloodDir": 62, "meanEbbDir": 242, "Bin": "1", "Depth": "4.6"}
        ]}}"#;
        let series = parse_response("ACT4176", Product::CurrentsPredictions, text).unwrap();
        let reading = &series.readings[0];
        assert_eq!(reading.value, Some(-1.42));
        assert_eq!(reading.bin.as_deref(), Some("1"));
        assert_eq!(reading.extra.get("meanFloodDir"), Some(&JsonValue::from(62)));
    }

    #[test]
    fn test_monthly_means_start_of_month() {
        let text = r#"{"data": [{"year": 2017, "month": 9, "highest": "1.484", "MSL": "0.301", "MLLW": "0.000"}]}"#;
        let series = parse_response("8724580", Product::MonthlyMean, text).unwrap();
        let reading = &series.readings[0];
        assert_eq!(reading.time, Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(reading.value, Some(0.301));
        assert!(reading.extra.contains_key("highest"));
        assert!(!reading.extra.contains_key("MSL"));
    }

    #[test]
    fn test_daily_means_by_date() {
        let text = r#"{"data": [{"t": "2017-09-10", "v": "0.412", "f": "0"}]}"#;
        let series = parse_response("9063020", Product::DailyMean, text).unwrap();
        assert_eq!(
            series.readings[0].time,
            Utc.with_ymd_and_hms(2017, 9, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let text = r#"{"data": [{"t": "yesterday", "v": "1.0"}]}"#;
        assert!(matches!(
            parse_response("8724580", Product::WaterLevel, text),
            Err(FetchError::DateTimeError(_))
        ));
    }
}
