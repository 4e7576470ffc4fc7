use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::fetch_error::FetchError;
use crate::usgs::events::stn_datetime;

/// `SensorTypes.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    PressureTransducer,
    MeteorologicalStation,
    Thermometer,
    Webcam,
    RapidDeploymentGage,
    RainGage,
}

impl SensorType {
    pub fn id(&self) -> i64 {
        match self {
            SensorType::PressureTransducer => 1,
            SensorType::MeteorologicalStation => 2,
            SensorType::Thermometer => 3,
            SensorType::Webcam => 4,
            SensorType::RapidDeploymentGage => 5,
            SensorType::RainGage => 6,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(SensorType::PressureTransducer),
            2 => Some(SensorType::MeteorologicalStation),
            3 => Some(SensorType::Thermometer),
            4 => Some(SensorType::Webcam),
            5 => Some(SensorType::RapidDeploymentGage),
            6 => Some(SensorType::RainGage),
            _ => None,
        }
    }
}

/// `DeploymentTypes.json`: what a deployed sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentType {
    WaterLevel,
    WaveHeight,
    Barometric,
    Temperature,
    WindSpeed,
    Humidity,
    AirTemperature,
    WaterTemperature,
    RapidDeployment,
}

impl DeploymentType {
    pub fn id(&self) -> i64 {
        match self {
            DeploymentType::WaterLevel => 1,
            DeploymentType::WaveHeight => 2,
            DeploymentType::Barometric => 3,
            DeploymentType::Temperature => 4,
            DeploymentType::WindSpeed => 5,
            DeploymentType::Humidity => 6,
            DeploymentType::AirTemperature => 7,
            DeploymentType::WaterTemperature => 8,
            DeploymentType::RapidDeployment => 9,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(DeploymentType::WaterLevel),
            2 => Some(DeploymentType::WaveHeight),
            3 => Some(DeploymentType::Barometric),
            4 => Some(DeploymentType::Temperature),
            5 => Some(DeploymentType::WindSpeed),
            6 => Some(DeploymentType::Humidity),
            7 => Some(DeploymentType::AirTemperature),
            8 => Some(DeploymentType::WaterTemperature),
            9 => Some(DeploymentType::RapidDeployment),
            _ => None,
        }
    }
}

/// Local filter over the full `Instruments.json` listing. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorFilter {
    pub event_id: Option<i64>,
    pub sensor_type: Option<SensorType>,
    pub deployment_type: Option<DeploymentType>,
}

impl SensorFilter {
    pub fn for_event(event_id: i64) -> Self {
        SensorFilter {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, sensor: &Sensor) -> bool {
        self.event_id.map_or(true, |id| sensor.event_id == Some(id))
            && self
                .sensor_type
                .map_or(true, |t| sensor.sensor_type() == Some(t))
            && self
                .deployment_type
                .map_or(true, |t| sensor.deployment_type() == Some(t))
    }
}

/// One STN instrument. Attributes not modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub instrument_id: i64,
    #[serde(default)]
    pub sensor_type_id: Option<i64>,
    #[serde(default)]
    pub deployment_type_id: Option<i64>,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub location_description: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub housing_serial_number: Option<String>,
    /// Sampling interval in seconds.
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub sensor_brand_id: Option<i64>,
    #[serde(default)]
    pub housing_type_id: Option<i64>,
    #[serde(default)]
    pub inst_collection_id: Option<i64>,
    #[serde(default)]
    pub vented: Option<String>,
    #[serde(default, deserialize_with = "stn_datetime")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_by: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl Sensor {
    pub fn sensor_type(&self) -> Option<SensorType> {
        self.sensor_type_id.and_then(SensorType::from_id)
    }

    pub fn deployment_type(&self) -> Option<DeploymentType> {
        self.deployment_type_id.and_then(DeploymentType::from_id)
    }
}

/// Parse an `Instruments.json` response. Rows without an instrument id are skipped.
pub(crate) fn parse_sensors(text: &str) -> Result<Vec<Sensor>, FetchError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<JsonValue> = serde_json::from_str(text)?;
    let mut sensors = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        match serde_json::from_value::<Sensor>(row) {
            Ok(sensor) => sensors.push(sensor),
            Err(e) => {
                debug!("Skipping sensor: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable sensors", skipped);
    }
    debug!("Parsed {} sensors", sensors.len());
    Ok(sensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SENSORS: &str = r#"[
        {"instrument_id": 8080, "sensor_type_id": 1, "deployment_type_id": 2, "event_id": 182,
         "site_id": 27001, "location_description": "Pier piling", "serial_number": "10785412",
         "interval": 0.25, "vented": "No", "last_updated": "2017-10-02T13:40:21.103",
         "instrument_status": []},
        {"instrument_id": 7755, "sensor_type_id": 5, "deployment_type_id": null,
         "serial_number": "RDG-42", "interval": null},
        {"sensor_type_id": 1, "serial_number": "lost"}
    ]"#;

    #[test]
    fn test_parse_sensors() {
        let sensors = parse_sensors(SENSORS).unwrap();
        assert_eq!(sensors.len(), 2);

        let first = &sensors[0];
        assert_eq!(first.instrument_id, 8080);
        assert_eq!(first.sensor_type(), Some(SensorType::PressureTransducer));
        assert_eq!(first.deployment_type(), Some(DeploymentType::WaveHeight));
        assert_eq!(first.interval, Some(0.25));
        assert_eq!(
            first.last_updated.map(|t| t.date_naive()),
            Some(Utc.with_ymd_and_hms(2017, 10, 2, 0, 0, 0).unwrap().date_naive())
        );
        assert!(first.extra.contains_key("instrument_status"));

        assert_eq!(sensors[1].sensor_type(), Some(SensorType::RapidDeploymentGage));
        assert_eq!(sensors[1].deployment_type(), None);
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(SensorType::RainGage.id(), 6);
        assert_eq!(SensorType::from_id(7), None);
        assert_eq!(DeploymentType::RapidDeployment.id(), 9);
        assert_eq!(
            DeploymentType::from_id(DeploymentType::WindSpeed.id()),
            Some(DeploymentType::WindSpeed)
        );
    }

    #[test]
    fn test_filter() {
        let sensors = parse_sensors(SENSORS).unwrap();
        let in_irma = SensorFilter::for_event(182);
        assert!(in_irma.matches(&sensors[0]));
        assert!(!in_irma.matches(&sensors[1]));

        let gages = SensorFilter {
            sensor_type: Some(SensorType::RapidDeploymentGage),
            ..SensorFilter::default()
        };
        assert!(!gages.matches(&sensors[0]));
        assert!(gages.matches(&sensors[1]));
        assert!(SensorFilter::default().matches(&sensors[1]));
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_sensors("").unwrap().is_empty());
        assert!(parse_sensors("[]").unwrap().is_empty());
    }
}
