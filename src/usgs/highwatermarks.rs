use chrono::{DateTime, Utc};
use geo::{point, Point};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::fetch_error::FetchError;
use crate::spatial::Located;
use crate::usgs::events::{stn_datetime, EventStatus, EventType};

/// `HWMTypes.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighWaterMarkType {
    Mud,
    Debris,
    VegetationLine,
    SeedLine,
    StainLine,
    MeltedSnowLine,
    DirectObservation,
    Other,
}

impl HighWaterMarkType {
    pub fn id(&self) -> i64 {
        match self {
            HighWaterMarkType::Mud => 1,
            HighWaterMarkType::Debris => 2,
            HighWaterMarkType::VegetationLine => 3,
            HighWaterMarkType::SeedLine => 4,
            HighWaterMarkType::StainLine => 5,
            HighWaterMarkType::MeltedSnowLine => 6,
            HighWaterMarkType::DirectObservation => 7,
            HighWaterMarkType::Other => 8,
        }
    }
}

/// `HWMQualities.json`, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighWaterMarkQuality {
    /// +/- 0.05 ft
    Excellent,
    /// +/- 0.10 ft
    Good,
    /// +/- 0.20 ft
    Fair,
    /// +/- 0.40 ft
    Poor,
    VeryPoor,
    Unknown,
}

impl HighWaterMarkQuality {
    pub fn id(&self) -> i64 {
        match self {
            HighWaterMarkQuality::Excellent => 1,
            HighWaterMarkQuality::Good => 2,
            HighWaterMarkQuality::Fair => 3,
            HighWaterMarkQuality::Poor => 4,
            HighWaterMarkQuality::VeryPoor => 5,
            HighWaterMarkQuality::Unknown => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighWaterMarkEnvironment {
    Coastal,
    Riverine,
}

impl HighWaterMarkEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighWaterMarkEnvironment::Coastal => "Coastal",
            HighWaterMarkEnvironment::Riverine => "Riverine",
        }
    }
}

/// Filters for an STN high-water mark request. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighWaterMarksQuery {
    pub event_id: Option<i64>,
    pub event_type: Option<EventType>,
    pub event_status: Option<EventStatus>,
    pub us_states: Vec<String>,
    pub us_counties: Vec<String>,
    pub hwm_types: Vec<HighWaterMarkType>,
    pub qualities: Vec<HighWaterMarkQuality>,
    pub environments: Vec<HighWaterMarkEnvironment>,
    pub survey_completed: Option<bool>,
    pub still_water: Option<bool>,
}

impl HighWaterMarksQuery {
    pub fn for_event(event_id: i64) -> Self {
        HighWaterMarksQuery {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    /// Query string pairs, named as the STN service expects them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value.filter(|value| !value.is_empty()) {
                params.push((name, value));
            }
        };

        push("Event", self.event_id.map(|id| id.to_string()));
        push("EventType", self.event_type.map(|t| t.id().to_string()));
        push("EventStatus", self.event_status.map(|s| s.id().to_string()));
        push("States", Some(join(self.us_states.iter().map(|s| s.trim().to_string()))));
        push("County", Some(join(self.us_counties.iter().map(|c| c.trim().to_string()))));
        push("HWMType", Some(join(self.hwm_types.iter().map(|t| t.id().to_string()))));
        push("HWMQuality", Some(join(self.qualities.iter().map(|q| q.id().to_string()))));
        push(
            "HWMEnvironment",
            Some(join(self.environments.iter().map(|e| e.as_str().to_string()))),
        );
        push("SurveyComplete", self.survey_completed.map(|b| b.to_string()));
        push("StillWater", self.still_water.map(|b| b.to_string()));

        params
    }

    /// Whether anything beyond the two boolean flags narrows the query.
    pub fn has_filters(&self) -> bool {
        self.params()
            .iter()
            .any(|(name, _)| !matches!(*name, "SurveyComplete" | "StillWater"))
    }

    /// Service path relative to the STN base URL.
    pub fn path(&self) -> &'static str {
        if self.has_filters() {
            "HWMs/FilteredHWMs.json"
        } else {
            "HWMs.json"
        }
    }
}

fn join(values: impl Iterator<Item = String>) -> String {
    values.filter(|v| !v.is_empty()).collect::<Vec<_>>().join(",")
}

/// One surveyed high-water mark. Attributes not modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighWaterMark {
    pub hwm_id: i64,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub site_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, rename = "eventName")]
    pub event_name: Option<String>,
    #[serde(default, rename = "hwmTypeName")]
    pub hwm_type_name: Option<String>,
    #[serde(default, rename = "hwmQualityName")]
    pub hwm_quality_name: Option<String>,
    #[serde(default, rename = "verticalDatumName")]
    pub vertical_datum_name: Option<String>,
    #[serde(default, rename = "markerName", deserialize_with = "empty_as_none")]
    pub marker_name: Option<String>,
    #[serde(default, rename = "stateName")]
    pub state_name: Option<String>,
    #[serde(default, rename = "countyName")]
    pub county_name: Option<String>,
    #[serde(default)]
    pub site_no: Option<String>,
    #[serde(default)]
    pub waterbody: Option<String>,
    #[serde(default)]
    pub hwm_label: Option<String>,
    #[serde(default)]
    pub hwm_environment: Option<String>,
    #[serde(default)]
    pub elev_ft: Option<f64>,
    #[serde(default)]
    pub height_above_gnd: Option<f64>,
    #[serde(default)]
    pub hwm_uncertainty: Option<f64>,
    #[serde(default, deserialize_with = "stn_datetime")]
    pub survey_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "stn_datetime")]
    pub flag_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl Located for HighWaterMark {
    fn location(&self) -> Point<f64> {
        point!(x: self.longitude, y: self.latitude)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Parse an STN high-water mark response. Rows without a position are skipped.
pub(crate) fn parse_high_water_marks(text: &str) -> Result<Vec<HighWaterMark>, FetchError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<JsonValue> = serde_json::from_str(text)?;
    let mut marks = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        match serde_json::from_value::<HighWaterMark>(row) {
            Ok(mark) => marks.push(mark),
            Err(e) => {
                warn!("Skipping high-water mark: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable high-water marks", skipped);
    }
    debug!("Parsed {} high-water marks", marks.len());
    Ok(marks)
}
