use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::fetch_error::FetchError;
use crate::nhc::storms::NhcStorm;

/// `EventTypes.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RiverineFlood,
    Hurricane,
    Drought,
    Noreaster,
    Tsunami,
}

impl EventType {
    pub fn id(&self) -> i64 {
        match self {
            EventType::RiverineFlood => 1,
            EventType::Hurricane => 2,
            EventType::Drought => 3,
            EventType::Noreaster => 4,
            EventType::Tsunami => 6,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(EventType::RiverineFlood),
            2 => Some(EventType::Hurricane),
            3 => Some(EventType::Drought),
            4 => Some(EventType::Noreaster),
            6 => Some(EventType::Tsunami),
            _ => None,
        }
    }
}

/// `EventStatus.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Active,
    Completed,
}

impl EventStatus {
    pub fn id(&self) -> i64 {
        match self {
            EventStatus::Active => 1,
            EventStatus::Completed => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(EventStatus::Active),
            2 => Some(EventStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

// Note: raw `Events.json` row; event names, dates and ids are not standardized by STN
#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    event_id: i64,
    #[serde(default)]
    event_name: Option<String>,
    #[serde(default)]
    event_description: Option<String>,
    #[serde(default)]
    event_type_id: Option<i64>,
    #[serde(default)]
    event_status_id: Option<i64>,
    #[serde(default)]
    event_coordinator: Option<i64>,
    #[serde(default, deserialize_with = "stn_datetime")]
    event_start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "stn_datetime")]
    event_end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "stn_datetime")]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated_by: Option<i64>,
}

/// One USGS flood event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodEvent {
    pub usgs_id: i64,
    pub name: String,
    /// Year of the start date.
    pub year: Option<i32>,
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub event_status: Option<EventStatus>,
    pub coordinator: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_by: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<RawEvent> for FloodEvent {
    fn from(raw: RawEvent) -> Self {
        FloodEvent {
            usgs_id: raw.event_id,
            name: raw.event_name.unwrap_or_default().trim().to_string(),
            year: raw.event_start_date.map(|date| date.year()),
            description: raw.event_description.filter(|d| !d.trim().is_empty()),
            event_type: raw.event_type_id.and_then(EventType::from_id),
            event_status: raw.event_status_id.and_then(EventStatus::from_id),
            coordinator: raw.event_coordinator,
            last_updated: raw.last_updated,
            last_updated_by: raw.last_updated_by,
            start_date: raw.event_start_date,
            end_date: raw.event_end_date,
        }
    }
}

/// A hurricane flood event matched to the NHC storm it records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormFloodEvent {
    pub event: FloodEvent,
    pub nhc_name: String,
    pub nhc_code: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub year: Option<i32>,
    pub event_type: Option<EventType>,
    pub event_status: Option<EventStatus>,
}

impl EventFilter {
    pub fn hurricanes(year: Option<i32>) -> Self {
        EventFilter {
            year,
            event_type: Some(EventType::Hurricane),
            event_status: None,
        }
    }

    pub fn matches(&self, event: &FloodEvent) -> bool {
        self.year.map_or(true, |year| event.year == Some(year))
            && self
                .event_type
                .map_or(true, |event_type| event.event_type == Some(event_type))
            && self
                .event_status
                .map_or(true, |status| event.event_status == Some(status))
    }
}

pub(crate) fn parse_events(text: &str) -> Result<Vec<FloodEvent>, FetchError> {
    let raw: Vec<RawEvent> = serde_json::from_str(text)?;
    debug!("Parsed {} flood events", raw.len());
    Ok(raw.into_iter().map(FloodEvent::from).collect())
}

/// Cross-reference hurricane events with NHC storms of the same year.
///
/// STN event names are free text ("2017 Irma", "Irma September 2017"), so a storm
/// matches when its name appears as a whole word, ignoring case. The longest matching
/// name wins; events matching no storm are dropped.
pub fn match_storm_events(events: &[FloodEvent], storms: &[NhcStorm]) -> Vec<StormFloodEvent> {
    let patterns: Vec<(&NhcStorm, Regex)> = storms
        .iter()
        .filter(|storm| !storm.name.is_empty() && storm.name != "UNNAMED")
        .filter_map(|storm| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&storm.name));
            match Regex::new(&pattern) {
                Ok(regex) => Some((storm, regex)),
                Err(e) => {
                    warn!("Skipping storm name {}: {}", storm.name, e);
                    None
                }
            }
        })
        .collect();

    events
        .iter()
        .filter_map(|event| {
            let storm = patterns
                .iter()
                .filter(|(storm, regex)| {
                    event.year == Some(storm.year) && regex.is_match(&event.name)
                })
                .map(|(storm, _)| *storm)
                .reduce(|best, storm| {
                    if storm.name.len() > best.name.len() {
                        storm
                    } else {
                        best
                    }
                })?;
            Some(StormFloodEvent {
                event: event.clone(),
                nhc_name: storm.name.clone(),
                nhc_code: storm.nhc_code.clone(),
            })
        })
        .collect()
}

/// STN timestamps carry no zone (`2017-09-05T04:00:00`) and are read as UTC.
/// Unparseable values become `None`.
pub(crate) fn stn_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_stn_datetime))
}

pub(crate) fn parse_stn_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EVENTS: &str = r#"[
        {"event_id": 8, "event_name": "Wilma", "event_start_date": "2005-10-20T00:00:00",
         "event_end_date": "2005-10-31T00:00:00", "event_description": "Category 3 in west FL.",
         "event_type_id": 2, "event_status_id": 2, "event_coordinator": 36, "instruments": []},
        {"event_id": 182, "event_name": "Irma September 2017", "event_start_date": "2017-09-03T04:00:00",
         "event_end_date": "2017-09-20T04:00:00", "event_type_id": 2, "event_status_id": 2,
         "last_updated": "2018-09-07T17:53:13.77", "last_updated_by": 35},
        {"event_id": 9, "event_name": "Midwest Floods 2011", "event_start_date": "2011-02-01T06:00:00",
         "event_end_date": null, "event_type_id": 1, "event_status_id": 1},
        {"event_id": 317, "event_name": "2022 Hunga Tonga-Hunga Haapai tsunami",
         "event_start_date": "not a date", "event_type_id": 6, "event_status_id": 2}
    ]"#;

    fn storm(name: &str, code: &str, year: i32) -> NhcStorm {
        NhcStorm {
            nhc_code: code.to_string(),
            name: name.to_string(),
            basin: code[..2].to_string(),
            number: code[2..4].parse().unwrap(),
            year,
            class: Some("HU".to_string()),
            start_date: None,
            end_date: None,
            source: Some("ARCHIVE".to_string()),
        }
    }

    #[test]
    fn test_parse_events() {
        let events = parse_events(EVENTS).unwrap();
        assert_eq!(events.len(), 4);

        let irma = &events[1];
        assert_eq!(irma.usgs_id, 182);
        assert_eq!(irma.year, Some(2017));
        assert_eq!(irma.event_type, Some(EventType::Hurricane));
        assert_eq!(irma.event_status, Some(EventStatus::Completed));
        assert_eq!(
            irma.start_date,
            Some(Utc.with_ymd_and_hms(2017, 9, 3, 4, 0, 0).unwrap())
        );
        assert!(irma.last_updated.is_some());
        assert_eq!(irma.description, None);

        assert_eq!(events[2].end_date, None);
        // unparseable dates are dropped, not fatal
        assert_eq!(events[3].start_date, None);
        assert_eq!(events[3].event_type, Some(EventType::Tsunami));
    }

    #[test]
    fn test_event_filter() {
        let events = parse_events(EVENTS).unwrap();
        let hurricanes: Vec<i64> = events
            .iter()
            .filter(|event| EventFilter::hurricanes(None).matches(event))
            .map(|event| event.usgs_id)
            .collect();
        assert_eq!(hurricanes, vec![8, 182]);

        let filter = EventFilter {
            year: Some(2011),
            event_status: Some(EventStatus::Active),
            ..EventFilter::default()
        };
        let matched: Vec<i64> = events
            .iter()
            .filter(|event| filter.matches(event))
            .map(|event| event.usgs_id)
            .collect();
        assert_eq!(matched, vec![9]);
    }

    #[test]
    fn test_match_storm_events_by_whole_word() {
        let events = parse_events(EVENTS).unwrap();
        let storms = vec![
            storm("IRMA", "AL112017", 2017),
            storm("JOSE", "AL122017", 2017),
            storm("WILMA", "AL252005", 2005),
            // "MA" appears inside "Irma" and "Wilma" but never as a word
            storm("MA", "AL992017", 2017),
        ];

        let matched = match_storm_events(&events, &storms);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].nhc_code, "AL252005");
        assert_eq!(matched[1].event.usgs_id, 182);
        assert_eq!(matched[1].nhc_name, "IRMA");
    }

    #[test]
    fn test_match_requires_same_year() {
        let events = parse_events(EVENTS).unwrap();
        let storms = vec![storm("IRMA", "AL112023", 2023)];
        assert!(match_storm_events(&events, &storms).is_empty());
    }

    #[test]
    fn test_parse_stn_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2017, 9, 3, 4, 0, 0).unwrap();
        assert_eq!(parse_stn_datetime("2017-09-03T04:00:00"), Some(expected));
        assert_eq!(parse_stn_datetime("2017-09-03T04:00:00Z"), Some(expected));
        assert_eq!(
            parse_stn_datetime("2017-09-03"),
            Some(Utc.with_ymd_and_hms(2017, 9, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_stn_datetime(""), None);
    }
}
