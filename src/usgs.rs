// USGS Short-Term Network (STN) flood surveys
//
// - events: flood events (`Events.json`) and their match against NHC storms
// - highwatermarks: high-water mark queries (`HWMs.json`, `HWMs/FilteredHWMs.json`)
// - sensors: deployed instruments (`Instruments.json`)
// - client: HTTP access to the STN services
//
// API reference: https://stn.wim.usgs.gov/STNServices/Documentation/home

pub mod client;
pub mod events;
pub mod highwatermarks;
pub mod sensors;

pub use client::UsgsClient;
pub use events::{EventFilter, EventStatus, EventType, FloodEvent, StormFloodEvent};
pub use highwatermarks::{
    HighWaterMark, HighWaterMarkEnvironment, HighWaterMarkQuality, HighWaterMarkType,
    HighWaterMarksQuery,
};
pub use sensors::{DeploymentType, Sensor, SensorFilter, SensorType};
