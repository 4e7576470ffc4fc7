// NHC (National Hurricane Center) storm tracks
//
// - storms: the storm list (`index/storm_list.txt`) and name / code lookups
// - track: ATCF records assembled into per-storm tracks
// - isotach: wind speed contours and swaths built from a track
// - client: HTTP access to the ATCF archive

pub mod client;
pub mod isotach;
pub mod storms;
pub mod track;

pub use client::{NhcClient, TrackRequest};
pub use storms::{NhcStorm, StormQuery};
pub use track::{DuplicatePolicy, StormKey, StormTrack, Translation};
