// ATCF (Automated Tropical Cyclone Forecasting) track files
//
// One comma-delimited record per line:
// BASIN, CY, YYYYMMDDHH, TECHNUM/MIN, TECH, TAU, LatN/S, LonE/W, VMAX, MSLP, TY, RAD,
// WINDCODE, RAD1-4, RADP, RRP, MRD, GUSTS, EYE, SUBREGION, MAXSEAS, INITIALS, DIR,
// SPEED, STORMNAME, then optional depth / seas / user-defined fields.

pub mod reader;
pub mod record;
pub mod url;
pub mod writer;

pub use reader::{read_atcf, read_atcf_bytes, AtcfRead, SkippedLine};
pub use record::{Advisory, AtcfParseError, TrackRecord};
pub use url::{atcf_directory_url, atcf_url, AtcfMode, FileDeck};
