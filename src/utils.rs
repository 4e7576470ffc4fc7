//! Shared identifiers for storms
//!
//! NHC storm codes are two basin letters, a two digit cyclone number and a four digit
//! year, e.g. `AL112017` for Irma.
//!
//! # Examples
//!
//! ```
//! use storm_events::utils::{parse_storm_identifier, NhcCode, StormIdentifier};
//!
//! let code: NhcCode = "al112017".parse().unwrap();
//! assert_eq!(code.basin, "AL");
//! assert_eq!(code.number, 11);
//! assert_eq!(code.year, 2017);
//! assert_eq!(code.to_string(), "AL112017");
//!
//! assert_eq!(
//!     parse_storm_identifier("irma2017").unwrap(),
//!     StormIdentifier::NameYear { name: "IRMA".to_string(), year: 2017 }
//! );
//! ```
use std::fmt;
use std::str::FromStr;

use crate::fetch_error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NhcCode {
    pub basin: String,
    pub number: u32,
    pub year: i32,
}

impl NhcCode {
    pub fn new(basin: &str, number: u32, year: i32) -> Self {
        Self {
            basin: basin.trim().to_uppercase(),
            number,
            year,
        }
    }

    /// Lowercase form used in archive file names.
    pub fn file_stem(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for NhcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}{:04}", self.basin, self.number, self.year)
    }
}

impl FromStr for NhcCode {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || FetchError::InvalidStorm(value.to_string());

        if value.len() != 8 || !value.is_ascii() {
            return Err(invalid());
        }

        let (basin, rest) = value.split_at(2);
        let (number, year) = rest.split_at(2);

        if !basin.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        let number = number.parse::<u32>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;

        Ok(NhcCode::new(basin, number, year))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StormIdentifier {
    Code(NhcCode),
    NameYear { name: String, year: i32 },
}

/// Accepts either an NHC code (`AL112017`) or a storm name followed by its year
/// (`irma2017`).
pub fn parse_storm_identifier(value: &str) -> Result<StormIdentifier, FetchError> {
    let value = value.trim();

    if let Ok(code) = value.parse::<NhcCode>() {
        return Ok(StormIdentifier::Code(code));
    }

    // name + 4 digit year
    if value.len() > 4 && value.is_ascii() {
        let (name, year) = value.split_at(value.len() - 4);
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(year) = year.parse::<i32>() {
                return Ok(StormIdentifier::NameYear {
                    name: name.to_uppercase(),
                    year,
                });
            }
        }
    }

    Err(FetchError::InvalidStorm(value.to_string()))
}
