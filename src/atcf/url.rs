use std::fmt;
use std::str::FromStr;

use crate::fetch_error::FetchError;
use crate::utils::NhcCode;

/// ATCF file decks: a (aids / advisories), b (best track), f (fixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileDeck {
    Advisory,
    Best,
    Fixed,
}

impl FileDeck {
    pub const ALL: [FileDeck; 3] = [FileDeck::Advisory, FileDeck::Best, FileDeck::Fixed];

    pub fn letter(&self) -> char {
        match self {
            FileDeck::Advisory => 'a',
            FileDeck::Best => 'b',
            FileDeck::Fixed => 'f',
        }
    }
}

impl fmt::Display for FileDeck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for FileDeck {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "a" | "advisory" => Ok(FileDeck::Advisory),
            "b" | "best" => Ok(FileDeck::Best),
            "f" | "fixed" => Ok(FileDeck::Fixed),
            other => Err(FetchError::ParseError(format!("unknown ATCF file deck {other:?}"))),
        }
    }
}

/// Where a storm's files live: the yearly archive, or the real-time directories
/// used while a season is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtcfMode {
    Historical,
    Realtime,
}

impl AtcfMode {
    /// Storm list `source` column; `ARCHIVE` storms have moved to the yearly archive.
    pub fn from_source(source: Option<&str>) -> Self {
        match source {
            Some(source) if source.trim().eq_ignore_ascii_case("ARCHIVE") => AtcfMode::Historical,
            _ => AtcfMode::Realtime,
        }
    }
}

/// Directory holding `deck` files for `mode`; the archive is split by year.
pub fn atcf_directory_url(
    base_url: &str,
    deck: FileDeck,
    mode: AtcfMode,
    year: Option<i32>,
) -> Result<String, FetchError> {
    let base = base_url.trim_end_matches('/');
    match mode {
        AtcfMode::Historical => match year {
            Some(year) => Ok(format!("{base}/archive/{year}/")),
            None => Err(FetchError::InvalidStorm(
                "a year is required to locate the ATCF archive".to_string(),
            )),
        },
        AtcfMode::Realtime => Ok(format!("{base}/{}/", realtime_directory(deck))),
    }
}

pub fn atcf_url(base_url: &str, code: &NhcCode, deck: FileDeck, mode: AtcfMode) -> String {
    let base = base_url.trim_end_matches('/');
    let stem = code.file_stem();
    let letter = deck.letter();
    match mode {
        AtcfMode::Historical => format!("{base}/archive/{}/{letter}{stem}.dat.gz", code.year),
        AtcfMode::Realtime => {
            let suffix = match deck {
                FileDeck::Advisory => ".dat.gz",
                FileDeck::Best | FileDeck::Fixed => ".dat",
            };
            format!("{base}/{}/{letter}{stem}{suffix}", realtime_directory(deck))
        }
    }
}

fn realtime_directory(deck: FileDeck) -> &'static str {
    match deck {
        FileDeck::Advisory => "aid_public",
        FileDeck::Best => "btk",
        FileDeck::Fixed => "fix",
    }
}
