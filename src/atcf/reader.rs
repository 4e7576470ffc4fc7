use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::atcf::record::{Advisory, AtcfParseError, TrackRecord};
use crate::fetch_error::FetchError;
use crate::fetcher::decompress;

/// A line that could not be parsed, with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub error: AtcfParseError,
}

#[derive(Debug, Clone, Default)]
pub struct AtcfRead {
    pub records: Vec<TrackRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse ATCF text, keeping only `advisories` when given.
///
/// Malformed lines never abort the read; they are logged and reported in
/// [`AtcfRead::skipped`].
#[instrument(skip(text, advisories), fields(text_size = text.len()))]
pub fn read_atcf(text: &str, advisories: Option<&[Advisory]>) -> AtcfRead {
    let mut read = AtcfRead::default();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match TrackRecord::parse_line(line) {
            Ok(record) => {
                let wanted = advisories.map_or(true, |allowed| allowed.contains(&record.advisory));
                if wanted {
                    read.records.push(record);
                }
            }
            Err(error) => {
                warn!("Skipping ATCF line {}: {} - {}", index + 1, error, line.trim());
                read.skipped.push(SkippedLine {
                    line_number: index + 1,
                    error,
                });
            }
        }
    }

    if !read.skipped.is_empty() {
        warn!("Skipped {} unparseable lines", read.skipped.len());
    }
    debug!("Parsed {} ATCF records", read.records.len());

    read
}

/// Same as [`read_atcf`] for raw, possibly gzip-compressed, file contents.
pub fn read_atcf_bytes(
    bytes: Vec<u8>,
    advisories: Option<&[Advisory]>,
) -> Result<AtcfRead, FetchError> {
    let bytes = decompress(bytes)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(read_atcf(&text, advisories))
}

pub async fn read_atcf_file(
    path: &Path,
    advisories: Option<&[Advisory]>,
) -> Result<AtcfRead, FetchError> {
    debug!("Reading ATCF file {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    read_atcf_bytes(bytes, advisories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const DECK: &str = "\
AL, 11, 2017083000,   , BEST,   0, 162N,  269W,  30, 1008, TD,   0,    ,    0,    0,    0,    0, 1012,  150,  40,  40,   0,   L,   0,    ,   0,   0, ELEVEN,
AL, 11, 2017083000, 03, OFCL,   0, 162N,  269W,  30, 1008, TD,  34, NEQ,    0,    0,    0,    0,
AL, 11, not-a-date, 03, OFCL,  12, 165N,  285W,  40,    0, TS,  34, NEQ,   30,    0,    0,   30,

AL, 11
AL, 11, 2017083006,   , BEST,   0, 164N,  281W,  45, 1004, TS,  34, NEQ,   30,    0,    0,   30, 1012,  150,  20,  55,   0,   L,   0,    ,   0,   0,       IRMA,
";

    #[test]
    fn test_read_skips_malformed_lines_with_line_numbers() {
        let read = read_atcf(DECK, None);
        assert_eq!(read.records.len(), 3);
        assert_eq!(read.skipped.len(), 2);
        assert_eq!(read.skipped[0].line_number, 3);
        assert_eq!(read.skipped[1].line_number, 5);
        assert_eq!(read.skipped[1].error, AtcfParseError::TooFewFields(2));
    }

    #[test]
    fn test_read_filters_advisories() {
        let read = read_atcf(DECK, Some(&[Advisory::Best]));
        assert_eq!(read.records.len(), 2);
        assert!(read.records.iter().all(|r| r.advisory == Advisory::Best));
    }

    #[test]
    fn test_read_with_no_matching_advisory_is_empty() {
        let read = read_atcf(DECK, Some(&[Advisory::Hwrf]));
        assert!(read.records.is_empty());
    }

    #[test]
    fn test_read_gzip_bytes() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(DECK.as_bytes()).unwrap();
        let read = read_atcf_bytes(encoder.finish().unwrap(), None).unwrap();
        assert_eq!(read.records.len(), 3);
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bal112017.dat");
        std::fs::write(&path, DECK).unwrap();

        let read = read_atcf_file(&path, None).await.unwrap();
        assert_eq!(read.records[2].name.as_deref(), Some("IRMA"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let result = read_atcf_file(Path::new("/nonexistent/bal112017.dat"), None).await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
