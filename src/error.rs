//! Error types shared by the whole binary.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::config::TrackedCounter;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A frequency or bucket string could not be read as a duration.
    #[error("invalid duration {value:?}: {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("poll frequency must be greater than zero")]
    ZeroFrequency,

    #[error("require at least one bucket")]
    NoBuckets,

    #[error("bucket size ({}) is not a multiple of frequency ({})", human(.bucket), human(.freq))]
    BucketNotMultiple { bucket: Duration, freq: Duration },

    #[error("bucket size ({}) needs {samples} samples at frequency ({}), limit is {limit}", human(.bucket), human(.freq))]
    BucketTooLarge {
        bucket: Duration,
        freq: Duration,
        samples: u128,
        limit: usize,
    },

    /// Counter names are written `Group.Field`.
    #[error("invalid counter {0:?}: expected Group.Field")]
    InvalidCounter(String),

    #[error("{file}: {error}")]
    Parse {
        file: String,
        #[source]
        error: ParseError,
    },

    #[error("error reading {}: {error}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("none of the counter tables under {} could be read", .0.display())]
    NoSnapshot(PathBuf),

    #[error("cannot find key {0}")]
    MissingCounter(TrackedCounter),

    #[error("cannot open log file {}: {error}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

/// Structural failures inside one counter table. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: header line without a following value line")]
    MissingValues { line: usize },

    #[error("line {line}: value line has {values} fields but header has {header}")]
    LengthMismatch { line: usize, header: usize, values: usize },

    #[error("line {line}: header and value lines don't match or don't start with a label")]
    LabelMismatch { line: usize },

    #[error("line {line}: could not parse value {value:?} for {field}")]
    InvalidValue { line: usize, field: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_error_names_both_durations() {
        let err = Error::BucketNotMultiple {
            bucket: Duration::from_secs(3),
            freq: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "bucket size (3s) is not a multiple of frequency (2s)");
    }

    #[test]
    fn parse_error_is_prefixed_with_source() {
        let err = Error::Parse {
            file: "snmp".to_string(),
            error: ParseError::MissingValues { line: 3 },
        };
        assert_eq!(err.to_string(), "snmp: line 3: header line without a following value line");
    }
}
