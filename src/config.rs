use std::{collections::HashSet, fmt, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;

use crate::constants::{
    DEFAULT_BUCKETS, DEFAULT_DELTA_COUNTERS, DEFAULT_FREQ, DEFAULT_PROC_DIR, DEFAULT_RAW_COUNTERS,
    MAX_RING_CAPACITY,
};
use crate::error::{Error, Result};

/// netrate - rolling-window rates of kernel network counters
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Poll frequency
    #[arg(long, default_value = DEFAULT_FREQ)]
    pub freq: String,

    /// List of bucket sizes to show (must be multiples of freq)
    #[arg(long, default_value = DEFAULT_BUCKETS)]
    pub buckets: String,

    /// Counters shown as their current value (Group.Field)
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_RAW_COUNTERS)]
    pub raw: Vec<String>,

    /// Counters shown as deltas over each bucket (Group.Field)
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_DELTA_COUNTERS)]
    pub delta: Vec<String>,

    /// Directory holding the netstat and snmp tables
    #[arg(long, default_value = DEFAULT_PROC_DIR)]
    pub proc_dir: PathBuf,

    /// Append logs to this file (nothing is logged without it)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// One counter, addressed by its table label and field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedCounter {
    pub group: String,
    pub field: String,
}

impl TrackedCounter {
    pub fn new(group: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for TrackedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.field)
    }
}

impl FromStr for TrackedCounter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('.') {
            Some((group, field)) if !group.is_empty() && !field.is_empty() => {
                Ok(Self::new(group, field))
            }
            _ => Err(Error::InvalidCounter(s.to_string())),
        }
    }
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub frequency: Duration,
    pub windows: Vec<Duration>,
    pub raw_counters: Vec<TrackedCounter>,
    pub delta_counters: Vec<TrackedCounter>,
    pub proc_dir: PathBuf,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let frequency = parse_duration(&args.freq)?;
        if frequency.is_zero() {
            return Err(Error::ZeroFrequency);
        }

        let windows = parse_buckets(&args.buckets)?;
        check_windows(frequency, &windows)?;

        Ok(Self {
            frequency,
            windows,
            raw_counters: parse_counters(&args.raw)?,
            delta_counters: parse_counters(&args.delta)?,
            proc_dir: args.proc_dir.clone(),
        })
    }
}

/// Every window must be a whole number of poll periods, and there must be at least one.
pub fn check_windows(frequency: Duration, windows: &[Duration]) -> Result<()> {
    if frequency.is_zero() {
        return Err(Error::ZeroFrequency);
    }
    if windows.is_empty() {
        return Err(Error::NoBuckets);
    }
    for window in windows {
        ring_capacity(frequency, *window)?;
    }
    Ok(())
}

/// Samples needed to span `window`: n elapsed ticks need a point at both ends, n + 1.
pub fn ring_capacity(frequency: Duration, window: Duration) -> Result<usize> {
    if frequency.is_zero() {
        return Err(Error::ZeroFrequency);
    }
    if window.as_nanos() % frequency.as_nanos() != 0 {
        return Err(Error::BucketNotMultiple {
            bucket: window,
            freq: frequency,
        });
    }
    let ticks = window.as_nanos() / frequency.as_nanos();
    usize::try_from(ticks)
        .ok()
        .and_then(|t| t.checked_add(1))
        .filter(|&capacity| capacity <= MAX_RING_CAPACITY)
        .ok_or(Error::BucketTooLarge {
            bucket: window,
            freq: frequency,
            samples: ticks.saturating_add(1),
            limit: MAX_RING_CAPACITY,
        })
}

/// Drops repeated counters, keeping the first occurrence so display order holds.
pub fn unique_counters(counters: &[TrackedCounter]) -> Vec<TrackedCounter> {
    let mut seen = HashSet::new();
    counters
        .iter()
        .filter(|counter| seen.insert(*counter))
        .cloned()
        .collect()
}

fn parse_duration(value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim()).map_err(|source| Error::InvalidDuration {
        value: value.to_string(),
        source,
    })
}

fn parse_buckets(list: &str) -> Result<Vec<Duration>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_duration)
        .collect()
}

fn parse_counters(names: &[String]) -> Result<Vec<TrackedCounter>> {
    let counters: Vec<TrackedCounter> = names
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse())
        .collect::<Result<_>>()?;
    Ok(unique_counters(&counters))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(freq: &str, buckets: &str) -> Args {
        Args::parse_from(["netrate", "--freq", freq, "--buckets", buckets])
    }

    #[test]
    fn defaults_track_tcp_and_udp() {
        let config = Config::from_args(&Args::parse_from(["netrate"])).unwrap();
        assert_eq!(config.frequency, Duration::from_secs(1));
        assert_eq!(config.windows, vec![Duration::from_secs(2), Duration::from_secs(10)]);
        assert_eq!(config.raw_counters, vec![TrackedCounter::new("Tcp", "CurrEstab")]);
        assert_eq!(config.delta_counters.len(), 5);
        assert_eq!(config.delta_counters[0], TrackedCounter::new("Tcp", "ActiveOpens"));
        assert_eq!(config.proc_dir, PathBuf::from("/proc/net"));
    }

    #[test]
    fn sub_second_frequencies_are_accepted() {
        let config = Config::from_args(&args("500ms", "1s, 1500ms")).unwrap();
        assert_eq!(config.windows, vec![Duration::from_millis(1000), Duration::from_millis(1500)]);
    }

    #[test]
    fn bucket_not_a_multiple_is_rejected() {
        let err = Config::from_args(&args("2s", "3s")).unwrap_err();
        assert!(matches!(err, Error::BucketNotMultiple { .. }), "{err}");
    }

    #[test]
    fn oversized_bucket_is_rejected_not_allocated() {
        let err = Config::from_args(&args("1ns", "1000years")).unwrap_err();
        assert!(matches!(err, Error::BucketTooLarge { .. }), "{err}");
        assert!(err.to_string().contains("limit is"));

        let err = ring_capacity(Duration::from_nanos(1), Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, Error::BucketTooLarge { .. }));
        assert_eq!(ring_capacity(Duration::from_secs(1), Duration::from_secs(10)).unwrap(), 11);
        assert_eq!(
            ring_capacity(Duration::from_nanos(1), Duration::from_nanos(MAX_RING_CAPACITY as u64 - 1)).unwrap(),
            MAX_RING_CAPACITY
        );
    }

    #[test]
    fn repeated_counters_are_kept_once_in_order() {
        let args = Args::parse_from([
            "netrate",
            "--delta",
            "Udp.InErrors,Tcp.ActiveOpens,Udp.InErrors,Tcp.ActiveOpens",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(
            config.delta_counters,
            vec![TrackedCounter::new("Udp", "InErrors"), TrackedCounter::new("Tcp", "ActiveOpens")]
        );
    }

    #[test]
    fn empty_bucket_list_is_rejected() {
        assert!(matches!(Config::from_args(&args("1s", "")), Err(Error::NoBuckets)));
        assert!(matches!(Config::from_args(&args("1s", " , ")), Err(Error::NoBuckets)));
    }

    #[test]
    fn bad_durations_are_rejected() {
        assert!(matches!(
            Config::from_args(&args("soon", "2s")),
            Err(Error::InvalidDuration { .. })
        ));
        assert!(matches!(
            Config::from_args(&args("1s", "2s,later")),
            Err(Error::InvalidDuration { .. })
        ));
        assert!(matches!(Config::from_args(&args("0s", "2s")), Err(Error::ZeroFrequency)));
    }

    #[test]
    fn counters_parse_from_dotted_names() {
        let counter: TrackedCounter = "IpExt.InOctets".parse().unwrap();
        assert_eq!(counter, TrackedCounter::new("IpExt", "InOctets"));
        assert_eq!(counter.to_string(), "IpExt.InOctets");
        assert!("Tcp".parse::<TrackedCounter>().is_err());
        assert!(".Field".parse::<TrackedCounter>().is_err());
        assert!("Tcp.".parse::<TrackedCounter>().is_err());
    }

    #[test]
    fn counter_lists_split_on_commas() {
        let args = Args::parse_from(["netrate", "--delta", "Udp.InErrors,Tcp.RetransSegs", "--raw", ""]);
        let config = Config::from_args(&args).unwrap();
        assert!(config.raw_counters.is_empty());
        assert_eq!(config.delta_counters[1], TrackedCounter::new("Tcp", "RetransSegs"));
    }
}
