//! Reader for the kernel's labeled counter tables (`/proc/net/netstat`, `/proc/net/snmp`).
//!
//! Each table is a run of line pairs:
//!
//! ```text
//! Tcp: RtoAlgorithm RtoMin ActiveOpens
//! Tcp: 1 200 4711
//! ```
//!
//! The header names the fields, the value line carries the integers, and both start with
//! the same `Label:` token.

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::PathBuf,
};

use crate::config::TrackedCounter;
use crate::constants::SOURCE_FILES;
use crate::error::{Error, ParseError, Result};

pub type Fields = HashMap<String, i64>;

/// Group label -> field name -> value, as read at one poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    groups: HashMap<String, Fields>,
}

enum State<'a> {
    AwaitingHeader,
    AwaitingValue { header: Vec<&'a str>, line: usize },
}

impl CounterSnapshot {
    /// Parses one table. Any structural problem fails the whole table.
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let mut groups = HashMap::new();
        let mut state = State::AwaitingHeader;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();

            state = match state {
                State::AwaitingHeader if fields.is_empty() => State::AwaitingHeader,
                State::AwaitingHeader => State::AwaitingValue {
                    header: fields,
                    line: line_no,
                },
                State::AwaitingValue { header, .. } => {
                    let (label, values) = pair_lines(&header, &fields, line_no)?;
                    groups.insert(label.to_string(), values);
                    State::AwaitingHeader
                }
            };
        }

        if let State::AwaitingValue { line, .. } = state {
            return Err(ParseError::MissingValues { line });
        }
        Ok(Self { groups })
    }

    /// Later groups replace earlier ones with the same label.
    pub fn merge(&mut self, other: CounterSnapshot) {
        self.groups.extend(other.groups);
    }

    pub fn group(&self, label: &str) -> Option<&Fields> {
        self.groups.get(label)
    }

    pub fn get(&self, counter: &TrackedCounter) -> Result<i64> {
        self.group(&counter.group)
            .and_then(|fields| fields.get(&counter.field))
            .copied()
            .ok_or_else(|| Error::MissingCounter(counter.clone()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn pair_lines<'h>(
    header: &[&'h str],
    values: &[&str],
    line: usize,
) -> std::result::Result<(&'h str, Fields), ParseError> {
    if header.len() != values.len() {
        return Err(ParseError::LengthMismatch {
            line,
            header: header.len(),
            values: values.len(),
        });
    }
    let label = match header[0].strip_suffix(':') {
        Some(label) if header[0] == values[0] => label,
        _ => return Err(ParseError::LabelMismatch { line }),
    };

    let mut fields = Fields::with_capacity(header.len() - 1);
    for (name, raw) in header[1..].iter().zip(&values[1..]) {
        let value = raw.parse::<i64>().map_err(|_| ParseError::InvalidValue {
            line,
            field: name.to_string(),
            value: raw.to_string(),
        })?;
        fields.insert(name.to_string(), value);
    }
    Ok((label, fields))
}

/// Anything that can produce a fresh snapshot each tick.
pub trait CounterSource {
    fn snapshot(&mut self) -> Result<CounterSnapshot>;
}

/// Reads and merges the counter tables found in one directory.
#[derive(Debug, Clone)]
pub struct ProcNetSource {
    dir: PathBuf,
    files: Vec<String>,
}

impl ProcNetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: SOURCE_FILES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl CounterSource for ProcNetSource {
    fn snapshot(&mut self) -> Result<CounterSnapshot> {
        let mut snapshot = CounterSnapshot::default();
        for name in &self.files {
            let path = self.dir.join(name);
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "skipping counter table");
                    continue;
                }
            };

            let mut text = String::new();
            if let Err(error) = file.read_to_string(&mut text) {
                return Err(Error::Read { path, error });
            }
            drop(file);

            let table = CounterSnapshot::parse(&text).map_err(|error| Error::Parse {
                file: path.display().to_string(),
                error,
            })?;
            snapshot.merge(table);
        }

        if snapshot.is_empty() {
            return Err(Error::NoSnapshot(self.dir.clone()));
        }
        Ok(snapshot)
    }
}
