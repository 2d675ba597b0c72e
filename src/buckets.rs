use std::{collections::HashMap, time::Duration};

use crate::config::{check_windows, ring_capacity, TrackedCounter};
use crate::error::Result;
use crate::ring::RingSampler;

/// One ring per (counter, window) pair. Rings of the same counter see identical appends
/// and differ only in capacity.
#[derive(Debug, Clone)]
pub struct BucketSet {
    frequency: Duration,
    windows: Vec<Duration>,
    rings: HashMap<TrackedCounter, Vec<RingSampler>>,
}

impl BucketSet {
    pub fn new(frequency: Duration, windows: &[Duration], counters: &[TrackedCounter]) -> Result<Self> {
        check_windows(frequency, windows)?;

        let capacities = windows
            .iter()
            .map(|w| ring_capacity(frequency, *w))
            .collect::<Result<Vec<usize>>>()?;

        let rings = counters
            .iter()
            .map(|counter| {
                let rings = capacities.iter().map(|&c| RingSampler::new(c)).collect();
                (counter.clone(), rings)
            })
            .collect();

        Ok(Self {
            frequency,
            windows: windows.to_vec(),
            rings,
        })
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    pub fn windows(&self) -> &[Duration] {
        &self.windows
    }

    /// Appends `value` to every ring of `counter`, in window order.
    pub fn record_all(&mut self, counter: &TrackedCounter, value: i64) {
        match self.rings.get_mut(counter) {
            Some(rings) => rings.iter_mut().for_each(|ring| ring.append(value)),
            None => tracing::warn!(%counter, "ignoring sample for untracked counter"),
        }
    }

    /// Rings of `counter`, parallel to [`windows`](Self::windows).
    pub fn rings(&self, counter: &TrackedCounter) -> Option<&[RingSampler]> {
        self.rings.get(counter).map(Vec::as_slice)
    }
}
