//! Fixed-capacity circular buffer of cumulative counter samples.

/// Holds the last `capacity` samples of one cumulative counter.
///
/// The cursor points at the next slot to overwrite. Once the cursor has wrapped the
/// buffer is `full` for good, the oldest sample sits at `cursor` and the newest at
/// `cursor - 1`.
#[derive(Debug, Clone)]
pub struct RingSampler {
    samples: Box<[i64]>,
    cursor: usize,
    full: bool,
}

impl RingSampler {
    /// Panics on a zero capacity; configuration validation rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring sampler capacity must be positive");
        Self {
            samples: vec![0; capacity].into_boxed_slice(),
            cursor: 0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn append(&mut self, value: i64) {
        self.samples[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.samples.len();
        if self.cursor == 0 {
            self.full = true;
        }
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Number of valid samples held so far.
    pub fn len(&self) -> usize {
        if self.full {
            self.samples.len()
        } else {
            self.cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest sample minus oldest sample.
    ///
    /// Only meaningful once [`is_full`](Self::is_full) is true. Before that the result
    /// is measured from slot 0 and does not span the whole window.
    pub fn delta(&self) -> i64 {
        let first = if self.full { self.cursor } else { 0 };
        let last = self.cursor.checked_sub(1).unwrap_or(self.samples.len() - 1);
        self.samples[last] - self.samples[first]
    }

    /// `None` while the window is still warming up.
    pub fn full_delta(&self) -> Option<i64> {
        self.full.then(|| self.delta())
    }
}
