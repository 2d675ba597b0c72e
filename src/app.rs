use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};

use crate::buckets::BucketSet;
use crate::config::{unique_counters, Config, TrackedCounter};
use crate::error::Result;
use crate::procnet::CounterSource;

// From the input task (and the interrupt handler) to the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Key(char),
    Interrupt,
}

impl Control {
    pub fn is_quit(self) -> bool {
        matches!(self, Control::Interrupt | Control::Key('q') | Control::Key('Q'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Delta of one counter over one window. `delta` is `None` while the window warms up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReading {
    pub window: Duration,
    pub delta: Option<i64>,
}

impl WindowReading {
    pub fn per_second(&self) -> Option<f64> {
        self.delta.map(|d| d as f64 / self.window.as_secs_f64())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub counter: TrackedCounter,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowedReading {
    pub counter: TrackedCounter,
    pub windows: Vec<WindowReading>,
}

/// Read-only result of one tick, handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct TickView {
    pub taken_at: DateTime<Local>,
    pub windows: Vec<Duration>,
    pub raw: Vec<RawReading>,
    pub windowed: Vec<WindowedReading>,
}

/// Consumes one view per tick.
pub trait Render {
    fn render(&mut self, view: &TickView) -> Result<()>;
}

/// Drives snapshot acquisition and ring updates on a fixed schedule.
pub struct PollLoop<S> {
    source: S,
    buckets: BucketSet,
    raw_counters: Vec<TrackedCounter>,
    delta_counters: Vec<TrackedCounter>,
    state: LoopState,
}

impl<S: CounterSource> PollLoop<S> {
    pub fn new(config: &Config, source: S) -> Result<Self> {
        // Each counter is recorded once per tick, however often it was listed
        let delta_counters = unique_counters(&config.delta_counters);
        let buckets = BucketSet::new(config.frequency, &config.windows, &delta_counters)?;
        Ok(Self {
            source,
            buckets,
            raw_counters: unique_counters(&config.raw_counters),
            delta_counters,
            state: LoopState::Running,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn buckets(&self) -> &BucketSet {
        &self.buckets
    }

    /// One poll cycle: snapshot, extract, record, build the view.
    pub fn tick(&mut self) -> Result<TickView> {
        let snapshot = self.source.snapshot()?;

        let raw = self
            .raw_counters
            .iter()
            .map(|counter| {
                snapshot.get(counter).map(|value| RawReading {
                    counter: counter.clone(),
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Look everything up before touching a ring so a missing key records nothing
        let deltas = self
            .delta_counters
            .iter()
            .map(|counter| snapshot.get(counter))
            .collect::<Result<Vec<_>>>()?;
        for (counter, value) in self.delta_counters.iter().zip(deltas) {
            self.buckets.record_all(counter, value);
        }

        Ok(TickView {
            taken_at: Local::now(),
            windows: self.buckets.windows().to_vec(),
            raw,
            windowed: self.windowed_readings(),
        })
    }

    fn windowed_readings(&self) -> Vec<WindowedReading> {
        self.delta_counters
            .iter()
            .map(|counter| {
                let rings = self.buckets.rings(counter).unwrap_or_default();
                let windows = self
                    .buckets
                    .windows()
                    .iter()
                    .zip(rings)
                    .map(|(window, ring)| WindowReading {
                        window: *window,
                        delta: ring.full_delta(),
                    })
                    .collect();
                WindowedReading {
                    counter: counter.clone(),
                    windows,
                }
            })
            .collect()
    }

    /// Runs until a quit control arrives or a tick fails. The first tick fires at once.
    ///
    /// Ticks run strictly one after another; deadlines missed while a tick was busy are
    /// dropped rather than replayed.
    pub fn run<R: Render>(&mut self, renderer: &mut R, controls: &Receiver<Control>) -> Result<()> {
        let period = self.buckets.frequency();
        let mut next_tick = Instant::now();
        let mut input_open = true;

        while self.state == LoopState::Running {
            let now = Instant::now();
            if now >= next_tick {
                let view = match self.tick() {
                    Ok(view) => view,
                    Err(err) => {
                        tracing::error!(error = %err, "tick failed, stopping");
                        self.state = LoopState::Stopped;
                        return Err(err);
                    }
                };
                if let Err(err) = renderer.render(&view) {
                    tracing::error!(error = %err, "render failed, stopping");
                    self.state = LoopState::Stopped;
                    return Err(err);
                }
                next_tick = next_deadline(next_tick, period, Instant::now());
                continue;
            }

            let wait = next_tick - now;
            if !input_open {
                thread::sleep(wait);
                continue;
            }
            match controls.recv_timeout(wait) {
                Ok(control) if control.is_quit() => {
                    tracing::info!(?control, "stopping poll loop");
                    self.state = LoopState::Stopped;
                }
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("control channel closed");
                    input_open = false;
                }
            }
        }
        Ok(())
    }
}

/// First deadline on the `period` grid that lies after `now`.
fn next_deadline(last: Instant, period: Duration, now: Instant) -> Instant {
    let periods = now.saturating_duration_since(last).as_nanos() / period.as_nanos() + 1;
    last + Duration::from_nanos((periods * period.as_nanos()) as u64)
}
