//! Rolling-window rates of the kernel's cumulative network counters.
//!
//! Counters are read from the labeled tables under `/proc/net`, fed into one ring of
//! samples per configured window, and rendered as deltas and per-second rates.

pub mod app;
pub mod buckets;
pub mod config;
pub mod constants;
pub mod error;
pub mod procnet;
pub mod ring;
pub mod ui;
pub mod util;
