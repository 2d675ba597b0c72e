use std::time::Duration;

// Shown in place of a value while a window is still filling
pub const UNKNOWN: &str = "?";

pub fn format_delta(delta: Option<i64>) -> String {
    match delta {
        Some(d) => format!("{:>6}", d),
        None => format!("{:>6}", UNKNOWN),
    }
}

pub fn format_rate(per_second: Option<f64>) -> String {
    match per_second {
        Some(r) => format!("{:>7.1}/s", r),
        None => format!("{:>9}", UNKNOWN),
    }
}

pub fn window_label(window: Duration) -> String {
    format!("last {}", humantime::format_duration(window))
}

pub fn center(s: &str, width: usize) -> String {
    format!("{:^width$}", s, width = width)
}
