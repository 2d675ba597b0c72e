use std::{fs, path::Path, time::Duration};

use netrate::app::PollLoop;
use netrate::config::{Config, TrackedCounter};
use netrate::error::Error;
use netrate::procnet::ProcNetSource;

fn write_snmp(dir: &Path, active_opens: i64) {
    let text = format!(
        "Tcp: RtoAlgorithm ActiveOpens CurrEstab\nTcp: 1 {active_opens} 3\nUdp: InDatagrams\nUdp: 9\n"
    );
    fs::write(dir.join("snmp"), text).unwrap();
}

fn config(dir: &Path) -> Config {
    Config {
        frequency: Duration::from_secs(1),
        windows: vec![Duration::from_secs(2), Duration::from_secs(10)],
        raw_counters: vec![TrackedCounter::new("Tcp", "CurrEstab")],
        delta_counters: vec![
            TrackedCounter::new("Tcp", "ActiveOpens"),
            TrackedCounter::new("Udp", "InDatagrams"),
        ],
        proc_dir: dir.to_path_buf(),
    }
}

#[test]
fn deltas_follow_the_tables_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let mut poll = PollLoop::new(&config, ProcNetSource::new(&config.proc_dir)).unwrap();

    let mut last = None;
    for value in [100, 105, 110] {
        write_snmp(dir.path(), value);
        last = Some(poll.tick().unwrap());
    }
    let view = last.unwrap();

    assert_eq!(view.raw[0].value, 3);
    let active = &view.windowed[0];
    assert_eq!(active.counter.to_string(), "Tcp.ActiveOpens");
    assert_eq!(active.windows[0].delta, Some(10));
    assert_eq!(active.windows[1].delta, None);
    assert_eq!(view.windowed[1].windows[0].delta, Some(0));
}

#[test]
fn missing_counter_stops_the_tick() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("netstat"), "TcpExt: a\nTcpExt: 1\n").unwrap();
    let config = config(dir.path());
    let mut poll = PollLoop::new(&config, ProcNetSource::new(&config.proc_dir)).unwrap();

    let err = poll.tick().unwrap_err();
    assert!(matches!(err, Error::MissingCounter(_)), "{err}");
}

#[test]
fn bad_windows_fail_before_polling() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.frequency = Duration::from_secs(2);
    config.windows = vec![Duration::from_secs(3)];

    let err = PollLoop::new(&config, ProcNetSource::new(dir.path())).err().unwrap();
    assert!(matches!(err, Error::BucketNotMultiple { .. }));
}
