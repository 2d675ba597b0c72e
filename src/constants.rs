pub const DEFAULT_FREQ: &str = "1s";
pub const DEFAULT_BUCKETS: &str = "2s,10s";
pub const DEFAULT_PROC_DIR: &str = "/proc/net";

// Tables merged into one snapshot, in read order
pub const SOURCE_FILES: [&str; 2] = ["netstat", "snmp"];

pub const DEFAULT_RAW_COUNTERS: &str = "Tcp.CurrEstab";
pub const DEFAULT_DELTA_COUNTERS: &str =
    "Tcp.ActiveOpens,Tcp.PassiveOpens,Tcp.InErrs,Udp.InDatagrams,Udp.OutDatagrams";

// Largest ring a single window may allocate, in samples
pub const MAX_RING_CAPACITY: usize = 1 << 20;

// Capacity of the control channel between the input task and the poll loop
pub const CONTROL_QUEUE_DEPTH: usize = 10;
