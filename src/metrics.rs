//! Metric lines handed to the scraper.
//!
//! Every metric is rendered as `<name> <value>\n`. Integer values are printed
//! in decimal; CPU seconds use the shortest `%g`-style representation
//! (`2.5`, `4`, `1.2345678e+06`).

use std::fmt;
use std::io::{self, Write};

pub const CPU_SECONDS_SYSTEM: &str = "process_cpu_seconds_system_total";
pub const CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
pub const CPU_SECONDS_USER: &str = "process_cpu_seconds_user_total";
pub const MAJOR_PAGEFAULTS: &str = "process_major_pagefaults_total";
pub const MINOR_PAGEFAULTS: &str = "process_minor_pagefaults_total";
pub const NUM_THREADS: &str = "process_num_threads";
pub const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";
pub const RESIDENT_MEMORY_ANONYMOUS: &str = "process_resident_memory_anonymous_bytes";
pub const RESIDENT_MEMORY_PAGECACHE: &str = "process_resident_memory_pagecache_bytes";
pub const START_TIME: &str = "process_start_time_seconds";
pub const VIRTUAL_MEMORY: &str = "process_virtual_memory_bytes";
pub const IO_READ_BYTES: &str = "process_io_read_bytes_total";
pub const IO_WRITTEN_BYTES: &str = "process_io_written_bytes_total";
pub const IO_READ_SYSCALLS: &str = "process_io_read_syscalls_total";
pub const IO_WRITE_SYSCALLS: &str = "process_io_write_syscalls_total";
pub const IO_STORAGE_READ_BYTES: &str = "process_io_storage_read_bytes_total";
pub const IO_STORAGE_WRITTEN_BYTES: &str = "process_io_storage_written_bytes_total";
pub const MAX_FDS: &str = "process_max_fds";
pub const OPEN_FDS: &str = "process_open_fds";

/// Value of a single metric line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Unsigned(v) => write!(f, "{}", v),
            MetricValue::Signed(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write_general_float(f, *v),
        }
    }
}

/// Writes `v` like `%g` with the shortest round-trip digits: plain decimal
/// for exponents in `-4..6`, otherwise `<mantissa>e<sign><two or more digits>`.
fn write_general_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("NaN");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" });
    }
    if v == 0.0 {
        return write!(f, "{}", v);
    }

    let scientific = format!("{:e}", v);
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return write!(f, "{}", v);
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return write!(f, "{}", v);
    };

    if (-4..6).contains(&exp) {
        write!(f, "{}", v)
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        write!(f, "{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
    }
}

/// A named metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub name: &'static str,
    pub value: MetricValue,
}

impl Metric {
    pub fn unsigned(name: &'static str, value: u64) -> Self {
        Self {
            name,
            value: MetricValue::Unsigned(value),
        }
    }

    pub fn signed(name: &'static str, value: i64) -> Self {
        Self {
            name,
            value: MetricValue::Signed(value),
        }
    }

    pub fn float(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value: MetricValue::Float(value),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}

/// Writes metrics in order, one line each.
pub fn write_metrics<W: Write + ?Sized>(w: &mut W, metrics: &[Metric]) -> io::Result<()> {
    for metric in metrics {
        writeln!(w, "{}", metric)?;
    }
    Ok(())
}
