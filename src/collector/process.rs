//! Collector for the resource usage of the current process.
//!
//! Each report under `/proc/self/` is read and parsed independently. A report
//! that cannot be read or parsed is logged and only its own metrics are left
//! out of the output.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error};

use crate::collector::procfs::parser::{
    IoCounters, ParseError, ProcessStatusRecord, parse_max_open_files, parse_proc_io,
    parse_proc_stat,
};
use crate::collector::procfs::smaps::{RssBreakdown, parse_smaps};
use crate::collector::traits::FileSystem;
use crate::metrics::{self, Metric, write_metrics};
use crate::util::process_start_time;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const USER_HZ: f64 = 100.0;

/// Size of a memory page in bytes.
const PAGE_SIZE: u64 = 4096;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// The report could not be read (permissions, process gone, no procfs).
    Io { path: PathBuf, source: io::Error },
    /// The report was read but its content is malformed.
    Parse { path: PathBuf, source: ParseError },
}

impl CollectError {
    /// Path of the report that failed.
    pub fn path(&self) -> &Path {
        match self {
            CollectError::Io { path, .. } | CollectError::Parse { path, .. } => path,
        }
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            CollectError::Parse { path, source } => {
                write!(f, "cannot parse {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io { source, .. } => Some(source),
            CollectError::Parse { source, .. } => Some(source),
        }
    }
}

/// Parsed reports of one collection call.
///
/// A `None` field means that report failed; the failure has been logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub status: Option<ProcessStatusRecord>,
    pub rss: Option<RssBreakdown>,
    pub io: Option<IoCounters>,
    /// Process start time in seconds since the Unix epoch.
    pub start_time_seconds: i64,
}

impl ProcessSample {
    /// Converts the sample into metric lines, in exposition order.
    pub fn metrics(&self) -> Vec<Metric> {
        let mut out = Vec::with_capacity(17);

        if let Some(stat) = &self.status {
            let utime = stat.utime as f64 / USER_HZ;
            let stime = stat.stime as f64 / USER_HZ;
            // Sum ticks before scaling so the total is exact in decimal
            let total = stat.utime.saturating_add(stat.stime) as f64 / USER_HZ;
            out.push(Metric::float(metrics::CPU_SECONDS_SYSTEM, stime));
            out.push(Metric::float(metrics::CPU_SECONDS_TOTAL, total));
            out.push(Metric::float(metrics::CPU_SECONDS_USER, utime));
            out.push(Metric::unsigned(metrics::MAJOR_PAGEFAULTS, stat.majflt));
            out.push(Metric::unsigned(metrics::MINOR_PAGEFAULTS, stat.minflt));
            out.push(Metric::signed(metrics::NUM_THREADS, stat.num_threads));
            out.push(Metric::unsigned(
                metrics::RESIDENT_MEMORY,
                stat.rss.saturating_mul(PAGE_SIZE),
            ));
        }

        if let Some(rss) = &self.rss {
            out.push(Metric::unsigned(
                metrics::RESIDENT_MEMORY_ANONYMOUS,
                rss.anonymous_bytes,
            ));
            out.push(Metric::unsigned(
                metrics::RESIDENT_MEMORY_PAGECACHE,
                rss.page_cache_bytes,
            ));
        }

        if let Some(stat) = &self.status {
            out.push(Metric::signed(metrics::START_TIME, self.start_time_seconds));
            out.push(Metric::unsigned(metrics::VIRTUAL_MEMORY, stat.vsize));
        }

        if let Some(io) = &self.io {
            out.push(Metric::unsigned(metrics::IO_READ_BYTES, io.rchar));
            out.push(Metric::unsigned(metrics::IO_WRITTEN_BYTES, io.wchar));
            out.push(Metric::unsigned(metrics::IO_READ_SYSCALLS, io.syscr));
            out.push(Metric::unsigned(metrics::IO_WRITE_SYSCALLS, io.syscw));
            out.push(Metric::unsigned(metrics::IO_STORAGE_READ_BYTES, io.read_bytes));
            out.push(Metric::unsigned(
                metrics::IO_STORAGE_WRITTEN_BYTES,
                io.write_bytes,
            ));
        }

        out
    }
}

/// Collects resource usage of the current process from `<proc_path>/self/`.
///
/// Holds no state between calls apart from the start timestamp, so a single
/// instance can be shared between threads.
pub struct ProcessMetrics<F: FileSystem> {
    fs: F,
    self_path: PathBuf,
    start_time_seconds: i64,
}

impl<F: FileSystem> ProcessMetrics<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            self_path: proc_path.as_ref().join("self"),
            start_time_seconds: process_start_time(),
        }
    }

    /// Overrides the process start time reported as `process_start_time_seconds`.
    pub fn with_start_time(mut self, start_time_seconds: i64) -> Self {
        self.start_time_seconds = start_time_seconds;
        self
    }

    pub fn start_time_seconds(&self) -> i64 {
        self.start_time_seconds
    }

    fn report_path(&self, name: &str) -> PathBuf {
        self.self_path.join(name)
    }

    fn read_report(&self, path: &Path) -> Result<String, CollectError> {
        self.fs
            .read_to_string(path)
            .map_err(|source| CollectError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Reads and parses `/proc/self/stat`.
    pub fn read_status(&self) -> Result<ProcessStatusRecord, CollectError> {
        let path = self.report_path("stat");
        let data = self.fs.read(&path).map_err(|source| CollectError::Io {
            path: path.clone(),
            source,
        })?;
        // Only the command name may hold non-UTF-8 bytes, and it is discarded.
        let content = String::from_utf8_lossy(&data);
        parse_proc_stat(&content).map_err(|source| CollectError::Parse { path, source })
    }

    /// Reads `/proc/self/smaps` and splits resident memory into page cache and anonymous.
    pub fn read_rss_breakdown(&self) -> Result<RssBreakdown, CollectError> {
        let path = self.report_path("smaps");
        let content = self.read_report(&path)?;
        parse_smaps(&content).map_err(|source| CollectError::Parse { path, source })
    }

    /// Reads and parses `/proc/self/io`.
    pub fn read_io_counters(&self) -> Result<IoCounters, CollectError> {
        let path = self.report_path("io");
        let content = self.read_report(&path)?;
        parse_proc_io(&content).map_err(|source| CollectError::Parse { path, source })
    }

    /// Counts the entries of `/proc/self/fd`.
    ///
    /// Cost grows with the number of open descriptors.
    pub fn count_open_fds(&self) -> Result<u64, CollectError> {
        let path = self.report_path("fd");
        let entries = self
            .fs
            .read_dir(&path)
            .map_err(|source| CollectError::Io { path, source })?;
        Ok(entries.len() as u64)
    }

    /// Reads the soft limit on open files from `/proc/self/limits`.
    ///
    /// Returns `u64::MAX` for `unlimited`.
    pub fn read_max_fds(&self) -> Result<u64, CollectError> {
        let path = self.report_path("limits");
        let content = self.read_report(&path)?;
        parse_max_open_files(&content).map_err(|source| CollectError::Parse { path, source })
    }

    /// Reads every report of the default collection path.
    ///
    /// Never fails: a failing report is logged and left out of the sample.
    pub fn collect(&self) -> ProcessSample {
        let started = Instant::now();

        let status = log_failure(self.read_status());
        let rss = log_failure(self.read_rss_breakdown());
        let io = log_failure(self.read_io_counters());

        debug!(
            "collected process sample in {:?} (status: {}, smaps: {}, io: {})",
            started.elapsed(),
            status.is_some(),
            rss.is_some(),
            io.is_some()
        );

        ProcessSample {
            status,
            rss,
            io,
            start_time_seconds: self.start_time_seconds,
        }
    }

    /// Returns `process_max_fds` and `process_open_fds`, or nothing if either lookup fails.
    pub fn fd_metrics(&self) -> Vec<Metric> {
        let open_fds = match self.count_open_fds() {
            Ok(n) => n,
            Err(e) => {
                error!("cannot determine open file descriptors count: {}", e);
                return Vec::new();
            }
        };
        let max_fds = match self.read_max_fds() {
            Ok(n) => n,
            Err(e) => {
                error!("cannot determine the limit on open file descriptors: {}", e);
                return Vec::new();
            }
        };
        debug!("open file descriptors: {} of {}", open_fds, max_fds);

        vec![
            Metric::unsigned(metrics::MAX_FDS, max_fds),
            Metric::unsigned(metrics::OPEN_FDS, open_fds),
        ]
    }

    /// Collects the default metrics and writes them to `w`.
    ///
    /// Only errors from `w` itself are returned.
    pub fn write_process_metrics<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_metrics(w, &self.collect().metrics())
    }

    /// Writes `process_max_fds` and `process_open_fds` to `w`.
    pub fn write_fd_metrics<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_metrics(w, &self.fd_metrics())
    }
}

fn log_failure<T>(result: Result<T, CollectError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(path = %e.path().display(), "{}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const START: i64 = 1_700_000_000;

    fn collector(fs: MockFs) -> ProcessMetrics<MockFs> {
        ProcessMetrics::new(fs, "/proc").with_start_time(START)
    }

    fn render(metrics: &[Metric]) -> String {
        let mut out = Vec::new();
        write_metrics(&mut out, metrics).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn names(metrics: &[Metric]) -> Vec<&'static str> {
        metrics.iter().map(|m| m.name).collect()
    }

    #[test]
    fn test_collect_typical_process() {
        let sample = collector(MockFs::typical_process()).collect();

        let status = sample.status.unwrap();
        assert_eq!(status.state, 'R');
        assert_eq!(status.utime, 250);
        assert_eq!(status.stime, 150);
        assert_eq!(status.rss, 10);

        let rss = sample.rss.unwrap();
        assert_eq!(rss.anonymous_bytes, 132 * 1024);
        assert_eq!(rss.page_cache_bytes, 1024 * 1024);

        let io = sample.io.unwrap();
        assert_eq!(io.rchar, 4096);
        assert_eq!(io.write_bytes, 8192);
    }

    #[test]
    fn test_write_process_metrics_end_to_end() {
        let metrics = collector(MockFs::typical_process());
        let mut out = Vec::new();
        metrics.write_process_metrics(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
process_cpu_seconds_system_total 1.5
process_cpu_seconds_total 4
process_cpu_seconds_user_total 2.5
process_major_pagefaults_total 3
process_minor_pagefaults_total 1200
process_num_threads 4
process_resident_memory_bytes 40960
process_resident_memory_anonymous_bytes 135168
process_resident_memory_pagecache_bytes 1048576
process_start_time_seconds 1700000000
process_virtual_memory_bytes 123456789
process_io_read_bytes_total 4096
process_io_written_bytes_total 2048
process_io_read_syscalls_total 10
process_io_write_syscalls_total 5
process_io_storage_read_bytes_total 0
process_io_storage_written_bytes_total 8192
"
        );
    }

    #[test]
    fn test_cpu_total_sums_ticks() {
        let mut fs = MockFs::typical_process();
        fs.add_file(
            "/proc/self/stat",
            "4242 (procmetrics) R 1 4242 4242 0 -1 4194304 1200 0 3 0 10 20 0 0 20 0 4 0 5000 123456789 10\n",
        );
        let metrics = collector(fs);
        let mut out = Vec::new();
        metrics.write_process_metrics(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with(
            "\
process_cpu_seconds_system_total 0.2
process_cpu_seconds_total 0.3
process_cpu_seconds_user_total 0.1
"
        ));
    }

    #[test]
    fn test_command_name_with_delimiter() {
        let sample = collector(MockFs::with_tricky_command_name()).collect();
        let status = sample.status.unwrap();
        assert_eq!(status.state, 'S');
        assert_eq!(status.num_threads, 2);
    }

    #[test]
    fn test_non_utf8_command_name() {
        let mut fs = MockFs::typical_process();
        fs.add_file(
            "/proc/self/stat",
            b"4242 (\xffbad\xfe) R 1 4242 4242 0 -1 4194304 1200 0 3 0 250 150 0 0 20 0 4 0 5000 123456789 10".to_vec(),
        );
        let status = collector(fs).read_status().unwrap();
        assert_eq!(status.rss, 10);
    }

    #[test]
    fn test_status_failure_keeps_other_groups() {
        let mut fs = MockFs::typical_process();
        fs.add_file("/proc/self/stat", "4242 procmetrics R 1");
        let metrics = collector(fs).collect().metrics();

        assert_eq!(
            names(&metrics),
            vec![
                metrics::RESIDENT_MEMORY_ANONYMOUS,
                metrics::RESIDENT_MEMORY_PAGECACHE,
                metrics::IO_READ_BYTES,
                metrics::IO_WRITTEN_BYTES,
                metrics::IO_READ_SYSCALLS,
                metrics::IO_WRITE_SYSCALLS,
                metrics::IO_STORAGE_READ_BYTES,
                metrics::IO_STORAGE_WRITTEN_BYTES,
            ]
        );
    }

    #[test]
    fn test_read_status_errors() {
        let mut fs = MockFs::typical_process();
        fs.add_file("/proc/self/stat", "4242 (x) R 1 2");
        let err = collector(fs).read_status().unwrap_err();
        assert!(matches!(
            err,
            CollectError::Parse {
                source: ParseError::FieldCountOrTypeMismatch { field: "session", .. },
                ..
            }
        ));
        assert_eq!(err.path(), Path::new("/proc/self/stat"));

        let mut fs = MockFs::typical_process();
        fs.remove_file("/proc/self/stat");
        let err = collector(fs).read_status().unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }));
    }

    #[test]
    fn test_smaps_failure_skips_only_rss_breakdown() {
        let metrics = collector(MockFs::with_truncated_smaps()).collect().metrics();
        let names = names(&metrics);

        assert_eq!(names.len(), 15);
        assert!(!names.contains(&metrics::RESIDENT_MEMORY_ANONYMOUS));
        assert!(!names.contains(&metrics::RESIDENT_MEMORY_PAGECACHE));
        assert_eq!(names[6], metrics::RESIDENT_MEMORY);
        assert_eq!(names[7], metrics::START_TIME);
    }

    #[test]
    fn test_read_rss_breakdown_truncated() {
        let err = collector(MockFs::with_truncated_smaps())
            .read_rss_breakdown()
            .unwrap_err();
        assert!(matches!(
            err,
            CollectError::Parse {
                source: ParseError::TruncatedEntry,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_io_suppresses_io_metrics() {
        let metrics = collector(MockFs::without_io_accounting())
            .collect()
            .metrics();
        assert_eq!(metrics.len(), 11);
        assert_eq!(metrics.last().unwrap().name, metrics::VIRTUAL_MEMORY);
    }

    #[test]
    fn test_malformed_io_suppresses_io_metrics() {
        let mut fs = MockFs::typical_process();
        fs.add_file("/proc/self/io", "rchar: 1\nwchar: -1\n");
        let sample = collector(fs).collect();
        assert!(sample.io.is_none());
        assert!(sample.status.is_some());
    }

    #[test]
    fn test_io_without_known_labels_is_zero() {
        let mut fs = MockFs::typical_process();
        fs.add_file("/proc/self/io", "cancelled_write_bytes: 0\n");
        let io = collector(fs).read_io_counters().unwrap();
        assert_eq!(io, IoCounters::default());
    }

    #[test]
    fn test_no_procfs_emits_nothing() {
        let metrics = collector(MockFs::new());
        let mut out = Vec::new();
        metrics.write_process_metrics(&mut out).unwrap();
        metrics.write_fd_metrics(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_fd_metrics() {
        let metrics = collector(MockFs::typical_process());
        assert_eq!(metrics.count_open_fds().unwrap(), 5);
        assert_eq!(metrics.read_max_fds().unwrap(), 1024);
        assert_eq!(
            render(&metrics.fd_metrics()),
            "process_max_fds 1024\nprocess_open_fds 5\n"
        );
    }

    #[test]
    fn test_fd_metrics_unlimited() {
        let mut fs = MockFs::typical_process();
        fs.add_file(
            "/proc/self/limits",
            "Max open files            unlimited            unlimited            files\n",
        );
        let metrics = collector(fs);
        assert_eq!(
            render(&metrics.fd_metrics()),
            "process_max_fds 18446744073709551615\nprocess_open_fds 5\n"
        );
    }

    #[test]
    fn test_fd_metrics_missing_limit() {
        let mut fs = MockFs::typical_process();
        fs.add_file("/proc/self/limits", "Max processes 10 10 processes\n");
        let metrics = collector(fs);

        assert!(matches!(
            metrics.read_max_fds(),
            Err(CollectError::Parse {
                source: ParseError::LabelNotFound { .. },
                ..
            })
        ));
        assert!(metrics.fd_metrics().is_empty());
    }

    #[test]
    fn test_custom_proc_path() {
        let mut fs = MockFs::new();
        fs.add_file("/host/proc/self/io", "rchar: 7\n");
        let metrics = ProcessMetrics::new(fs, "/host/proc");
        assert_eq!(metrics.read_io_counters().unwrap().rchar, 7);
    }

    #[test]
    fn test_start_time_default_is_process_wide() {
        let metrics = ProcessMetrics::new(MockFs::new(), "/proc");
        assert_eq!(metrics.start_time_seconds(), process_start_time());
    }
}
