//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc/self` states
//! for testing various process and kernel conditions.

use super::filesystem::MockFs;

const TYPICAL_STAT: &str = "4242 (procmetrics) R 1 4242 4242 0 -1 4194304 1200 0 3 0 250 150 0 0 20 0 4 0 5000 123456789 10 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 3 0 0 0 0 0\n";

const TYPICAL_SMAPS: &str = "\
55d0c0a3e000-55d0c0a5f000 rw-p 00000000 00:00 0                          [heap]
Size:                132 kB
KernelPageSize:        4 kB
MMUPageSize:           4 kB
Rss:                 132 kB
Pss:                 132 kB
Shared_Clean:          0 kB
Shared_Dirty:          0 kB
Private_Clean:         0 kB
Private_Dirty:       132 kB
Referenced:          132 kB
Anonymous:           132 kB
LazyFree:              0 kB
AnonHugePages:         0 kB
ShmemPmdMapped:        0 kB
FilePmdMapped:         0 kB
Shared_Hugetlb:        0 kB
Private_Hugetlb:       0 kB
Swap:                  0 kB
SwapPss:               0 kB
Locked:                0 kB
THPeligible:    0
VmFlags: rd wr mr mw me ac sd
7f1e5c428000-7f1e5c5bd000 r-xp 00028000 fd:01 2364                       /usr/lib/x86_64-linux-gnu/libc.so.6
Size:               1620 kB
KernelPageSize:        4 kB
MMUPageSize:           4 kB
Rss:                1000 kB
Pss:                  48 kB
Shared_Clean:       1000 kB
Shared_Dirty:          0 kB
Private_Clean:         0 kB
Private_Dirty:         0 kB
Referenced:         1000 kB
Anonymous:             0 kB
LazyFree:              0 kB
AnonHugePages:         0 kB
Swap:                  0 kB
SwapPss:               0 kB
Locked:                0 kB
THPeligible:    0
VmFlags: rd ex mr mw me sd
7f1e5c615000-7f1e5c61b000 r--p 00000000 fd:01 4021                       /usr/share/locale/locale.alias
Size:                 24 kB
Rss:                  24 kB
Pss:                  24 kB
Anonymous:             0 kB
VmFlags: rd mr mw me sd
";

const TYPICAL_IO: &str = "\
rchar: 4096
wchar: 2048
syscr: 10
syscw: 5
read_bytes: 0
write_bytes: 8192
cancelled_write_bytes: 0
";

const TYPICAL_LIMITS: &str = "\
Limit                     Soft Limit           Hard Limit           Units
Max cpu time              unlimited            unlimited            seconds
Max file size             unlimited            unlimited            bytes
Max data size             unlimited            unlimited            bytes
Max stack size            8388608              unlimited            bytes
Max core file size        0                    unlimited            bytes
Max resident set          unlimited            unlimited            bytes
Max processes             63344                63344                processes
Max open files            1024                 524288               files
Max locked memory         8388608              8388608              bytes
Max address space         unlimited            unlimited            bytes
Max file locks            unlimited            unlimited            locks
Max pending signals       63344                63344                signals
Max msgqueue size         819200               819200               bytes
Max nice priority         0                    0
Max realtime priority     0                    0
Max realtime timeout      unlimited            unlimited            us
";

impl MockFs {
    /// Creates `/proc/self` of a typical running process.
    ///
    /// 250/150 ticks of user/system time, 10 resident pages, 132 kB of
    /// anonymous and 1024 kB of page cache memory, 5 open descriptors.
    pub fn typical_process() -> Self {
        let mut fs = Self::new();
        fs.add_self(TYPICAL_STAT, TYPICAL_SMAPS, TYPICAL_IO, TYPICAL_LIMITS, 5);
        fs
    }

    /// Creates a process whose command name contains `") "` and spaces.
    pub fn with_tricky_command_name() -> Self {
        let mut fs = Self::typical_process();
        fs.add_file(
            "/proc/self/stat",
            "4243 (a) R 1 (b) S 1 4243 4243 0 -1 4194304 10 0 0 0 1 1 0 0 20 0 2 0 6000 1000000 5 18446744073709551615\n",
        );
        fs
    }

    /// Creates a process whose smaps report ends in the middle of a region.
    pub fn with_truncated_smaps() -> Self {
        let mut fs = Self::typical_process();
        let truncated = TYPICAL_SMAPS
            .trim_end()
            .trim_end_matches("VmFlags: rd mr mw me sd");
        fs.add_file("/proc/self/smaps", truncated);
        fs
    }

    /// Creates a process on a kernel built without task I/O accounting.
    pub fn without_io_accounting() -> Self {
        let mut fs = Self::typical_process();
        fs.remove_file("/proc/self/io");
        fs
    }
}

#[cfg(test)]
mod tests {
    use crate::collector::procfs::parser::{parse_max_open_files, parse_proc_io, parse_proc_stat};
    use crate::collector::procfs::smaps::parse_smaps;

    use super::*;

    #[test]
    fn test_typical_reports_parse() {
        assert_eq!(parse_proc_stat(TYPICAL_STAT).unwrap().num_threads, 4);
        assert_eq!(parse_smaps(TYPICAL_SMAPS).unwrap().total_bytes(), 1156 * 1024);
        assert_eq!(parse_proc_io(TYPICAL_IO).unwrap().syscr, 10);
        assert_eq!(parse_max_open_files(TYPICAL_LIMITS).unwrap(), 1024);
    }

    #[test]
    fn test_truncated_smaps_has_no_final_vmflags() {
        let fs = MockFs::with_truncated_smaps();
        let content = crate::collector::traits::FileSystem::read_to_string(
            &fs,
            std::path::Path::new("/proc/self/smaps"),
        )
        .unwrap();
        assert!(content.ends_with("Anonymous:             0 kB\n"));
    }
}
