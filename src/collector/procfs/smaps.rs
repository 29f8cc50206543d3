//! Scanner for `/proc/[pid]/smaps`.
//!
//! The report is a sequence of per-mapping blocks:
//!
//! ```text
//! 7f5c2a400000-7f5c2a421000 rw-p 00000000 00:00 0          [heap]
//! Size:                132 kB
//! Rss:                  64 kB
//! Anonymous:            64 kB
//! ...
//! VmFlags: rd wr mr mw me ac sd
//! ```
//!
//! Only `Rss:` and `Anonymous:` are kept. A region with any anonymous memory
//! counts entirely as anonymous, otherwise entirely as page cache.

use super::parser::{ParseError, parse_decimal};

const KB_SUFFIX: &str = " kB";
const RSS_LABEL: &str = "Rss:";
const ANONYMOUS_LABEL: &str = "Anonymous:";
const VMFLAGS_LABEL: &str = "VmFlags:";

/// Resident memory of one mapping region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryRegionEntry {
    pub rss_bytes: u64,
    pub anonymous_bytes: u64,
}

impl MemoryRegionEntry {
    /// Whether the region's resident memory is counted as anonymous.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous_bytes != 0
    }

    fn absorb(&mut self, line: &str) -> Result<(), ParseError> {
        if let Some(size) = line.strip_prefix(RSS_LABEL) {
            self.rss_bytes = parse_smaps_size(size)?;
        } else if let Some(size) = line.strip_prefix(ANONYMOUS_LABEL) {
            self.anonymous_bytes = parse_smaps_size(size)?;
        }
        Ok(())
    }
}

/// Parses a `<uint> kB` size into bytes.
pub fn parse_smaps_size(text: &str) -> Result<u64, ParseError> {
    let text = text.trim();
    let malformed = |reason: String| ParseError::MalformedSize {
        text: text.to_string(),
        reason,
    };

    let number = text
        .strip_suffix(KB_SUFFIX)
        .ok_or_else(|| malformed(format!("missing {:?} suffix", KB_SUFFIX)))?;
    let kb: u64 = parse_decimal(number).map_err(|e| malformed(format!("{}", e)))?;
    kb.checked_mul(1024)
        .ok_or_else(|| malformed(format!("too big size: {} kB", kb)))
}

enum ScanState {
    /// Between regions; the next line is a mapping header.
    Idle,
    /// Inside a region, collecting fields until `VmFlags:`.
    Accumulating(MemoryRegionEntry),
    /// A region is complete and ready to be yielded.
    Emit(MemoryRegionEntry),
    /// End of input or a failure; nothing more is yielded.
    Done,
}

/// Single-pass scanner yielding one [`MemoryRegionEntry`] per mapping region.
///
/// A failure is yielded once as `Some(Err(_))`, after which the scanner is
/// exhausted; [`SmapsEntryScanner::error`] still returns it. A clean end of
/// input is `None` with no error.
pub struct SmapsEntryScanner<I> {
    lines: I,
    state: ScanState,
    error: Option<ParseError>,
}

impl<'a> SmapsEntryScanner<std::str::Lines<'a>> {
    /// Creates a scanner over the full text of an smaps report.
    pub fn new(content: &'a str) -> Self {
        Self::from_lines(content.lines())
    }
}

impl<'a, I: Iterator<Item = &'a str>> SmapsEntryScanner<I> {
    /// Creates a scanner over an arbitrary line source.
    pub fn from_lines(lines: I) -> Self {
        Self {
            lines,
            state: ScanState::Idle,
            error: None,
        }
    }

    /// Returns the failure that stopped the scan, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    fn fail(&mut self, err: ParseError) -> Option<Result<MemoryRegionEntry, ParseError>> {
        self.error = Some(err.clone());
        Some(Err(err))
    }
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for SmapsEntryScanner<I> {
    type Item = Result<MemoryRegionEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ScanState::Done) {
                ScanState::Idle => match self.lines.next() {
                    // The header line is a boundary marker only
                    Some(_) => ScanState::Accumulating(MemoryRegionEntry::default()),
                    None => return None,
                },
                ScanState::Accumulating(mut entry) => match self.lines.next() {
                    Some(line) if line.starts_with(VMFLAGS_LABEL) => ScanState::Emit(entry),
                    Some(line) => match entry.absorb(line) {
                        Ok(()) => ScanState::Accumulating(entry),
                        Err(e) => return self.fail(e),
                    },
                    None => return self.fail(ParseError::TruncatedEntry),
                },
                ScanState::Emit(entry) => {
                    self.state = ScanState::Idle;
                    return Some(Ok(entry));
                }
                ScanState::Done => return None,
            };
        }
    }
}

/// Resident memory split into page cache and anonymous memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RssBreakdown {
    pub page_cache_bytes: u64,
    pub anonymous_bytes: u64,
}

impl RssBreakdown {
    /// Adds a region to the page cache or anonymous total.
    pub fn add(&mut self, entry: &MemoryRegionEntry) {
        let total = if entry.is_anonymous() {
            &mut self.anonymous_bytes
        } else {
            &mut self.page_cache_bytes
        };
        *total = total.saturating_add(entry.rss_bytes);
    }

    /// Total resident bytes over all regions.
    pub fn total_bytes(&self) -> u64 {
        self.page_cache_bytes.saturating_add(self.anonymous_bytes)
    }
}

/// Scans a whole smaps report and folds it into an [`RssBreakdown`].
pub fn parse_smaps(content: &str) -> Result<RssBreakdown, ParseError> {
    SmapsEntryScanner::new(content).try_fold(
        RssBreakdown::default(),
        |mut rss, entry| -> Result<RssBreakdown, ParseError> {
            rss.add(&entry?);
            Ok(rss)
        },
    )
}
