//! Parsers for `/proc/[pid]` report files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::num::ParseIntError;
use std::str::FromStr;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A labeled line has no whitespace separator after its label.
    MalformedLine { line: String },
    /// A value is not a valid integer or does not fit its target width.
    InvalidNumber { text: String, source: ParseIntError },
    /// A smaps size field is not `<uint> kB` or does not fit in bytes.
    MalformedSize { text: String, reason: String },
    /// No `") "` terminating the command name in a stat line.
    CommandDelimiterNotFound { line: String },
    /// A stat field is missing or does not parse as its expected type.
    FieldCountOrTypeMismatch {
        field: &'static str,
        value: Option<String>,
    },
    /// The smaps report ended inside a region (no `VmFlags:` line).
    TruncatedEntry,
    /// A required label does not appear anywhere in the report.
    LabelNotFound { label: &'static str },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MalformedLine { line } => {
                write!(f, "cannot find whitespace after label in {:?}", line)
            }
            ParseError::InvalidNumber { text, source } => {
                write!(f, "cannot parse {:?}: {}", text, source)
            }
            ParseError::MalformedSize { text, reason } => {
                write!(f, "invalid size {:?}: {}", text, reason)
            }
            ParseError::CommandDelimiterNotFound { line } => {
                write!(f, "cannot find command in parentheses in {:?}", line)
            }
            ParseError::FieldCountOrTypeMismatch { field, value: None } => {
                write!(f, "missing field {}", field)
            }
            ParseError::FieldCountOrTypeMismatch {
                field,
                value: Some(value),
            } => write!(f, "invalid {}: {:?}", field, value),
            ParseError::TruncatedEntry => write!(f, "unexpected end of stream"),
            ParseError::LabelNotFound { label } => write!(f, "cannot find {:?}", label),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::InvalidNumber { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Returns the text following `label` on `line`, with surrounding whitespace removed.
///
/// The label must be followed by at least one whitespace character, e.g.
/// `"rchar: 123"` for the label `"rchar:"`.
pub fn split_label<'a>(line: &'a str, label: &str) -> Result<&'a str, ParseError> {
    let malformed = || ParseError::MalformedLine {
        line: line.to_string(),
    };
    let rest = line.strip_prefix(label).ok_or_else(malformed)?;
    if !rest.starts_with(char::is_whitespace) {
        return Err(malformed());
    }
    Ok(rest.trim())
}

/// Parses a decimal integer as the kernel prints it, without a leading `+`.
pub fn parse_decimal<T: FromStr>(text: &str) -> Result<T, T::Err> {
    if text.starts_with('+') {
        // A bare sign fails with the integer parser's own error
        return "+".parse();
    }
    text.parse()
}

/// Parses the integer that follows `label` on a `label value` line.
pub fn parse_labeled_value<T>(line: &str, label: &str) -> Result<T, ParseError>
where
    T: FromStr<Err = ParseIntError>,
{
    let text = split_label(line, label)?;
    parse_decimal(text).map_err(|source| ParseError::InvalidNumber {
        text: text.to_string(),
        source,
    })
}

/// Parsed data from `/proc/[pid]/stat`, up to and including `rss`.
///
/// Fields before the state (pid and command name) are not retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessStatusRecord {
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u32,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    /// User CPU time in clock ticks.
    pub utime: u64,
    /// System CPU time in clock ticks.
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub itrealvalue: i64,
    /// Start time in clock ticks since boot.
    pub starttime: u64,
    /// Virtual memory size in bytes.
    pub vsize: u64,
    /// Resident set size in pages.
    pub rss: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The command name can contain spaces, parentheses and even `") "`, so the
/// fixed fields start after the last `") "` in the line.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcessStatusRecord, ParseError> {
    let end = content
        .rfind(") ")
        .ok_or_else(|| ParseError::CommandDelimiterNotFound {
            line: content.to_string(),
        })?;
    let mut fields = content[end + 2..].split_whitespace();

    let mut next = |name: &'static str| {
        fields.next().ok_or(ParseError::FieldCountOrTypeMismatch {
            field: name,
            value: None,
        })
    };

    let state = {
        let token = next("state")?;
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(ParseError::FieldCountOrTypeMismatch {
                    field: "state",
                    value: Some(token.to_string()),
                });
            }
        }
    };

    Ok(ProcessStatusRecord {
        state,
        ppid: parse_field(next("ppid")?, "ppid")?,
        pgrp: parse_field(next("pgrp")?, "pgrp")?,
        session: parse_field(next("session")?, "session")?,
        tty_nr: parse_field(next("tty_nr")?, "tty_nr")?,
        tpgid: parse_field(next("tpgid")?, "tpgid")?,
        flags: parse_field(next("flags")?, "flags")?,
        minflt: parse_field(next("minflt")?, "minflt")?,
        cminflt: parse_field(next("cminflt")?, "cminflt")?,
        majflt: parse_field(next("majflt")?, "majflt")?,
        cmajflt: parse_field(next("cmajflt")?, "cmajflt")?,
        utime: parse_field(next("utime")?, "utime")?,
        stime: parse_field(next("stime")?, "stime")?,
        cutime: parse_field(next("cutime")?, "cutime")?,
        cstime: parse_field(next("cstime")?, "cstime")?,
        priority: parse_field(next("priority")?, "priority")?,
        nice: parse_field(next("nice")?, "nice")?,
        num_threads: parse_field(next("num_threads")?, "num_threads")?,
        itrealvalue: parse_field(next("itrealvalue")?, "itrealvalue")?,
        starttime: parse_field(next("starttime")?, "starttime")?,
        vsize: parse_field(next("vsize")?, "vsize")?,
        rss: parse_field(next("rss")?, "rss")?,
    })
}

fn parse_field<T: FromStr>(token: &str, name: &'static str) -> Result<T, ParseError> {
    parse_decimal(token).map_err(|_| ParseError::FieldCountOrTypeMismatch {
            field: name,
            value: Some(token.to_string()),
        })
}

/// Parsed data from `/proc/[pid]/io`.
///
/// Counters the kernel does not report stay at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoCounters {
    pub rchar: u64,
    pub wchar: u64,
    pub syscr: u64,
    pub syscw: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is `label: value` pairs, one per line. Unknown labels are ignored;
/// a recognised label with a malformed value fails the whole report.
pub fn parse_proc_io(content: &str) -> Result<IoCounters, ParseError> {
    let mut io = IoCounters::default();

    for line in content.lines() {
        let line = line.trim();
        let Some((label, _)) = line.split_once(':') else {
            continue;
        };
        let counter = match label {
            "rchar" => &mut io.rchar,
            "wchar" => &mut io.wchar,
            "syscr" => &mut io.syscr,
            "syscw" => &mut io.syscw,
            "read_bytes" => &mut io.read_bytes,
            "write_bytes" => &mut io.write_bytes,
            _ => continue,
        };
        *counter = parse_labeled_value(line, &line[..label.len() + 1])?;
    }

    Ok(io)
}

/// Label of the open files row in `/proc/[pid]/limits`.
const MAX_OPEN_FILES: &str = "Max open files";

/// Parses the soft limit on open files from `/proc/[pid]/limits`.
///
/// Returns `u64::MAX` when the soft limit is `unlimited`.
///
/// ```text
/// Limit                     Soft Limit           Hard Limit           Units
/// Max open files            1024                 4096                 files
/// ```
pub fn parse_max_open_files(content: &str) -> Result<u64, ParseError> {
    let line = content
        .lines()
        .find(|line| line.starts_with(MAX_OPEN_FILES))
        .ok_or(ParseError::LabelNotFound {
            label: MAX_OPEN_FILES,
        })?;

    let rest = split_label(line, MAX_OPEN_FILES)?;
    let (soft, _) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| ParseError::MalformedLine {
            line: line.to_string(),
        })?;

    if soft == "unlimited" {
        return Ok(u64::MAX);
    }
    parse_decimal(soft).map_err(|source| ParseError::InvalidNumber {
        text: soft.to_string(),
        source,
    })
}
