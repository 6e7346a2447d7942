//! Call stack capture and trimming for error reports
//!
//! A raw trace is a header line followed by frame pairs: the symbol of a
//! call site, then its source location. Error reporting needs the header to
//! recognize the format, and expects the first frame after it to be the
//! application's own code, so the frames belonging to the hook machinery
//! are cut out.

use std::backtrace::{Backtrace, BacktraceStatus};

/// Index of the first candidate call-site line. Lines 1 and 2 hold the
/// capture function's own frame.
pub const DEFAULT_SCAN_OFFSET: usize = 3;

/// Symbol prefixes treated as dispatch plumbing rather than application code.
pub const DEFAULT_INTERNAL_PREFIXES: [&str; 9] = [
    "stackdriver_hook::",
    "tracing::",
    "tracing_core::",
    "tracing_subscriber::",
    "std::thread::local::",
    "core::ops::function::",
    "core::iter::",
    "core::option::",
    "alloc::vec::",
];

const UNKNOWN_LOCATION: &str = "\t<unknown>";

/// Produces the current thread's call stack as text lines.
pub trait StackCapture: Send + Sync {
    fn capture(&self) -> Vec<String>;
}

impl<F> StackCapture for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn capture(&self) -> Vec<String> {
        self()
    }
}

/// Captures through `std::backtrace`, regardless of `RUST_BACKTRACE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

impl StackCapture for BacktraceCapture {
    #[inline(never)]
    fn capture(&self) -> Vec<String> {
        let backtrace = Backtrace::force_capture();
        let header = current_thread_header();

        if backtrace.status() != BacktraceStatus::Captured {
            return vec![header];
        }

        let frames = parse_backtrace(&backtrace.to_string())
            .into_iter()
            .filter(|(symbol, _)| !is_capture_machinery(symbol));

        render_frames(header, frames)
    }
}

fn current_thread_header() -> String {
    let thread = std::thread::current();
    format!("thread '{}' [running]:", thread.name().unwrap_or("<unnamed>"))
}

fn is_capture_machinery(symbol: &str) -> bool {
    symbol.starts_with("std::backtrace") || symbol.starts_with("backtrace::")
}

/// Split `std::backtrace::Backtrace` output into `(symbol, location)` frames.
///
/// Symbol lines look like `  3: path::to::f`, or carry no index when the
/// symbol was inlined into the previous frame. Location lines start with `at `.
pub(crate) fn parse_backtrace(text: &str) -> Vec<(String, Option<String>)> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some((_, slot)) = frames.last_mut() {
                if slot.is_none() {
                    *slot = Some(location.to_string());
                }
            }
            continue;
        }

        let symbol = match trimmed.split_once(": ") {
            Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => trimmed,
        };
        frames.push((symbol.to_string(), None));
    }

    frames
}

/// Lay frames out as header + (symbol, location) line pairs.
pub(crate) fn render_frames(
    header: String,
    frames: impl IntoIterator<Item = (String, Option<String>)>,
) -> Vec<String> {
    let mut lines = vec![header];
    for (symbol, location) in frames {
        lines.push(symbol);
        lines.push(match location {
            Some(location) => format!("\t{}", location),
            None => UNKNOWN_LOCATION.to_string(),
        });
    }
    lines
}

/// Removes leading internal frames from a captured trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSanitizer {
    scan_offset: usize,
    internal_prefixes: Vec<String>,
}

impl Default for StackSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_OFFSET, DEFAULT_INTERNAL_PREFIXES)
    }
}

impl StackSanitizer {
    /// `scan_offset` is clamped to at least 1 so the header is never scanned.
    pub fn new<I, S>(scan_offset: usize, internal_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scan_offset: scan_offset.max(1),
            internal_prefixes: internal_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn scan_offset(&self) -> usize {
        self.scan_offset
    }

    pub fn internal_prefixes(&self) -> &[String] {
        &self.internal_prefixes
    }

    fn is_internal(&self, call_site: &str) -> bool {
        let symbol = call_site.trim_start().trim_start_matches('<');
        self.internal_prefixes
            .iter()
            .any(|prefix| symbol.starts_with(prefix.as_str()))
    }

    /// Trim a newline separated trace.
    pub fn sanitize(&self, raw: &str) -> String {
        let lines: Vec<&str> = raw.split('\n').collect();
        self.sanitize_lines(&lines)
    }

    /// Trim a trace already split into lines and join the result with `\n`.
    pub fn sanitize_lines<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let Some(header) = lines.first() else {
            return String::new();
        };

        let mut index = self.scan_offset;
        while index < lines.len() && self.is_internal(lines[index].as_ref()) {
            index += 2;
        }

        // ran off the end: keep everything past the fixed offset
        let start = if index < lines.len() {
            index
        } else {
            self.scan_offset.min(lines.len())
        };

        let mut kept: Vec<&str> = Vec::with_capacity(lines.len() - start + 1);
        kept.push(header.as_ref());
        kept.extend(lines[start..].iter().map(AsRef::as_ref));
        kept.join("\n")
    }
}

/// Function and source position of one frame in a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub function: String,
    pub file: String,
    /// 0 when the location carries no line number
    pub line: u32,
}

/// The first frame after the header of a (sanitized) trace.
///
/// Returns `None` when the trace holds only the header.
pub fn first_call_site(trace: &str) -> Option<CallSite> {
    let mut lines = trace.split('\n').skip(1);
    let function = lines.next()?.trim();
    if function.is_empty() {
        return None;
    }

    let location = lines.next().map(str::trim).unwrap_or("<unknown>");
    let (file, line) = split_location(location);
    Some(CallSite {
        function: function.to_string(),
        file: file.to_string(),
        line,
    })
}

/// `path:line:column` or `path:line` into the path and line number.
fn split_location(location: &str) -> (&str, u32) {
    let mut file = location;
    let mut numbers: Vec<&str> = Vec::with_capacity(2);
    while numbers.len() < 2 {
        match file.rsplit_once(':') {
            Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => {
                numbers.push(tail);
                file = head;
            }
            _ => break,
        }
    }

    let line = numbers
        .last()
        .and_then(|number| number.parse().ok())
        .unwrap_or(0);
    (file, line)
}
