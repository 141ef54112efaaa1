//! Per-dispatch transaction logging.
//!
//! Every call to [`Router::dispatch`](crate::Router::dispatch) produces exactly
//! one [`LogEntry`], handed to the router's [`LogSink`]. The sink is an
//! observer only: nothing it does can change the response.
//!
//! Two sinks ship with the crate:
//!
//! - [`TracingSink`] (the default) emits one `tracing` event per dispatch, so
//!   entries go wherever the binary's subscriber sends them.
//! - [`WriterSink`] writes one line per dispatch to any [`io::Write`]
//!   destination, as JSON or as `key=value` text.
//!
//! ```rust
//! use sluice::{Format, Router, WriterSink};
//!
//! let mut router = Router::new();
//! router.logging(WriterSink::new(std::io::stderr(), Format::Json));
//! ```

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// How a dispatch ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The chain ran and its response was returned.
    Handled,
    /// No route for the method.
    NotAllowed,
    /// A header or query predicate failed.
    NotAcceptable,
    /// A handler or middleware faulted and the boundary answered with `500`.
    Recovered,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::NotAllowed => "not_allowed",
            Self::NotAcceptable => "not_acceptable",
            Self::Recovered => "recovered",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatch, as seen by a [`LogSink`].
#[derive(Debug)]
pub struct LogEntry<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub status: StatusCode,
    pub outcome: Outcome,
    pub elapsed: Duration,
    /// The rejection or fault message, when there was one.
    pub error: Option<&'a str>,
}

impl LogEntry<'_> {
    /// Elapsed time in microseconds, saturating at `u64::MAX`.
    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Destination for per-dispatch log entries.
pub trait LogSink: Send + Sync {
    fn record(&self, entry: &LogEntry<'_>);
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn record(&self, entry: &LogEntry<'_>) {
        (**self).record(entry);
    }
}

/// Emits each entry as an `info` level `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: &LogEntry<'_>) {
        info!(
            method = %entry.method,
            path = entry.path,
            status = entry.status.as_u16(),
            outcome = %entry.outcome,
            elapsed_us = entry.elapsed_us(),
            error = entry.error,
            "request dispatched"
        );
    }
}

/// Line format used by [`WriterSink`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// One JSON object per line.
    #[default]
    Json,
    /// `key=value` pairs separated by spaces.
    Text,
}

/// Writes one line per entry to `W`.
///
/// The writer is behind a mutex, so concurrent dispatches never interleave
/// within a line. Write failures are reported through `tracing` and dropped.
///
/// Each router owns its sink, so this formats lines itself rather than
/// installing a `tracing-subscriber` layer, which would be process-global.
/// For the global stack, keep [`TracingSink`] and configure the subscriber
/// in the binary.
pub struct WriterSink<W> {
    out: Mutex<W>,
    format: Format,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(out: W, format: Format) -> Self {
        Self { out: Mutex::new(out), format }
    }

    /// Returns the destination, e.g. to inspect a `Vec<u8>` buffer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_entry(&self, entry: &LogEntry<'_>) -> io::Result<()> {
        let mut out = self.out.lock();
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *out, &JsonRecord::from(entry))?;
                out.write_all(b"\n")?;
            }
            Format::Text => {
                write!(
                    out,
                    "level=info msg=\"request dispatched\" method={} path={} status={} outcome={} elapsed_us={}",
                    entry.method,
                    entry.path,
                    entry.status.as_u16(),
                    entry.outcome,
                    entry.elapsed_us(),
                )?;
                if let Some(error) = entry.error {
                    write!(out, " error={error:?}")?;
                }
                out.write_all(b"\n")?;
            }
        }
        out.flush()
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn record(&self, entry: &LogEntry<'_>) {
        if let Err(e) = self.write_entry(entry) {
            warn!("log sink write failed: {e}");
        }
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    level: &'static str,
    msg: &'static str,
    method: &'a str,
    path: &'a str,
    status: u16,
    outcome: Outcome,
    elapsed_us: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a LogEntry<'a>> for JsonRecord<'a> {
    fn from(entry: &'a LogEntry<'a>) -> Self {
        Self {
            level: "info",
            msg: "request dispatched",
            method: entry.method.as_str(),
            path: entry.path,
            status: entry.status.as_u16(),
            outcome: entry.outcome,
            elapsed_us: entry.elapsed_us(),
            error: entry.error,
        }
    }
}
