use std::io::{self, Write};
use std::sync::Mutex;

/// Synchronous destination for formatted log lines.
///
/// Implementations receive one serialized JSON object per call, without a
/// trailing newline, and are responsible for writing it as a single line.
/// `write_line` may be called concurrently from independently scheduled
/// execution units; implementations must serialize their own output if
/// the underlying writer is not safe for concurrent writers.
pub trait LogSink: Send + Sync {
    /// Write a single formatted record.
    ///
    /// **Parameters**
    /// - `line`: one compact JSON object, no embedded raw newlines.
    ///
    /// **Returns**
    /// - `Ok(())` if the line was accepted by the destination.
    /// - `Err(..)` on I/O failure. The handler reports the failure on
    ///   stderr and drops the record; it never propagates the error into
    ///   the caller's business logic.
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Flush any buffered output, if the destination buffers.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink writing one line per record to the standard output stream.
///
/// Line and newline are written under a single stdout lock, so records
/// from concurrent executions never interleave mid-line.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Sink capturing lines in memory.
///
/// Useful for asserting on emitted records in tests without touching the
/// process stdout. Keep a clone of the `Arc` handed to `configure_with_sink`
/// and inspect it with [`MemorySink::lines`].
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far, in emission order.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drop all captured lines.
    pub fn clear(&self) {
        match self.lines.lock() {
            Ok(mut lines) => lines.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
        Ok(())
    }
}
