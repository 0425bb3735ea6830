use std::fmt;
use std::io::{self, Write};

/// In-memory accumulator in front of the stats file.
///
/// Writes never touch the underlying sink and never fail: losing telemetry
/// must not break the code path that produced it. The accumulated bytes are
/// handed to the sink in one write by [`BufferedStatSink::flush`].
///
/// Delivery is at most once per batch. If the sink rejects a batch the
/// pending bytes are still cleared and the failure is returned to the
/// caller, who may report it through a [`FlushObserver`].
pub struct BufferedStatSink {
    inner: Box<dyn Write + Send>,
    pending: Vec<u8>,
}

impl BufferedStatSink {
    /// Starts an empty batch in front of `inner`.
    pub fn new(inner: impl Write + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            pending: Vec::new(),
        }
    }

    /// Number of bytes waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Moves the pending batch to the underlying sink and clears it.
    ///
    /// Returns the number of bytes delivered. An empty batch is a no-op and
    /// does not call the sink at all.
    pub fn flush(&mut self) -> Result<usize, FlushFailure> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let result = self
            .inner
            .write_all(&self.pending)
            .and_then(|_| self.inner.flush());
        let len = self.pending.len();
        self.pending.clear();

        match result {
            Ok(()) => Ok(len),
            Err(error) => Err(FlushFailure { error, lost_bytes: len }),
        }
    }
}

impl Write for BufferedStatSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedStatSink::flush(self).map(|_| ()).map_err(|f| f.error)
    }
}

/// A stats batch the underlying sink refused. The batch is gone.
#[derive(Debug)]
pub struct FlushFailure {
    pub error: io::Error,
    pub lost_bytes: usize,
}

impl fmt::Display for FlushFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stats flush failed, {} bytes dropped: {}", self.lost_bytes, self.error)
    }
}

impl std::error::Error for FlushFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Receives stats flush failures that would otherwise be dropped silently.
///
/// The sampler calls the observer from its own thread, right after the
/// failed flush and before the next tick.
pub trait FlushObserver: Send {
    fn flush_failed(&self, failure: &FlushFailure);
}

impl<F> FlushObserver for F
where
    F: Fn(&FlushFailure) + Send,
{
    fn flush_failed(&self, failure: &FlushFailure) {
        self(failure)
    }
}

/// Default observer: reports the failure as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFlushFailure;

impl FlushObserver for LogFlushFailure {
    fn flush_failed(&self, failure: &FlushFailure) {
        tracing::warn!(
            lost_bytes = failure.lost_bytes,
            error = %failure.error,
            "stats flush failed, batch dropped"
        );
    }
}
