use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A sink shared between several writers for the lifetime of the process.
pub type SharedSink<W> = Arc<Mutex<W>>;

/// Pass-through writer that tallies the bytes it forwards.
///
/// Every write goes straight to the shared sink, unchanged and unbuffered.
/// The running total only counts bytes the sink accepted, and is read and
/// cleared in one atomic step by [`CountingWriter::count`], so a reporter on
/// another thread can poll it without losing bytes written concurrently.
///
/// # Examples
///
/// ```
/// # use stat_logger::counting_writer::CountingWriter;
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
/// let writer = CountingWriter::new(sink.clone());
///
/// writer.write_all(b"hello ").unwrap();
/// writer.write_all(b"world").unwrap();
///
/// assert_eq!(writer.count(), 11);
/// assert_eq!(writer.count(), 0);
/// assert_eq!(&sink.lock()[..], b"hello world");
/// ```
pub struct CountingWriter<W> {
    sink: SharedSink<W>,
    bytes: AtomicUsize,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps `sink` with a zeroed tally. Other writers may share the same sink.
    pub fn new(sink: SharedSink<W>) -> Self {
        Self {
            sink,
            bytes: AtomicUsize::new(0),
        }
    }

    /// Forwards `buf` to the sink and returns whatever the sink returned.
    ///
    /// On success the counter grows by the accepted length. Errors propagate
    /// unchanged and count nothing.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink.lock().write(buf)?;
        self.bytes.fetch_add(n, Ordering::AcqRel);
        Ok(n)
    }

    /// Writes the whole buffer under a single lock of the sink.
    ///
    /// Holding the lock for the full buffer keeps lines from different
    /// writers on the same sink from interleaving.
    pub fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        let mut sink = self.sink.lock();
        while !buf.is_empty() {
            match sink.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    self.bytes.fetch_add(n, Ordering::AcqRel);
                    buf = &buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Returns the bytes written since the previous call and resets the tally.
    pub fn count(&self) -> usize {
        self.bytes.swap(0, Ordering::AcqRel)
    }

    /// The shared sink, for callers that need to lock it directly.
    pub fn sink(&self) -> &SharedSink<W> {
        &self.sink
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CountingWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.lock().flush()
    }
}
