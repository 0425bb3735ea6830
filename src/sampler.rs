use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::metrics_provider::MetricsProvider;
use crate::registry::TelemetryContext;
use crate::sample_buffer::{Sample, SampleBuffer};
use crate::stat_sink::{FlushObserver, LogFlushFailure};

/// Outcome of a single sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub sample: Sample,
    /// The tick completed a buffer cycle and the stats batch was flushed.
    pub flushed: bool,
}

/// The sampling loop.
///
/// Each tick reads the provider, records one [`Sample`], writes a stats
/// line, and flushes the stats batch when the sample buffer wraps. The
/// sampler is the only writer of its buffer, so the buffer needs no lock.
///
/// Flushing happens on the sampler's thread before the next tick: a slow
/// stats file delays sampling instead of dropping samples.
pub struct Sampler<P> {
    ctx: Arc<TelemetryContext>,
    provider: P,
    buffer: SampleBuffer,
    last: Sample,
    observer: Box<dyn FlushObserver>,
}

impl<P: MetricsProvider> Sampler<P> {
    /// Builds a sampler with a buffer of `capacity` samples, flushing the
    /// stats batch of `ctx` once per cycle.
    ///
    /// # Errors
    ///
    /// Fails with the [`SampleBuffer::new`] errors for an unusable capacity.
    pub fn new(ctx: Arc<TelemetryContext>, provider: P, capacity: usize) -> Result<Self, Error> {
        Ok(Self {
            ctx,
            provider,
            buffer: SampleBuffer::new(capacity)?,
            last: Sample::default(),
            observer: Box::new(LogFlushFailure),
        })
    }

    /// Replaces the observer told about failed stats flushes.
    pub fn with_flush_observer(mut self, observer: impl FlushObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Takes one sample, logs it and flushes if the buffer wrapped.
    ///
    /// A failed provider read repeats the previous sample, and a reading
    /// without a usable CPU value carries the previous CPU percent forward.
    pub fn tick(&mut self) -> Tick {
        let sample = match self.provider.sample() {
            Ok(reading) => reading.to_sample(self.last.cpu_used_percent),
            Err(e) => {
                tracing::warn!(error = %e, "metrics provider failed, repeating previous sample");
                self.last
            }
        };
        self.last = sample;

        let full = self.buffer.record(sample);

        if let Err(e) = self.ctx.stat(format_args!(
            "Mem free: {}% | Mem used: {} KB | CPU: {}%",
            sample.memory_free_percent, sample.memory_used_kb, sample.cpu_used_percent
        )) {
            tracing::warn!(error = %e, "failed to write stats line");
        }

        if full {
            self.flush();
        }
        Tick { sample, flushed: full }
    }

    fn flush(&mut self) {
        match self.ctx.flush_stats() {
            Ok(bytes) => tracing::debug!(bytes, samples = self.buffer.samples().len(), "stats flushed"),
            Err(failure) => self.observer.flush_failed(&failure),
        }
    }

    /// Ticks every `interval` until `stop` receives a message or its sender
    /// is dropped, then flushes whatever part of the batch is pending.
    ///
    /// Deadlines are fixed from the start time. Ticks that fall due while a
    /// previous tick is still running are skipped, not replayed.
    pub fn run(mut self, interval: Duration, stop: Receiver<()>) {
        tracing::info!(
            ?interval,
            capacity = self.buffer.capacity(),
            "sampler started"
        );

        let mut next = Instant::now() + interval;
        loop {
            let wait = next.saturating_duration_since(Instant::now());
            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {
                    self.tick();
                    next += interval;
                    let now = Instant::now();
                    while next <= now {
                        next += interval;
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.ctx.pending_stats() > 0 {
            self.flush();
        }
        tracing::info!("sampler stopped");
    }
}
