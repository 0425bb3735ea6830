#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use stat_logger::{BufferedStatSink, MetricsProvider, MultiSink, Reading, TelemetryContext};

/// Sink keeping every write call as a separate chunk.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_calls(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.writes.lock().unwrap().concat()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_owned).collect()
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink accepting at most `limit` bytes per write call.
#[derive(Clone)]
pub struct ShortSink {
    pub limit: usize,
    pub inner: RecordingSink,
}

impl ShortSink {
    pub fn new(limit: usize) -> Self {
        Self { limit, inner: RecordingSink::new() }
    }
}

impl Write for ShortSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.limit);
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink rejecting every write.
#[derive(Clone, Default)]
pub struct FailingSink {
    pub attempts: Arc<Mutex<usize>>,
}

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        *self.attempts.lock().unwrap() += 1;
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Provider replaying a fixed list of readings, then repeating the last one.
pub struct ScriptedProvider {
    readings: VecDeque<io::Result<Reading>>,
    last: Reading,
}

impl ScriptedProvider {
    pub fn new(readings: Vec<io::Result<Reading>>) -> Self {
        Self {
            readings: readings.into(),
            last: Reading::default(),
        }
    }
}

impl MetricsProvider for ScriptedProvider {
    fn sample(&mut self) -> io::Result<Reading> {
        match self.readings.pop_front() {
            Some(Ok(reading)) => {
                self.last = reading.clone();
                Ok(reading)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.clone()),
        }
    }
}

/// Reading with the given free memory %, used KB and CPU %.
pub fn reading(free_pct: u8, used_kb: u64, cpu_pct: Option<u8>) -> io::Result<Reading> {
    Ok(Reading {
        memory_allocated_bytes: used_kb * 1024,
        cpu_used_fractions: cpu_pct.map(|c| vec![f64::from(c) / 100.0]).unwrap_or_default(),
        virtual_memory_used_fraction: f64::from(100 - free_pct) / 100.0,
    })
}

/// Context writing the general log and the stats file into recording sinks.
pub fn recording_context() -> (TelemetryContext, RecordingSink, RecordingSink) {
    let log = RecordingSink::new();
    let stats = RecordingSink::new();
    let ctx = TelemetryContext::new(
        MultiSink::new().with(log.clone()),
        BufferedStatSink::new(stats.clone()),
    );
    (ctx, log, stats)
}

/// Message part of a leveled or stats line, after the timestamp.
pub fn after_timestamp(line: &str) -> &str {
    let (_, rest) = line.split_once(": ").unwrap();
    // "YYYY/MM/DD HH:MM:SS "
    &rest[20..]
}
