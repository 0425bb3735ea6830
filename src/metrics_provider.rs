//! Host readings consumed by the sampler.
//!
//! The sampler only sees the [`MetricsProvider`] trait. [`SysinfoProvider`]
//! is the production implementation; tests script their own.

use std::io;

use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::sample_buffer::{Percent, Sample};

/// Raw reading returned by a provider for one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    /// Memory held by this process, in bytes.
    pub memory_allocated_bytes: u64,
    /// CPU utilisation as fractions in `0.0..=1.0`. May be empty when the
    /// provider has no data point for this tick.
    pub cpu_used_fractions: Vec<f64>,
    /// Host memory in use, as a fraction in `0.0..=1.0`.
    pub virtual_memory_used_fraction: f64,
}

impl Reading {
    /// Converts the reading into a sample.
    ///
    /// `previous_cpu` is used when the reading carries no finite CPU data point, so
    /// a missed measurement repeats the last value instead of dropping to 0.
    pub fn to_sample(&self, previous_cpu: Percent) -> Sample {
        let cpu_used_percent = self
            .cpu_used_fractions
            .first()
            .filter(|f| f.is_finite())
            .map(|&f| fraction_to_percent(f))
            .unwrap_or(previous_cpu);

        Sample {
            memory_used_kb: self.memory_allocated_bytes / 1024,
            memory_free_percent: 100 - fraction_to_percent(self.virtual_memory_used_fraction),
            cpu_used_percent,
        }
    }
}

/// Rounds a fraction to a whole percent, clamped to `0..=100`.
pub fn fraction_to_percent(fraction: f64) -> Percent {
    if fraction.is_nan() {
        return 0;
    }
    (fraction * 100.0).round().clamp(0.0, 100.0) as Percent
}

/// Source of host readings.
pub trait MetricsProvider: Send {
    fn sample(&mut self) -> io::Result<Reading>;
}

impl<P: MetricsProvider + ?Sized> MetricsProvider for Box<P> {
    fn sample(&mut self) -> io::Result<Reading> {
        (**self).sample()
    }
}

/// Reads process memory, host memory and global CPU usage through `sysinfo`.
///
/// CPU usage is computed from the delta between two refreshes, so the first
/// call reports no CPU data point.
pub struct SysinfoProvider {
    sys: System,
    pid: Pid,
    cpu_primed: bool,
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProvider {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            pid: Pid::from_u32(std::process::id()),
            cpu_primed: false,
        }
    }
}

impl MetricsProvider for SysinfoProvider {
    fn sample(&mut self) -> io::Result<Reading> {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_usage();
        self.sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = self.sys.process(self.pid).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "current process not visible to sysinfo")
        })?;
        let memory_allocated_bytes = process.memory();

        let total = self.sys.total_memory();
        let virtual_memory_used_fraction = if total > 0 {
            self.sys.used_memory() as f64 / total as f64
        } else {
            0.0
        };

        let cpu_used_fractions = if self.cpu_primed && !self.sys.cpus().is_empty() {
            vec![f64::from(self.sys.global_cpu_usage()) / 100.0]
        } else {
            Vec::new()
        };
        self.cpu_primed = true;

        Ok(Reading {
            memory_allocated_bytes,
            cpu_used_fractions,
            virtual_memory_used_fraction,
        })
    }
}
