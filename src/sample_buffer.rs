use crate::config::MAX_CAPACITY;
use crate::error::Error;

/// Whole percent in `0..=100`.
pub type Percent = u8;

/// One point-in-time reading of the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub memory_used_kb: u64,
    pub memory_free_percent: Percent,
    pub cpu_used_percent: Percent,
}

/// Fixed ring of preallocated sample slots.
///
/// Records go to the next slot in order and the write position wraps back to
/// the first slot after the last one. The wrap is reported by [`record`] so
/// the owner can flush the completed cycle before the next record starts
/// overwriting it. Nothing survives past one cycle: this is a streaming
/// window, not a history.
///
/// [`record`]: SampleBuffer::record
#[derive(Debug)]
pub struct SampleBuffer {
    slots: Box<[Sample]>,
    write_index: usize,
    filled: usize,
}

impl SampleBuffer {
    /// Preallocates `capacity` slots.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidCapacity`] - `capacity` is zero
    /// * [`Error::CapacityTooLarge`] - `capacity` exceeds [`MAX_CAPACITY`]
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        if capacity > MAX_CAPACITY {
            return Err(Error::CapacityTooLarge { requested: capacity as u128, max: MAX_CAPACITY });
        }
        Ok(Self {
            slots: vec![Sample::default(); capacity].into_boxed_slice(),
            write_index: 0,
            filled: 0,
        })
    }

    /// Number of slots, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next record will land in.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Stores `sample` and returns `true` when this record completed a cycle.
    ///
    /// On `true` the write position is back at slot 0 and [`samples`]
    /// still holds the whole completed cycle; the next call starts
    /// overwriting it.
    ///
    /// # Examples
    ///
    /// ```
    /// use stat_logger::{Sample, SampleBuffer};
    ///
    /// let mut buffer = SampleBuffer::new(2).unwrap();
    /// assert!(!buffer.record(Sample::default()));
    /// assert!(buffer.record(Sample { memory_used_kb: 512, ..Sample::default() }));
    ///
    /// assert_eq!(buffer.write_index(), 0);
    /// assert_eq!(buffer.samples().len(), 2);
    /// assert_eq!(buffer.last().map(|s| s.memory_used_kb), Some(512));
    /// ```
    ///
    /// [`samples`]: SampleBuffer::samples
    pub fn record(&mut self, sample: Sample) -> bool {
        if self.write_index == 0 {
            self.filled = 0;
        }
        self.slots[self.write_index] = sample;
        self.filled += 1;
        self.write_index = (self.write_index + 1) % self.slots.len();
        self.write_index == 0
    }

    /// Samples of the current cycle, oldest first.
    ///
    /// Right after a wrap this is the full completed cycle; it stays valid
    /// until the next call to `record`.
    pub fn samples(&self) -> &[Sample] {
        &self.slots[..self.filled]
    }

    /// Most recently recorded sample, if any.
    pub fn last(&self) -> Option<&Sample> {
        self.samples().last()
    }
}
