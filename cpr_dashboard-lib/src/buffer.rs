use std::collections::VecDeque;

/// Two seconds of history at the producer's 250 Hz.
pub const DEFAULT_WAVEFORM_CAPACITY: usize = 500;

/// Fixed-capacity FIFO window feeding the waveform chart.
#[derive(Clone, Debug)]
pub struct WaveformBuffer {
    samples:  VecDeque<f64>,
    capacity: usize,
}

impl WaveformBuffer {
    /// A zero capacity is bumped to one so the window always shows the newest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append in arrival order, evicting the oldest samples past capacity.
    pub fn extend(&mut self, batch: &[f64]) {
        // only the tail of an oversized batch can survive
        let skip = batch.len().saturating_sub(self.capacity);
        for &sample in &batch[skip..] {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first copy of the window, as the chart plots it.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

impl Default for WaveformBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WAVEFORM_CAPACITY)
    }
}
