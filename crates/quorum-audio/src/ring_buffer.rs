/// Fixed-capacity ring of f32 samples, overwriting the oldest data on
/// overflow.
///
/// Overflow is expected steady-state behavior for a reference-audio history,
/// not a fault, so `append` never errors and the buffer never grows past the
/// capacity chosen at construction.
///
/// The buffer itself is single-writer/single-reader; callers that touch it
/// from more than one thread wrap it in a lock scoped to the append/read
/// critical section (the leakage detector does exactly that).
pub struct RingSampleBuffer {
    data: Vec<f32>,
    capacity: usize,
    /// Next write position.
    head: usize,
    /// Number of valid samples, capped at `capacity`.
    len: usize,
}

impl RingSampleBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            data: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Capacity sized to hold `secs` of audio at `sample_rate_hz`.
    pub fn with_duration(secs: f32, sample_rate_hz: u32) -> Self {
        let capacity = ((secs * sample_rate_hz as f32).ceil() as usize).max(1);
        Self::new(capacity)
    }

    /// Append samples, silently discarding the oldest once full.
    pub fn append(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        // Only the trailing `capacity` samples of a huge write can survive.
        let tail = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };
        for &s in tail {
            self.data[self.head] = s;
            self.head = (self.head + 1) % self.capacity;
        }
        self.len = (self.len + tail.len()).min(self.capacity);
    }

    /// The most recent `count` samples, oldest first.
    ///
    /// Returns `None` when less history than `count` exists; callers relying
    /// on lag windows must check before aligning against it.
    pub fn last_n(&self, count: usize) -> Option<Vec<f32>> {
        if count > self.len {
            return None;
        }
        let mut out = Vec::with_capacity(count);
        // Oldest of the requested window sits `count` behind the head.
        let start = (self.head + self.capacity - count) % self.capacity;
        for i in 0..count {
            out.push(self.data[(start + i) % self.capacity]);
        }
        Some(out)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
