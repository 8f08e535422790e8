use std::collections::VecDeque;

/// Number of onset timestamps retained. Regularity search and tempo both read
/// only the last 8, so this leaves plenty of headroom.
pub const HISTORY_CAPACITY: usize = 64;

/// Confirmed onset timestamps in seconds, oldest first.
///
/// Append-only from the tracker's point of view; the oldest entry is dropped
/// once the ring is full.
#[derive(Clone, Debug)]
pub struct BeatHistory {
    times: VecDeque<f64>,
    capacity: usize,
}

impl Default for BeatHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl BeatHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            times: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, time: f64) {
        if self.times.len() == self.capacity {
            self.times.pop_front();
        }
        self.times.push_back(time);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<f64> {
        self.times.back().copied()
    }

    /// The most recent `n` timestamps (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.times.len().saturating_sub(n);
        self.times.iter().skip(skip).copied().collect()
    }
}

impl FromIterator<f64> for BeatHistory {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut history = Self::default();
        for time in iter {
            history.push(time);
        }
        history
    }
}
