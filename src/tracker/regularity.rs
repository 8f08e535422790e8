use super::history::BeatHistory;

/// How many of the most recent onsets are searched.
pub const SEARCH_WINDOW: usize = 8;
const MIN_COMBO_LEN: usize = 3;
/// Largest allowed deviation of any gap from the reference gap, in seconds.
pub const INTERVAL_TOLERANCE: f64 = 0.1;

/// A subset of recent onsets forming an approximately arithmetic sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Regularity {
    /// Ascending indices into the onset history.
    pub indices: Vec<usize>,
    /// Timestamps at those indices.
    pub times: Vec<f64>,
}

impl Regularity {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Mean of the consecutive gaps. `None` with fewer than two timestamps.
    pub fn mean_interval(&self) -> Option<f64> {
        mean_interval(&self.times)
    }
}

pub fn mean_interval(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let total: f64 = times.windows(2).map(|w| w[1] - w[0]).sum();
    Some(total / (times.len() - 1) as f64)
}

/// Lexicographic k-subsets of `0..n`.
struct Combinations {
    n: usize,
    current: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            current: (0..k).collect(),
            done: k > n || k == 0,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let out = self.current.clone();

        let k = self.current.len();
        // rightmost position that can still advance
        match (0..k).rev().find(|&i| self.current[i] < self.n - k + i) {
            Some(i) => {
                self.current[i] += 1;
                for j in i + 1..k {
                    self.current[j] = self.current[j - 1] + 1;
                }
            }
            None => self.done = true,
        }

        Some(out)
    }
}

/// Search the last eight onsets for the longest regular subset.
///
/// Longer subsets are tried first; within a length, subsets are tried in
/// lexicographic order and the first match wins. Needs more than eight onsets
/// of history, otherwise returns an empty result.
pub fn find_regularity(history: &BeatHistory) -> Regularity {
    let len = history.len();
    if len <= SEARCH_WINDOW {
        return Regularity::default();
    }
    let offset = len - SEARCH_WINDOW;
    let window = history.tail(SEARCH_WINDOW);

    for combo_len in (MIN_COMBO_LEN..=SEARCH_WINDOW).rev() {
        for combo in Combinations::new(SEARCH_WINDOW, combo_len) {
            if is_regular(&window, &combo) {
                return Regularity {
                    times: combo.iter().map(|&i| window[i]).collect(),
                    indices: combo.iter().map(|&i| i + offset).collect(),
                };
            }
        }
    }

    Regularity::default()
}

fn is_regular(window: &[f64], combo: &[usize]) -> bool {
    let reference = window[combo[1]] - window[combo[0]];
    combo
        .windows(2)
        .all(|pair| ((window[pair[1]] - window[pair[0]]) - reference).abs() <= INTERVAL_TOLERANCE)
}
