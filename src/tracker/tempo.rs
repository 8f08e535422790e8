use super::history::BeatHistory;
use super::regularity::mean_interval;

/// Onsets needed before a tempo is reported.
pub const TEMPO_WINDOW: usize = 8;

/// BPM from the mean gap of the last eight onsets.
///
/// Returns 0.0 when there is not enough history; callers treat 0 as "unknown"
/// rather than a tempo.
pub fn estimate_bpm(history: &BeatHistory) -> f64 {
    if history.len() < TEMPO_WINDOW {
        return 0.0;
    }
    match mean_interval(&history.tail(TEMPO_WINDOW)) {
        Some(gap) if gap > 0.0 => 60.0 / gap,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_second_grid_is_120_bpm() {
        let history: BeatHistory = (0..8).map(|i| i as f64 * 0.5).collect();
        assert!((estimate_bpm(&history) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn uses_only_last_eight() {
        let mut history: BeatHistory = [0.0, 2.0, 5.0].into_iter().collect();
        for i in 0..8 {
            history.push(10.0 + i as f64 * 0.4);
        }
        assert!((estimate_bpm(&history) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn short_history_is_unknown() {
        let history: BeatHistory = (0..7).map(|i| i as f64 * 0.5).collect();
        assert_eq!(estimate_bpm(&history), 0.0);
    }

    #[test]
    fn zero_gap_is_unknown() {
        let history: BeatHistory = std::iter::repeat(3.0).take(8).collect();
        assert_eq!(estimate_bpm(&history), 0.0);
    }
}
