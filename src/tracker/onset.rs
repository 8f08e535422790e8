/// Edge-triggered onset latch.
///
/// Fires on the first frame that rises above the threshold and then stays
/// disarmed until the energy drops back to or below it.
#[derive(Clone, Debug)]
pub struct OnsetDetector {
    armed: bool,
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl OnsetDetector {
    /// Returns true when an onset fires this frame. `enabled` is false while
    /// beats come from the predictive scheduler; the latch still re-arms then.
    pub fn process(&mut self, amplitude: f64, threshold: f64, enabled: bool) -> bool {
        let below = amplitude <= threshold;
        if below {
            self.armed = true;
        }
        if self.armed && !below && enabled {
            self.armed = false;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_crossing() {
        let mut detector = OnsetDetector::default();
        let fired: Vec<bool> = [5.0, 12.0, 15.0, 11.0, 9.0, 14.0]
            .iter()
            .map(|&a| detector.process(a, 10.0, true))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn never_fires_twice_without_rearm() {
        let mut detector = OnsetDetector::default();
        let amplitudes = [3.0, 20.0, 30.0, 25.0, 10.0, 40.0, 50.0, 9.0, 11.0];
        let mut last_fire: Option<usize> = None;
        for (i, &a) in amplitudes.iter().enumerate() {
            if detector.process(a, 10.0, true) {
                if let Some(prev) = last_fire {
                    assert!(amplitudes[prev + 1..i].iter().any(|&x| x <= 10.0));
                }
                last_fire = Some(i);
            }
        }
        assert_eq!(last_fire, Some(8));
    }

    #[test]
    fn disabled_detector_still_rearms() {
        let mut detector = OnsetDetector::default();
        assert!(detector.process(20.0, 10.0, true));
        assert!(!detector.process(5.0, 10.0, false));
        assert!(detector.is_armed());
        assert!(!detector.process(20.0, 10.0, false));
        assert!(detector.process(21.0, 10.0, true));
    }

    #[test]
    fn equal_to_threshold_counts_as_below() {
        let mut detector = OnsetDetector::default();
        assert!(!detector.process(10.0, 10.0, true));
        assert!(detector.is_armed());
    }
}
