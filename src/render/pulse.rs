const PULSE_MS: f64 = 100.0;
const STEP_MS: f64 = 2.0;
const GROW_STEP: f32 = 0.06;
const SHRINK_FACTOR: f32 = -0.75;
const PEAK_SCALE: f32 = 1.4;

/// Circle scale animation triggered by each beat pulse.
#[derive(Clone, Debug, Default)]
pub struct PulseAnimation {
    started_at: Option<f64>,
}

impl PulseAnimation {
    pub fn trigger(&mut self, time: f64) {
        self.started_at = Some(time);
    }

    /// Scale factor at `time` (seconds on the same clock as [`trigger`](Self::trigger)).
    pub fn scale(&self, time: f64) -> f32 {
        let Some(started_at) = self.started_at else {
            return 1.0;
        };
        let elapsed_ms = (time - started_at) * 1000.0;
        if !(0.0..PULSE_MS).contains(&elapsed_ms) {
            return 1.0;
        }

        let steps = (elapsed_ms / STEP_MS) as usize;
        let mut scale = 1.0f32;
        let mut direction = 1.0f32;
        for _ in 0..steps {
            scale += GROW_STEP * direction;
            if scale >= PEAK_SCALE {
                direction = SHRINK_FACTOR;
            } else if scale <= 1.0 {
                direction = 1.0;
            }
        }
        scale.max(1.0)
    }
}
