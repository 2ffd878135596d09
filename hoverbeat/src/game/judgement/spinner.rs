use crate::{chart::Spinner, game::input::Hand};

use super::{FrameInput, HitResult, Judgement, JudgementTarget, JudgementWindows};

/// Requirements at or below this many degrees count as met.
const MIN_REQUIRED_ROTATION: f64 = 1e-6;

/// Signed difference from `from` to `to` in degrees, in `[-180, 180)`.
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SpinnerState {
    last_angles: [Option<f64>; 2],
    /// Unsigned degrees, already scaled by sensitivity.
    accumulated_rotation: f64,
    result: Option<HitResult>,
}

impl SpinnerState {
    pub fn accumulated_rotation(&self) -> f64 {
        self.accumulated_rotation
    }

    pub fn result(&self) -> Option<HitResult> {
        self.result
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    pub fn progress(&self, spinner: &Spinner) -> f64 {
        if spinner.required_rotation_degrees <= MIN_REQUIRED_ROTATION {
            return 1.0;
        }

        self.accumulated_rotation / spinner.required_rotation_degrees
    }

    pub fn step(
        mut self,
        start_time: f64,
        spinner: &Spinner,
        input: &FrameInput,
        windows: &JudgementWindows,
    ) -> (Self, Option<Judgement>) {
        if self.is_resolved() {
            return (self, None);
        }

        let active = input.now >= start_time && input.now <= spinner.end_time;
        if active {
            for hand in Hand::ALL {
                let current = input.hand_angles.get(hand);
                let last = &mut self.last_angles[hand.index()];

                if let (Some(previous), Some(current)) = (*last, current) {
                    self.accumulated_rotation +=
                        shortest_angle_delta(previous, current).abs() * windows.spinner_sensitivity;
                }
                *last = current;
            }
        }

        if input.now <= spinner.end_time {
            return (self, None);
        }

        let progress = self.progress(spinner);
        let target = JudgementTarget::Spinner { progress };
        let judgement = if progress >= 1.0 {
            Judgement::hit(target, None)
        } else {
            Judgement::miss(target)
        };
        self.result = Some(judgement.result);

        (self, Some(judgement))
    }
}
