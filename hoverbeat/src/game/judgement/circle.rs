use super::{FrameInput, Judgement, JudgementTarget, JudgementWindows};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleState {
    Pending,
    Hit { time_delta_ms: f64 },
    Missed,
}

impl CircleState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, CircleState::Pending)
    }

    /// Before the early tolerance nothing happens, inside the window a
    /// hovering pointer hits, and past the window the circle is missed.
    pub fn step(
        self,
        start_time: f64,
        input: &FrameInput,
        windows: &JudgementWindows,
    ) -> (Self, Option<Judgement>) {
        if self.is_resolved() {
            return (self, None);
        }

        let delta = input.now - start_time;
        if delta < -windows.early_tolerance_ms {
            (self, None)
        } else if delta > windows.hit_window_ms {
            (
                CircleState::Missed,
                Some(Judgement::miss(JudgementTarget::Circle)),
            )
        } else if input.pointer_on_object {
            (
                CircleState::Hit {
                    time_delta_ms: delta,
                },
                Some(Judgement::hit(JudgementTarget::Circle, Some(delta))),
            )
        } else {
            (self, None)
        }
    }
}
