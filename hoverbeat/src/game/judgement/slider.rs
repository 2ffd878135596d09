use crate::chart::Slider;

use super::{FrameInput, HitResult, Judgement, JudgementTarget, JudgementWindows};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadState {
    Pending,
    Hit { time_delta_ms: f64 },
    Missed,
}

/// The head is judged like a circle with its own late window. Missing it
/// does not end the slider; the body's checkpoints are still judged and the
/// slider only fails if nothing at all was hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderState {
    head: HeadState,
    /// One entry per nested event consumed so far.
    checkpoint_hits: Vec<bool>,
    checkpoint_count: usize,
    result: Option<HitResult>,
}

impl SliderState {
    pub fn new(checkpoint_count: usize) -> Self {
        Self {
            head: HeadState::Pending,
            checkpoint_hits: Vec::with_capacity(checkpoint_count),
            checkpoint_count,
            result: None,
        }
    }

    pub fn head(&self) -> HeadState {
        self.head
    }

    pub fn checkpoint_hits(&self) -> &[bool] {
        &self.checkpoint_hits
    }

    pub fn result(&self) -> Option<HitResult> {
        self.result
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }

    fn head_delta(&self) -> Option<f64> {
        match self.head {
            HeadState::Hit { time_delta_ms } => Some(time_delta_ms),
            _ => None,
        }
    }

    pub fn step(
        mut self,
        start_time: f64,
        slider: &Slider,
        input: &FrameInput,
        windows: &JudgementWindows,
    ) -> (Self, Vec<Judgement>) {
        let mut judgements = Vec::new();
        if self.is_resolved() {
            return (self, judgements);
        }

        let end_time = start_time + slider.duration;

        if self.head == HeadState::Pending {
            let delta = input.now - start_time;
            if delta > windows.slider_head_window_ms {
                self.head = HeadState::Missed;
                judgements.push(Judgement::miss(JudgementTarget::SliderHead));
            } else if delta >= -windows.early_tolerance_ms && input.pointer_on_object {
                self.head = HeadState::Hit {
                    time_delta_ms: delta,
                };
                judgements.push(Judgement::hit(JudgementTarget::SliderHead, Some(delta)));
            }
        }

        let events = slider.nested_events.iter().take(self.checkpoint_count);
        for (index, event) in events.enumerate().skip(self.checkpoint_hits.len()) {
            if input.now < event.time {
                break;
            }

            let target = JudgementTarget::SliderCheckpoint {
                index,
                kind: event.kind,
            };
            self.checkpoint_hits.push(input.pointer_on_object);
            judgements.push(if input.pointer_on_object {
                Judgement::hit(target, None)
            } else {
                Judgement::miss(target)
            });
        }

        if input.now > end_time {
            if self.head == HeadState::Pending {
                self.head = HeadState::Missed;
                judgements.push(Judgement::miss(JudgementTarget::SliderHead));
            }

            let head_hit = usize::from(matches!(self.head, HeadState::Hit { .. }));
            let checkpoints_hit = head_hit + self.checkpoint_hits.iter().filter(|&&hit| hit).count();
            let target = JudgementTarget::Slider {
                checkpoints_hit,
                checkpoints_total: self.checkpoint_count + 1,
            };

            let judgement = if checkpoints_hit > 0 {
                Judgement::hit(target, self.head_delta())
            } else {
                Judgement::miss(target)
            };
            self.result = Some(judgement.result);
            judgements.push(judgement);
        }

        (self, judgements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::{parse_chart, HitObject, NestedEventKind},
        game::input::HandAngles,
    };

    const WINDOWS: JudgementWindows = JudgementWindows {
        early_tolerance_ms: 20.0,
        hit_window_ms: 150.0,
        slider_head_window_ms: 150.0,
        spinner_sensitivity: 1.0,
    };

    /// 1000ms long with ticks at 1250, 1500 and 1750, tail at 2000.
    fn slider_object() -> HitObject {
        let chart = parse_chart(
            "[Difficulty]\nSliderMultiplier:1\nSliderTickRate:2\n\n[TimingPoints]\n0,500,4,2,0,100,1,0\n\n\
             [HitObjects]\n0,0,1000,2,0,L|200:0,1,200\n",
        )
        .chart;
        chart.hit_objects[0].clone()
    }

    fn run(object: &HitObject, frames: &[(f64, bool)]) -> (SliderState, Vec<Judgement>) {
        let slider = object.as_slider().cloned().unwrap_or_else(|| panic!("not a slider"));
        let mut state = SliderState::new(slider.nested_events.len());
        let mut all = Vec::new();

        for &(now, pointer_on_object) in frames {
            let input = FrameInput {
                now,
                pointer_on_object,
                hand_angles: HandAngles::default(),
            };
            let (next, judgements) = state.step(object.start_time, &slider, &input, &WINDOWS);
            state = next;
            all.extend(judgements);
        }

        (state, all)
    }

    #[test]
    fn fixture_layout() {
        let object = slider_object();
        let events = &object.as_slider().map(|s| s.nested_events.clone()).unwrap_or_default();

        assert_eq!(object.duration(), 1000.0);
        let times = events.iter().map(|e| e.time).collect::<Vec<_>>();
        assert_eq!(times, vec![1250.0, 1500.0, 1750.0, 2000.0]);
        assert_eq!(events[3].kind, NestedEventKind::Tail);
    }

    #[test]
    fn fully_tracked_slider() {
        let object = slider_object();
        let frames = [(1000.0, true), (1250.0, true), (1500.0, true), (1750.0, true), (2000.0, true), (2001.0, true)];
        let (state, judgements) = run(&object, &frames);

        assert_eq!(state.result(), Some(HitResult::Hit));
        assert_eq!(state.head(), HeadState::Hit { time_delta_ms: 0.0 });
        assert_eq!(judgements.len(), 6);
        assert_eq!(
            judgements.last().map(|j| j.target),
            Some(JudgementTarget::Slider {
                checkpoints_hit: 5,
                checkpoints_total: 5
            })
        );
    }

    #[test]
    fn missed_head_with_tracked_body_still_hits() {
        let object = slider_object();
        let frames = [(1000.0, false), (1151.0, false), (1250.0, true), (1500.0, true), (1750.0, true), (2000.0, true), (2001.0, false)];
        let (state, judgements) = run(&object, &frames);

        assert_eq!(state.head(), HeadState::Missed);
        assert_eq!(judgements[0], Judgement::miss(JudgementTarget::SliderHead));
        assert_eq!(state.checkpoint_hits(), &[true, true, true, true]);

        let last = judgements.last().copied();
        assert_eq!(last.map(|j| j.result), Some(HitResult::Hit));
        assert_eq!(
            last.map(|j| j.target),
            Some(JudgementTarget::Slider {
                checkpoints_hit: 4,
                checkpoints_total: 5
            })
        );
    }

    #[test]
    fn nothing_hit_is_a_miss() {
        let object = slider_object();
        let (state, judgements) = run(&object, &[(900.0, false), (2500.0, false)]);

        assert_eq!(state.result(), Some(HitResult::Miss));
        // Head, four checkpoints and the final verdict.
        assert_eq!(judgements.len(), 6);
        assert!(judgements.iter().all(|j| j.result == HitResult::Miss));
    }

    #[test]
    fn head_is_locked_before_early_tolerance() {
        let object = slider_object();
        let (state, judgements) = run(&object, &[(970.0, true)]);

        assert_eq!(state.head(), HeadState::Pending);
        assert!(judgements.is_empty());
    }

    #[test]
    fn checkpoints_use_the_current_frame() {
        let object = slider_object();
        let (state, _) = run(&object, &[(1000.0, true), (1600.0, false), (1800.0, true)]);

        assert_eq!(state.checkpoint_hits(), &[false, false, true]);
        assert!(!state.is_resolved());
    }

    #[test]
    fn resolved_slider_is_inert() {
        let object = slider_object();
        let (state, _) = run(&object, &[(2500.0, true)]);
        let (again, judgements) = run_from(state.clone(), &object, 9000.0);

        assert_eq!(again, state);
        assert!(judgements.is_empty());
    }

    fn run_from(state: SliderState, object: &HitObject, now: f64) -> (SliderState, Vec<Judgement>) {
        let slider = object.as_slider().cloned().unwrap_or_else(|| panic!("not a slider"));
        let input = FrameInput {
            now,
            pointer_on_object: true,
            hand_angles: HandAngles::default(),
        };
        state.step(object.start_time, &slider, &input, &WINDOWS)
    }
}
