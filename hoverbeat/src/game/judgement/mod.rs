/*!
 * Judgement state machines.
 *
 * Each object kind has its own state type with a `step` that takes the
 * current state and this frame's inputs and returns the next state together
 * with whatever judgements were resolved. Resolved states never change again.
 */
use crate::{
    chart::{Chart, HitObject, HitObjectKind, NestedEventKind, ObjectId},
    config::JudgementConfig,
};

use super::input::HandAngles;

pub mod circle;
pub mod slider;
pub mod spinner;

pub use circle::CircleState;
pub use slider::SliderState;
pub use spinner::SpinnerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitResult {
    Hit,
    Miss,
}

/// What a judgement refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JudgementTarget {
    Circle,
    SliderHead,
    SliderCheckpoint { index: usize, kind: NestedEventKind },
    /// Final verdict over the head and every checkpoint.
    Slider { checkpoints_hit: usize, checkpoints_total: usize },
    Spinner { progress: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgement {
    pub target: JudgementTarget,
    pub result: HitResult,
    /// `now - start_time` at the moment of a timed hit.
    pub time_delta_ms: Option<f64>,
}

impl Judgement {
    pub fn hit(target: JudgementTarget, time_delta_ms: Option<f64>) -> Self {
        Self {
            target,
            result: HitResult::Hit,
            time_delta_ms,
        }
    }

    pub fn miss(target: JudgementTarget) -> Self {
        Self {
            target,
            result: HitResult::Miss,
            time_delta_ms: None,
        }
    }
}

/// A judgement tied to the object it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementOutcome {
    pub object: ObjectId,
    /// Clock position of the tick that produced it.
    pub judged_at: f64,
    pub judgement: Judgement,
}

impl JudgementOutcome {
    pub fn is_hit(&self) -> bool {
        self.judgement.result == HitResult::Hit
    }
}

/// Windows for one chart under one configuration, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementWindows {
    pub early_tolerance_ms: f64,
    /// Latest hit after a circle's start time.
    pub hit_window_ms: f64,
    pub slider_head_window_ms: f64,
    pub spinner_sensitivity: f64,
}

impl JudgementWindows {
    pub fn new(config: &JudgementConfig, chart: &Chart) -> Self {
        Self {
            early_tolerance_ms: config.early_tolerance_ms,
            hit_window_ms: chart.difficulty.hit_windows().judgement_window(),
            slider_head_window_ms: config.slider_head_window_ms,
            spinner_sensitivity: config.spinner_sensitivity,
        }
    }
}

/// Everything an object sees of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub now: f64,
    pub pointer_on_object: bool,
    pub hand_angles: HandAngles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectState {
    Circle(CircleState),
    Slider(SliderState),
    Spinner(SpinnerState),
}

impl ObjectState {
    pub fn for_object(object: &HitObject) -> Self {
        match &object.kind {
            HitObjectKind::Circle => ObjectState::Circle(CircleState::Pending),
            HitObjectKind::Slider(slider) => {
                ObjectState::Slider(SliderState::new(slider.nested_events.len()))
            }
            HitObjectKind::Spinner(_) => ObjectState::Spinner(SpinnerState::default()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            ObjectState::Circle(state) => state.is_resolved(),
            ObjectState::Slider(state) => state.is_resolved(),
            ObjectState::Spinner(state) => state.is_resolved(),
        }
    }

    pub fn step(
        self,
        object: &HitObject,
        input: &FrameInput,
        windows: &JudgementWindows,
    ) -> (Self, Vec<Judgement>) {
        match (self, &object.kind) {
            (ObjectState::Circle(state), _) => {
                let (state, judgement) = state.step(object.start_time, input, windows);
                (ObjectState::Circle(state), judgement.into_iter().collect())
            }
            (ObjectState::Slider(state), HitObjectKind::Slider(slider)) => {
                let (state, judgements) = state.step(object.start_time, slider, input, windows);
                (ObjectState::Slider(state), judgements)
            }
            (ObjectState::Spinner(state), HitObjectKind::Spinner(spinner)) => {
                let (state, judgement) = state.step(object.start_time, spinner, input, windows);
                (ObjectState::Spinner(state), judgement.into_iter().collect())
            }
            (state, _) => {
                log::debug!("Judgement state does not match its object, ignoring");
                (state, Vec::new())
            }
        }
    }
}
