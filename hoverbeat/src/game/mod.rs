/*!
 * Game logic.
 *
 * [`JudgementEngine`] owns a chart and a clock. Every tick it spawns objects
 * whose lead time has started, steps the state machine of every spawned and
 * unresolved object, and returns what happened.
 */
use crate::{
    chart::{runtime::SpawnInstruction, Chart, ObjectId},
    config::JudgementConfig,
};

use self::{
    conductor::ClockSource,
    input::{HandAngles, PointerSignal, RotationSignal},
    judgement::{FrameInput, JudgementOutcome, JudgementWindows, ObjectState},
};

pub mod conductor;
pub mod input;
pub mod judgement;

/// Everything one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub now: f64,
    pub spawned: Vec<SpawnInstruction>,
    pub outcomes: Vec<JudgementOutcome>,
}

pub struct JudgementEngine<C: ClockSource> {
    chart: Chart,
    clock: C,
    windows: JudgementWindows,
    spawn_schedule: Vec<SpawnInstruction>,
    next_spawn: usize,
    /// Indexed by object id. `None` only while a state is being stepped.
    states: Vec<Option<ObjectState>>,
    /// Spawned and unresolved, in spawn order.
    active: Vec<ObjectId>,
}

impl<C: ClockSource> JudgementEngine<C> {
    pub fn new(chart: Chart, clock: C, config: &JudgementConfig) -> Self {
        let windows = JudgementWindows::new(config, &chart);
        let spawn_schedule = chart.spawn_schedule();
        let states = chart
            .hit_objects
            .iter()
            .map(|object| Some(ObjectState::for_object(object)))
            .collect();

        log::debug!(
            "Judgement engine ready: {} objects, hit window {}ms",
            chart.hit_objects.len(),
            windows.hit_window_ms
        );

        Self {
            chart,
            clock,
            windows,
            spawn_schedule,
            next_spawn: 0,
            states,
            active: Vec::new(),
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn windows(&self) -> &JudgementWindows {
        &self.windows
    }

    pub fn state(&self, object: ObjectId) -> Option<&ObjectState> {
        self.states.get(object.0).and_then(Option::as_ref)
    }

    pub fn active_objects(&self) -> &[ObjectId] {
        &self.active
    }

    /// Every object has spawned and been resolved.
    pub fn is_finished(&self) -> bool {
        self.next_spawn >= self.spawn_schedule.len() && self.active.is_empty()
    }

    /// Advances the session to the clock's current position.
    ///
    /// The clock is read once, the pointer is asked once per active object
    /// and each hand is sampled once, only while a spinner is active.
    pub fn tick<P, R>(&mut self, pointer: &mut P, rotation: &mut R) -> TickReport
    where
        P: PointerSignal + ?Sized,
        R: RotationSignal + ?Sized,
    {
        let now = self.clock.now_ms();
        let mut report = TickReport {
            now,
            ..Default::default()
        };

        while let Some(instruction) = self.spawn_schedule.get(self.next_spawn) {
            if instruction.spawn_time > now {
                break;
            }
            log::debug!("Spawning {:?} at {}", instruction.object, now);
            self.active.push(instruction.object);
            report.spawned.push(*instruction);
            self.next_spawn += 1;
        }

        let spinner_active = self
            .active
            .iter()
            .any(|id| self.chart.hit_objects[id.0].is_spinner());
        let hand_angles = if spinner_active {
            HandAngles::sample(rotation)
        } else {
            HandAngles::default()
        };

        for &id in &self.active {
            let Some(state) = self.states[id.0].take() else {
                continue;
            };
            let object = &self.chart.hit_objects[id.0];
            let input = FrameInput {
                now,
                pointer_on_object: pointer.is_on_object(id),
                hand_angles,
            };

            let (state, judgements) = state.step(object, &input, &self.windows);
            self.states[id.0] = Some(state);

            for judgement in judgements {
                log::debug!(
                    "{:?} {:?} {:?} at {}",
                    id,
                    judgement.target,
                    judgement.result,
                    now
                );
                report.outcomes.push(JudgementOutcome {
                    object: id,
                    judged_at: now,
                    judgement,
                });
            }
        }

        let states = &self.states;
        self.active
            .retain(|id| states[id.0].as_ref().map_or(false, |s| !s.is_resolved()));

        report
    }
}
