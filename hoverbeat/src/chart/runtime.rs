use hoverbeat_geometry::SliderPath;

use super::{
    difficulty::Difficulty,
    nested::schedule_nested_events,
    parse::{ChartInfo, ParseWarningKind, ParsedChart, RawHitObjectKind},
    stacking::apply_stacking,
    timing::TimingModel,
    Chart, HitObject, HitObjectKind, ObjectId, Slider, Spinner, DEFAULT_COMBO_COLOURS,
    SPINNER_DEGREES_PER_SECOND,
};

/// Keeps slider durations finite when the velocity collapses to zero.
const MIN_PIXELS_PER_BEAT: f64 = 1e-3;

/// Tells the presentation layer when to bring an object on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnInstruction {
    pub object: ObjectId,
    pub spawn_time: f64,
    pub lead_time: f64,
}

/// Slider length in milliseconds over all spans.
pub fn slider_duration(
    timing: &TimingModel,
    difficulty: &Difficulty,
    start_time: f64,
    pixel_length: f64,
    repeat_count: u32,
) -> f64 {
    let pixels_per_beat = (difficulty.slider_multiplier
        * 100.0
        * timing.speed_multiplier_at(start_time))
    .max(MIN_PIXELS_PER_BEAT);

    pixel_length * repeat_count.max(1) as f64 / pixels_per_beat * timing.ms_per_beat_at(start_time)
}

/// Interval between slider ticks, infinite when ticks are disabled.
pub fn tick_interval(timing: &TimingModel, difficulty: &Difficulty, start_time: f64) -> f64 {
    let tick_rate = difficulty.slider_tick_rate;
    if !tick_rate.is_finite() || tick_rate <= 0.0 {
        return f64::INFINITY;
    }

    timing.ms_per_beat_at(start_time) / tick_rate
}

impl Chart {
    /// Spawn instructions ordered by spawn time.
    pub fn spawn_schedule(&self) -> Vec<SpawnInstruction> {
        let mut schedule = self
            .hit_objects
            .iter()
            .enumerate()
            .map(|(i, object)| SpawnInstruction {
                object: ObjectId(i),
                spawn_time: object.spawn_time(),
                lead_time: object.approach_lead_time_ms,
            })
            .collect::<Vec<_>>();
        schedule.sort_by(|a, b| a.spawn_time.total_cmp(&b.spawn_time));

        schedule
    }
}

impl ChartInfo {
    pub(crate) fn create_chart(mut self) -> ParsedChart {
        self.combo_colours.sort_by_key(|(index, _)| *index);
        let mut combo_colours = self
            .combo_colours
            .iter()
            .map(|(_, colour)| *colour)
            .collect::<Vec<_>>();
        if combo_colours.is_empty() {
            combo_colours = DEFAULT_COMBO_COLOURS.to_vec();
        }

        // Implicit resets go first so explicit speed points at the same time win.
        let mut difficulty_points = std::mem::take(&mut self.speed_resets);
        difficulty_points.append(&mut self.difficulty_points);
        let timing = TimingModel::new(std::mem::take(&mut self.timing_points), difficulty_points);

        let difficulty = self.difficulty;
        let lead_time = difficulty.lead_time_ms();

        let mut raw_objects = std::mem::take(&mut self.hit_objects);
        raw_objects.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut hit_objects = Vec::with_capacity(raw_objects.len());
        let mut combo_index = 0;
        let mut index_in_combo = 0;
        let mut previous_was_spinner = false;

        for (i, raw) in raw_objects.into_iter().enumerate() {
            let new_combo = i == 0 || previous_was_spinner || raw.new_combo;
            if new_combo {
                combo_index = if i == 0 {
                    raw.combo_offset as usize
                } else {
                    combo_index + 1 + raw.combo_offset as usize
                };
                index_in_combo = 0;
            } else {
                index_in_combo += 1;
            }

            let kind = match raw.kind {
                RawHitObjectKind::Circle => {
                    previous_was_spinner = false;
                    HitObjectKind::Circle
                }
                RawHitObjectKind::Slider {
                    curve_type,
                    control_points,
                    repeat_count,
                    pixel_length,
                } => {
                    previous_was_spinner = false;

                    let path = SliderPath::new(curve_type, &control_points, pixel_length);
                    let length = if pixel_length > 0.0 {
                        pixel_length
                    } else {
                        path.length()
                    };
                    let duration =
                        slider_duration(&timing, &difficulty, raw.start_time, length, repeat_count);

                    HitObjectKind::Slider(Slider {
                        curve_type,
                        control_points,
                        repeat_count,
                        pixel_length,
                        path,
                        duration,
                        nested_events: Vec::new(),
                    })
                }
                RawHitObjectKind::Spinner { end_time } => {
                    previous_was_spinner = true;

                    let end_time = if end_time < raw.start_time {
                        self.warn(
                            raw.line,
                            ParseWarningKind::SpinnerEndsBeforeStart {
                                start_time: raw.start_time,
                                end_time,
                            },
                        );
                        raw.start_time
                    } else {
                        end_time
                    };

                    HitObjectKind::Spinner(Spinner {
                        end_time,
                        required_rotation_degrees: (end_time - raw.start_time) / 1000.0
                            * SPINNER_DEGREES_PER_SECOND,
                    })
                }
            };

            hit_objects.push(HitObject {
                start_time: raw.start_time,
                position: raw.position,
                stacked_position: raw.position,
                stack_height: 0,
                new_combo,
                combo_offset: raw.combo_offset,
                combo_index,
                index_in_combo,
                approach_lead_time_ms: lead_time,
                hit_sound: raw.hit_sound,
                kind,
            });
        }

        apply_stacking(
            &mut hit_objects,
            self.general.stack_leniency,
            difficulty.circle_radius(),
        );

        for object in hit_objects.iter_mut() {
            if let HitObjectKind::Slider(slider) = &mut object.kind {
                slider.nested_events = schedule_nested_events(
                    object.start_time,
                    slider.duration,
                    slider.repeat_count,
                    tick_interval(&timing, &difficulty, object.start_time),
                    &slider.path,
                    object.stacked_position,
                );
            }
        }

        log::debug!(
            "Created chart with {} hit objects and {} warnings",
            hit_objects.len(),
            self.warnings.len()
        );

        ParsedChart {
            chart: Chart {
                format_version: self.format_version,
                general: self.general,
                metadata: self.metadata,
                difficulty,
                events: self.events,
                timing,
                combo_colours,
                hit_objects,
            },
            warnings: self.warnings,
        }
    }
}
