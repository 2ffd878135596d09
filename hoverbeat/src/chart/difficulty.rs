/*!
 * Difficulty settings and the timing windows derived from them.
 */

pub const DEFAULT_CIRCLE_SIZE: f64 = 5.0;
pub const DEFAULT_OVERALL_DIFFICULTY: f64 = 5.0;
pub const DEFAULT_APPROACH_RATE: f64 = 5.0;
pub const DEFAULT_HP_DRAIN_RATE: f64 = 5.0;
pub const DEFAULT_SLIDER_MULTIPLIER: f64 = 1.4;
pub const DEFAULT_SLIDER_TICK_RATE: f64 = 1.0;

/// `[Difficulty]` section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub hp_drain_rate: f64,
    pub circle_size: f64,
    pub overall_difficulty: f64,
    pub approach_rate: f64,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            hp_drain_rate: DEFAULT_HP_DRAIN_RATE,
            circle_size: DEFAULT_CIRCLE_SIZE,
            overall_difficulty: DEFAULT_OVERALL_DIFFICULTY,
            approach_rate: DEFAULT_APPROACH_RATE,
            slider_multiplier: DEFAULT_SLIDER_MULTIPLIER,
            slider_tick_rate: DEFAULT_SLIDER_TICK_RATE,
        }
    }
}

impl Difficulty {
    pub fn lead_time_ms(&self) -> f64 {
        lead_time_from_approach_rate(self.approach_rate)
    }

    pub fn hit_windows(&self) -> HitWindows {
        HitWindows::from_overall_difficulty(self.overall_difficulty)
    }

    pub fn circle_radius(&self) -> f64 {
        circle_radius_from_circle_size(self.circle_size)
    }
}

/// Linear interpolation over the 0-5-10 difficulty scale. `max` is the
/// value at 10, `mid` at 5 and `min` at 0.
pub fn difficulty_range(value: f64, max: f64, mid: f64, min: f64) -> f64 {
    if value > 5.0 {
        mid + (max - mid) * (value - 5.0) / 5.0
    } else if value < 5.0 {
        mid - (mid - min) * (5.0 - value) / 5.0
    } else {
        mid
    }
}

fn clamp_setting(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 10.0)
    } else {
        fallback
    }
}

/// How long before its start time an object becomes visible.
pub fn lead_time_from_approach_rate(approach_rate: f64) -> f64 {
    let ar = clamp_setting(approach_rate, DEFAULT_APPROACH_RATE);

    if ar < 5.0 {
        1200.0 + 120.0 * (5.0 - ar)
    } else {
        1200.0 - 150.0 * (ar - 5.0)
    }
}

pub fn circle_radius_from_circle_size(circle_size: f64) -> f64 {
    let cs = clamp_setting(circle_size, DEFAULT_CIRCLE_SIZE);
    54.4 - 4.48 * cs
}

/// Half-widths of the timing windows, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitWindows {
    pub great: f64,
    pub ok: f64,
    pub meh: f64,
}

impl HitWindows {
    pub fn from_overall_difficulty(overall_difficulty: f64) -> Self {
        let od = clamp_setting(overall_difficulty, DEFAULT_OVERALL_DIFFICULTY);

        Self {
            great: difficulty_range(od, 20.0, 50.0, 80.0),
            ok: difficulty_range(od, 60.0, 100.0, 140.0),
            meh: difficulty_range(od, 100.0, 150.0, 200.0),
        }
    }

    /// Latest a circle can still be hit after its start time.
    pub fn judgement_window(&self) -> f64 {
        self.meh
    }
}
