/*!
 * Timing ("red line") and speed ("green line") control points.
 */

/// 120 BPM, used when a chart declares no timing points at all.
pub const DEFAULT_MS_PER_BEAT: f64 = 500.0;

pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;
pub const MAX_SPEED_MULTIPLIER: f64 = 10.0;

/// Defines the beat length from `time` onward until superseded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingPoint {
    pub time: f64,
    pub ms_per_beat: f64,
    /// Beats per measure.
    pub time_signature: u32,
    /// Presentation only.
    pub kiai: bool,
}

impl TimingPoint {
    pub fn bpm(&self) -> f64 {
        60_000.0 / self.ms_per_beat
    }
}

impl Default for TimingPoint {
    fn default() -> Self {
        Self {
            time: 0.0,
            ms_per_beat: DEFAULT_MS_PER_BEAT,
            time_signature: 4,
            kiai: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyPoint {
    pub time: f64,
    pub speed_multiplier: f64,
    pub kiai: bool,
}

impl DifficultyPoint {
    /// Inherited points encode their multiplier as a negative percentage,
    /// -50 being twice as fast.
    pub fn from_inherited_beat_length(time: f64, ms_per_beat: f64, kiai: bool) -> Self {
        let speed_multiplier = if ms_per_beat < 0.0 {
            (100.0 / -ms_per_beat).clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
        } else {
            1.0
        };

        Self {
            time,
            speed_multiplier,
            kiai,
        }
    }
}

/// Both point lists, each ordered by time. Points sharing a time keep their
/// declaration order, so the later one wins lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingModel {
    timing_points: Vec<TimingPoint>,
    difficulty_points: Vec<DifficultyPoint>,
}

impl TimingModel {
    pub fn new(
        mut timing_points: Vec<TimingPoint>,
        mut difficulty_points: Vec<DifficultyPoint>,
    ) -> Self {
        timing_points.sort_by(|a, b| a.time.total_cmp(&b.time));
        difficulty_points.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            timing_points,
            difficulty_points,
        }
    }

    pub fn add_timing_point(&mut self, point: TimingPoint) {
        let i = self.timing_points.partition_point(|p| p.time <= point.time);
        self.timing_points.insert(i, point);
    }

    pub fn add_difficulty_point(&mut self, point: DifficultyPoint) {
        let i = self
            .difficulty_points
            .partition_point(|p| p.time <= point.time);
        self.difficulty_points.insert(i, point);
    }

    pub fn timing_points(&self) -> &[TimingPoint] {
        &self.timing_points
    }

    pub fn difficulty_points(&self) -> &[DifficultyPoint] {
        &self.difficulty_points
    }

    /// The last timing point at or before `time`. Times before the first
    /// point resolve to the first point, an empty list to 120 BPM.
    pub fn timing_point_at(&self, time: f64) -> TimingPoint {
        let i = self.timing_points.partition_point(|p| p.time <= time);

        match i.checked_sub(1) {
            Some(i) => self.timing_points[i],
            None => self.timing_points.first().copied().unwrap_or_default(),
        }
    }

    pub fn ms_per_beat_at(&self, time: f64) -> f64 {
        self.timing_point_at(time).ms_per_beat
    }

    /// 1.0 before the first speed point.
    pub fn speed_multiplier_at(&self, time: f64) -> f64 {
        let i = self.difficulty_points.partition_point(|p| p.time <= time);

        i.checked_sub(1)
            .map_or(1.0, |i| self.difficulty_points[i].speed_multiplier)
    }

    pub fn is_kiai_at(&self, time: f64) -> bool {
        let timing = self
            .timing_points
            .partition_point(|p| p.time <= time)
            .checked_sub(1)
            .map(|i| (self.timing_points[i].time, self.timing_points[i].kiai));
        let difficulty = self
            .difficulty_points
            .partition_point(|p| p.time <= time)
            .checked_sub(1)
            .map(|i| (self.difficulty_points[i].time, self.difficulty_points[i].kiai));

        // Whichever point was declared most recently carries the flag.
        match (timing, difficulty) {
            (Some(t), Some(d)) => {
                if d.0 >= t.0 {
                    d.1
                } else {
                    t.1
                }
            }
            (Some((_, kiai)), None) | (None, Some((_, kiai))) => kiai,
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(time: f64, ms_per_beat: f64) -> TimingPoint {
        TimingPoint {
            time,
            ms_per_beat,
            ..Default::default()
        }
    }

    fn model() -> TimingModel {
        TimingModel::new(
            vec![timing(3000.0, 250.0), timing(1000.0, 500.0)],
            vec![
                DifficultyPoint::from_inherited_beat_length(2000.0, -50.0, false),
                DifficultyPoint::from_inherited_beat_length(4000.0, -200.0, true),
            ],
        )
    }

    #[test]
    fn timing_point_lookup() {
        let model = model();

        assert_eq!(model.timing_point_at(1000.0).ms_per_beat, 500.0);
        assert_eq!(model.timing_point_at(2999.0).ms_per_beat, 500.0);
        assert_eq!(model.timing_point_at(3000.0).ms_per_beat, 250.0);
        assert_eq!(model.timing_point_at(1e9).ms_per_beat, 250.0);
    }

    #[test]
    fn before_first_point_resolves_to_first_point() {
        let model = model();
        assert_eq!(model.timing_point_at(-5000.0), timing(1000.0, 500.0));
    }

    #[test]
    fn empty_model_uses_defaults() {
        let model = TimingModel::default();

        assert_eq!(model.ms_per_beat_at(0.0), DEFAULT_MS_PER_BEAT);
        assert_eq!(model.timing_point_at(0.0).bpm(), 120.0);
        assert_eq!(model.speed_multiplier_at(1234.0), 1.0);
        assert!(!model.is_kiai_at(0.0));
    }

    #[test]
    fn speed_multiplier_lookup() {
        let model = model();

        assert_eq!(model.speed_multiplier_at(0.0), 1.0);
        assert_eq!(model.speed_multiplier_at(2000.0), 2.0);
        assert_eq!(model.speed_multiplier_at(3999.0), 2.0);
        assert_eq!(model.speed_multiplier_at(4000.0), 0.5);
    }

    #[test]
    fn speed_multiplier_is_clamped() {
        assert_eq!(
            DifficultyPoint::from_inherited_beat_length(0.0, -1.0, false).speed_multiplier,
            MAX_SPEED_MULTIPLIER
        );
        assert_eq!(
            DifficultyPoint::from_inherited_beat_length(0.0, -100_000.0, false).speed_multiplier,
            MIN_SPEED_MULTIPLIER
        );
    }

    #[test]
    fn later_declaration_wins_on_equal_time() {
        let mut model = TimingModel::default();
        model.add_timing_point(timing(0.0, 400.0));
        model.add_timing_point(timing(0.0, 300.0));

        assert_eq!(model.ms_per_beat_at(0.0), 300.0);
    }

    #[test]
    fn added_speed_points_keep_time_order() {
        let mut model = model();
        model.add_difficulty_point(DifficultyPoint::from_inherited_beat_length(3000.0, -25.0, false));

        let times = model.difficulty_points().iter().map(|p| p.time).collect::<Vec<_>>();
        assert_eq!(times, vec![2000.0, 3000.0, 4000.0]);
        assert_eq!(model.speed_multiplier_at(2999.0), 2.0);
        assert_eq!(model.speed_multiplier_at(3000.0), 4.0);
    }

    #[test]
    fn kiai_follows_latest_point() {
        let model = model();

        assert!(!model.is_kiai_at(3500.0));
        assert!(model.is_kiai_at(4500.0));
    }
}
