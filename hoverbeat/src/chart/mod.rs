/*!
 * Chart model.
 *
 * A chart is parsed once, has all derived data (slider paths, durations,
 * nested events, stacking, lead times) computed in a single post-pass and is
 * never restructured afterwards. Judgement state lives in the game module.
 */
use hoverbeat_geometry::{CurveType, Point, SliderPath};

use self::{difficulty::Difficulty, timing::TimingModel};

pub mod difficulty;
pub mod nested;
pub mod parse;
pub mod runtime;
pub mod stacking;
pub mod timing;

pub use parse::{parse_chart, parse_chart_file, ParseWarning, ParseWarningKind, ParsedChart};
pub use runtime::SpawnInstruction;

/// Rotation a spinner asks for per second of its duration.
pub const SPINNER_DEGREES_PER_SECOND: f64 = 360.0;

pub const DEFAULT_STACK_LENIENCY: f64 = 0.7;

pub const DEFAULT_COMBO_COLOURS: [ComboColour; 4] = [
    ComboColour::new(255, 192, 0),
    ComboColour::new(0, 202, 0),
    ComboColour::new(18, 124, 255),
    ComboColour::new(242, 24, 57),
];

/// `[General]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct General {
    pub audio_filename: String,
    /// Silence before the audio starts, in milliseconds.
    pub audio_lead_in: f64,
    pub preview_time: f64,
    pub stack_leniency: f64,
    pub mode: u32,
}

impl Default for General {
    fn default() -> Self {
        Self {
            audio_filename: String::new(),
            audio_lead_in: 0.0,
            preview_time: -1.0,
            stack_leniency: DEFAULT_STACK_LENIENCY,
            mode: 0,
        }
    }
}

/// `[Metadata]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub title_unicode: String,
    pub artist: String,
    pub artist_unicode: String,
    pub creator: String,
    pub version: String,
    pub source: String,
    pub tags: Vec<String>,
    pub beatmap_id: Option<i64>,
    pub beatmap_set_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakPeriod {
    pub start_time: f64,
    pub end_time: f64,
}

impl BreakPeriod {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }
}

/// The parts of `[Events]` that matter outside of storyboards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Events {
    pub background: Option<String>,
    pub breaks: Vec<BreakPeriod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComboColour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ComboColour {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Index of a hit object in [`Chart::hit_objects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestedEventKind {
    Tick,
    Repeat,
    Tail,
}

/// A judgement checkpoint along a slider's body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestedEvent {
    pub time: f64,
    pub kind: NestedEventKind,
    pub span_index: u32,
    /// Absolute playfield position of the slider ball at `time`.
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub curve_type: CurveType,
    /// Relative to the slider's anchor; the first point is the anchor itself.
    pub control_points: Vec<Point>,
    /// Number of spans, at least one.
    pub repeat_count: u32,
    /// Declared length; non-positive means the natural path length.
    pub pixel_length: f64,
    pub path: SliderPath,
    pub duration: f64,
    pub nested_events: Vec<NestedEvent>,
}

impl Slider {
    pub fn span_duration(&self) -> f64 {
        self.duration / self.repeat_count.max(1) as f64
    }

    /// Position relative to the anchor, `elapsed` milliseconds after the
    /// slider's start. Clamped to the slider's duration.
    pub fn relative_position_at(&self, elapsed: f64) -> Point {
        let span_duration = self.span_duration();
        if span_duration <= 0.0 || elapsed <= 0.0 {
            return self.path.start_position();
        }

        let spans = self.repeat_count.max(1);
        let elapsed = elapsed.min(self.duration);
        let span_index = ((elapsed / span_duration).floor() as u32).min(spans - 1);
        let progress = (elapsed - span_index as f64 * span_duration) / span_duration;

        self.path.position_at_span_progress(span_index, progress)
    }

    /// Relative position where the last span ends.
    pub fn relative_end_position(&self) -> Point {
        self.path
            .position_at_span_progress(self.repeat_count.max(1) - 1, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spinner {
    pub end_time: f64,
    pub required_rotation_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitObjectKind {
    Circle,
    Slider(Slider),
    Spinner(Spinner),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitObject {
    pub start_time: f64,
    pub position: Point,
    /// `position` shifted by the stacking post-pass.
    pub stacked_position: Point,
    pub stack_height: i32,
    /// Whether this object actually starts a combo, not just the raw flag.
    pub new_combo: bool,
    pub combo_offset: u32,
    pub combo_index: usize,
    pub index_in_combo: usize,
    pub approach_lead_time_ms: f64,
    pub hit_sound: u8,
    pub kind: HitObjectKind,
}

impl HitObject {
    pub fn end_time(&self) -> f64 {
        match &self.kind {
            HitObjectKind::Circle => self.start_time,
            HitObjectKind::Slider(slider) => self.start_time + slider.duration,
            HitObjectKind::Spinner(spinner) => spinner.end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time
    }

    pub fn spawn_time(&self) -> f64 {
        self.start_time - self.approach_lead_time_ms
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.kind, HitObjectKind::Circle)
    }

    pub fn is_slider(&self) -> bool {
        matches!(self.kind, HitObjectKind::Slider(_))
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner(_))
    }

    pub fn as_slider(&self) -> Option<&Slider> {
        match &self.kind {
            HitObjectKind::Slider(slider) => Some(slider),
            _ => None,
        }
    }

    pub fn as_spinner(&self) -> Option<&Spinner> {
        match &self.kind {
            HitObjectKind::Spinner(spinner) => Some(spinner),
            _ => None,
        }
    }

    /// Where the object's hit target is at `time`. Sliders follow their
    /// path, everything else stays put.
    pub fn position_at(&self, time: f64) -> Point {
        match &self.kind {
            HitObjectKind::Slider(slider) => {
                self.stacked_position + slider.relative_position_at(time - self.start_time)
            }
            _ => self.stacked_position,
        }
    }

    pub fn end_position(&self) -> Point {
        match &self.kind {
            HitObjectKind::Slider(slider) => self.stacked_position + slider.relative_end_position(),
            _ => self.stacked_position,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub format_version: Option<u32>,
    pub general: General,
    pub metadata: Metadata,
    pub difficulty: Difficulty,
    pub events: Events,
    pub timing: TimingModel,
    pub combo_colours: Vec<ComboColour>,
    /// Ordered by start time.
    pub hit_objects: Vec<HitObject>,
}

const FALLBACK_CHART: &str = "osu file format v14

[General]
AudioFilename: none
StackLeniency: 0.7

[Metadata]
Title:Fallback
Artist:hoverbeat
Creator:hoverbeat
Version:Fallback

[Difficulty]
HPDrainRate:5
CircleSize:4
OverallDifficulty:5
ApproachRate:5
SliderMultiplier:1.4
SliderTickRate:1

[TimingPoints]
0,500,4,2,0,100,1,0

[HitObjects]
256,192,1000,5,0,0:0:0:0:
128,192,2000,2,0,P|256:96|384:192,2,200
256,192,4500,12,0,6500,0:0:0:0:
";

impl Chart {
    /// Synthetic chart used when the requested chart cannot be loaded.
    pub fn fallback() -> Self {
        parse_chart(FALLBACK_CHART).chart
    }

    pub fn hit_object(&self, id: ObjectId) -> Option<&HitObject> {
        self.hit_objects.get(id.0)
    }

    /// `None` only for a chart built without the load post-pass.
    pub fn combo_colour(&self, object: &HitObject) -> Option<ComboColour> {
        object
            .combo_index
            .checked_rem(self.combo_colours.len())
            .map(|i| self.combo_colours[i])
    }

    /// End of the last object, or 0 for an empty chart.
    pub fn end_time(&self) -> f64 {
        self.hit_objects
            .iter()
            .map(HitObject::end_time)
            .fold(0.0, f64::max)
    }

    pub fn is_break_at(&self, time: f64) -> bool {
        self.events.breaks.iter().any(|b| b.contains(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chart_has_every_kind() {
        let chart = Chart::fallback();

        assert_eq!(chart.hit_objects.len(), 3);
        assert!(chart.hit_objects[0].is_circle());
        assert!(chart.hit_objects[1].is_slider());
        assert!(chart.hit_objects[2].is_spinner());
        assert_eq!(chart.end_time(), 6500.0);
    }

    #[test]
    fn slider_position_follows_spans() {
        let chart = parse_chart("[HitObjects]\n0,0,0,2,0,L|100:0,2,100\n").chart;
        let object = &chart.hit_objects[0];
        let duration = object.duration();

        assert_eq!(object.position_at(-100.0), Point::new(0.0, 0.0));
        assert!((object.position_at(duration * 0.25) - Point::new(50.0, 0.0)).norm() < 1e-6);
        assert!((object.position_at(duration * 0.5) - Point::new(100.0, 0.0)).norm() < 1e-6);
        assert!((object.position_at(duration * 0.75) - Point::new(50.0, 0.0)).norm() < 1e-6);
        assert!((object.end_position() - Point::new(0.0, 0.0)).norm() < 1e-6);
        assert_eq!(object.position_at(duration + 500.0), object.end_position());
    }

    #[test]
    fn combo_colours_cycle() {
        let chart = parse_chart(
            "[Colours]\nCombo1: 10,20,30\nCombo2: 40,50,60\n\n[HitObjects]\n0,0,0,1,0\n0,0,100,5,0\n0,0,200,5,0\n",
        )
        .chart;

        let colours = chart
            .hit_objects
            .iter()
            .map(|object| chart.combo_colour(object))
            .collect::<Vec<_>>();
        assert_eq!(
            colours,
            vec![
                Some(ComboColour::new(10, 20, 30)),
                Some(ComboColour::new(40, 50, 60)),
                Some(ComboColour::new(10, 20, 30)),
            ]
        );
    }

    #[test]
    fn default_palette_when_none_is_declared() {
        let chart = parse_chart("[HitObjects]\n0,0,0,1,0\n0,0,100,5,0\n").chart;

        assert_eq!(chart.combo_colours, DEFAULT_COMBO_COLOURS.to_vec());
        assert_eq!(chart.combo_colour(&chart.hit_objects[1]), Some(DEFAULT_COMBO_COLOURS[1]));
    }

    #[test]
    fn breaks_are_looked_up_by_time() {
        let chart = parse_chart("[Events]\n2,10000,15000\n\n[HitObjects]\n0,0,0,1,0\n").chart;

        assert!(chart.is_break_at(12000.0));
        assert!(!chart.is_break_at(9000.0));
        assert!(!chart.is_break_at(16000.0));
    }
}
