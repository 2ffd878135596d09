use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use hoverbeat_geometry::{CurveType, Point};

use super::{
    difficulty::Difficulty,
    timing::{DifficultyPoint, TimingPoint},
    BreakPeriod, Chart, ComboColour, Events, General, Metadata,
};

const COMMENT_STR: &str = "//";
const FORMAT_HEADER: &str = "osu file format v";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Sliders with absurd repeat counts are capped.
const MAX_REPEAT_COUNT: u32 = 9000;

const TYPE_CIRCLE: u32 = 1;
const TYPE_SLIDER: u32 = 1 << 1;
const TYPE_NEW_COMBO: u32 = 1 << 2;
const TYPE_SPINNER: u32 = 1 << 3;
const TYPE_COMBO_OFFSET_MASK: u32 = 0b111 << 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    General,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    Colours,
    HitObjects,
    /// Recognized but irrelevant here, skipped silently.
    Editor,
}

impl TryFrom<&str> for Section {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "General" => Ok(Section::General),
            "Metadata" => Ok(Section::Metadata),
            "Difficulty" => Ok(Section::Difficulty),
            "Events" => Ok(Section::Events),
            "TimingPoints" => Ok(Section::TimingPoints),
            "Colours" => Ok(Section::Colours),
            "HitObjects" => Ok(Section::HitObjects),
            "Editor" => Ok(Section::Editor),
            _ => Err(anyhow!("Invalid string for Section conversion: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarningKind {
    UnknownSection(String),
    MalformedLine(String),
    InvalidValue { key: String, value: String },
    UnknownObjectType(u32),
    UnknownCurveType(String),
    InvalidControlPoint(String),
    SpinnerEndsBeforeStart { start_time: f64, end_time: f64 },
}

impl fmt::Display for ParseWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarningKind::UnknownSection(name) => write!(f, "unknown section [{name}]"),
            ParseWarningKind::MalformedLine(reason) => write!(f, "malformed line: {reason}"),
            ParseWarningKind::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
            ParseWarningKind::UnknownObjectType(bits) => {
                write!(f, "unknown hit object type {bits:#b}")
            }
            ParseWarningKind::UnknownCurveType(token) => {
                write!(f, "unknown curve type `{token}`, using bezier")
            }
            ParseWarningKind::InvalidControlPoint(token) => {
                write!(f, "invalid control point `{token}`")
            }
            ParseWarningKind::SpinnerEndsBeforeStart {
                start_time,
                end_time,
            } => write!(f, "spinner ends at {end_time} before it starts at {start_time}"),
        }
    }
}

/// A recoverable problem in the chart text. Parsing carries on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// 1-based.
    pub line: usize,
    pub kind: ParseWarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChart {
    pub chart: Chart,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawHitObjectKind {
    Circle,
    Slider {
        curve_type: CurveType,
        control_points: Vec<Point>,
        repeat_count: u32,
        pixel_length: f64,
    },
    Spinner {
        end_time: f64,
    },
}

/// A hit object as written in the file, before any derived data.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawHitObject {
    pub line: usize,
    pub position: Point,
    pub start_time: f64,
    pub new_combo: bool,
    pub combo_offset: u32,
    pub hit_sound: u8,
    pub kind: RawHitObjectKind,
}

/// Everything read from the chart text. Turned into a [`Chart`] by
/// `ChartInfo::create_chart`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ChartInfo {
    pub format_version: Option<u32>,
    pub general: General,
    pub metadata: Metadata,
    pub difficulty: Difficulty,
    pub events: Events,
    pub timing_points: Vec<TimingPoint>,
    /// Every uninherited point resets the speed multiplier to 1.0. Kept apart
    /// so an explicit speed point at the same time takes precedence.
    pub speed_resets: Vec<DifficultyPoint>,
    pub difficulty_points: Vec<DifficultyPoint>,
    pub combo_colours: Vec<(u32, ComboColour)>,
    pub hit_objects: Vec<RawHitObject>,
    pub warnings: Vec<ParseWarning>,
}

impl ChartInfo {
    pub(crate) fn warn(&mut self, line: usize, kind: ParseWarningKind) {
        let warning = ParseWarning { line, kind };
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_field<T: FromStr>(s: &str) -> Option<T> {
    s.trim().parse().ok()
}

fn parse_section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

struct ChartParser {
    info: ChartInfo,
    section: Option<Section>,
    seen_content: bool,
}

impl ChartParser {
    fn new() -> Self {
        Self {
            info: ChartInfo::default(),
            section: None,
            seen_content: false,
        }
    }

    fn parse_line(&mut self, line_number: usize, raw: &str) {
        let line = raw.trim_start_matches(BYTE_ORDER_MARK).trim();
        if line.is_empty() || line.starts_with(COMMENT_STR) {
            return;
        }

        if !self.seen_content {
            self.seen_content = true;
            if let Some(version) = line.strip_prefix(FORMAT_HEADER) {
                self.info.format_version = parse_field(version);
                return;
            }
        }

        if let Some(name) = parse_section_header(line) {
            self.section = match Section::try_from(name) {
                Ok(section) => Some(section),
                Err(_) => {
                    self.info
                        .warn(line_number, ParseWarningKind::UnknownSection(name.to_owned()));
                    None
                }
            };
            return;
        }

        // Lines outside of a known section are dropped.
        let Some(section) = self.section else {
            return;
        };

        match section {
            Section::General => self.parse_key_value(line_number, line, Self::parse_general),
            Section::Metadata => self.parse_key_value(line_number, line, Self::parse_metadata),
            Section::Difficulty => self.parse_key_value(line_number, line, Self::parse_difficulty),
            Section::Colours => self.parse_key_value(line_number, line, Self::parse_colour),
            Section::Events => self.parse_event(line_number, line),
            Section::TimingPoints => self.parse_timing_point(line_number, line),
            Section::HitObjects => self.parse_hit_object(line_number, line),
            Section::Editor => {}
        }
    }

    fn parse_key_value(
        &mut self,
        line_number: usize,
        line: &str,
        handler: fn(&mut Self, usize, &str, &str),
    ) {
        match line.split_once(':') {
            Some((key, value)) => handler(self, line_number, key.trim(), value.trim()),
            None => self.info.warn(
                line_number,
                ParseWarningKind::MalformedLine(format!("expected `key: value`, got `{line}`")),
            ),
        }
    }

    fn invalid_value(&mut self, line_number: usize, key: &str, value: &str) {
        self.info.warn(
            line_number,
            ParseWarningKind::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            },
        );
    }

    fn read_number<T: FromStr>(&mut self, line_number: usize, key: &str, value: &str, target: &mut T) {
        match parse_field(value) {
            Some(v) => *target = v,
            None => self.invalid_value(line_number, key, value),
        }
    }

    fn read_finite(&mut self, line_number: usize, key: &str, value: &str) -> Option<f64> {
        let parsed = parse_finite(value);
        if parsed.is_none() {
            self.invalid_value(line_number, key, value);
        }
        parsed
    }

    fn parse_general(&mut self, line_number: usize, key: &str, value: &str) {
        match key {
            "AudioFilename" => self.info.general.audio_filename = value.to_owned(),
            "AudioLeadIn" => {
                if let Some(v) = self.read_finite(line_number, key, value) {
                    self.info.general.audio_lead_in = v;
                }
            }
            "PreviewTime" => {
                if let Some(v) = self.read_finite(line_number, key, value) {
                    self.info.general.preview_time = v;
                }
            }
            "StackLeniency" => {
                if let Some(v) = self.read_finite(line_number, key, value) {
                    self.info.general.stack_leniency = v;
                }
            }
            "Mode" => {
                let mut mode = self.info.general.mode;
                self.read_number(line_number, key, value, &mut mode);
                self.info.general.mode = mode;
            }
            _ => {}
        }
    }

    fn parse_metadata(&mut self, line_number: usize, key: &str, value: &str) {
        let metadata = &mut self.info.metadata;
        match key {
            "Title" => metadata.title = value.to_owned(),
            "TitleUnicode" => metadata.title_unicode = value.to_owned(),
            "Artist" => metadata.artist = value.to_owned(),
            "ArtistUnicode" => metadata.artist_unicode = value.to_owned(),
            "Creator" => metadata.creator = value.to_owned(),
            "Version" => metadata.version = value.to_owned(),
            "Source" => metadata.source = value.to_owned(),
            "Tags" => metadata.tags = value.split_whitespace().map(str::to_owned).collect(),
            "BeatmapID" => match parse_field(value) {
                Some(id) => self.info.metadata.beatmap_id = Some(id),
                None => self.invalid_value(line_number, key, value),
            },
            "BeatmapSetID" => match parse_field(value) {
                Some(id) => self.info.metadata.beatmap_set_id = Some(id),
                None => self.invalid_value(line_number, key, value),
            },
            _ => {}
        }
    }

    fn parse_difficulty(&mut self, line_number: usize, key: &str, value: &str) {
        let target = match key {
            "HPDrainRate" => &mut self.info.difficulty.hp_drain_rate,
            "CircleSize" => &mut self.info.difficulty.circle_size,
            "OverallDifficulty" => &mut self.info.difficulty.overall_difficulty,
            "ApproachRate" => &mut self.info.difficulty.approach_rate,
            "SliderMultiplier" => &mut self.info.difficulty.slider_multiplier,
            "SliderTickRate" => &mut self.info.difficulty.slider_tick_rate,
            _ => return,
        };

        match parse_finite(value) {
            Some(v) => *target = v,
            None => self.invalid_value(line_number, key, value),
        }
    }

    fn parse_colour(&mut self, line_number: usize, key: &str, value: &str) {
        let Some(index) = key.strip_prefix("Combo") else {
            return;
        };
        let Some(index) = parse_field::<u32>(index) else {
            return self.invalid_value(line_number, key, value);
        };

        let channels = value
            .split(',')
            .map(parse_field::<u8>)
            .collect::<Option<Vec<_>>>();
        match channels.as_deref() {
            Some([r, g, b, ..]) => self
                .info
                .combo_colours
                .push((index, ComboColour::new(*r, *g, *b))),
            _ => self.invalid_value(line_number, key, value),
        }
    }

    fn parse_event(&mut self, line_number: usize, line: &str) {
        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();

        match fields[0] {
            "0" | "Background" if fields.len() >= 3 => {
                self.info.events.background = Some(fields[2].trim_matches('"').to_owned());
            }
            "2" | "Break" => {
                let period = fields
                    .get(1)
                    .zip(fields.get(2))
                    .and_then(|(start, end)| Some((parse_finite(start)?, parse_finite(end)?)));
                match period {
                    Some((start_time, end_time)) if end_time >= start_time => {
                        self.info.events.breaks.push(BreakPeriod {
                            start_time,
                            end_time,
                        })
                    }
                    _ => self.info.warn(
                        line_number,
                        ParseWarningKind::MalformedLine(format!("invalid break `{line}`")),
                    ),
                }
            }
            // Videos, sprites and storyboard commands.
            _ => {}
        }
    }

    fn parse_timing_point(&mut self, line_number: usize, line: &str) {
        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();

        let (Some(time), Some(ms_per_beat)) = (
            fields.first().and_then(|s| parse_finite(s)),
            fields.get(1).and_then(|s| parse_finite(s)),
        ) else {
            return self.info.warn(
                line_number,
                ParseWarningKind::MalformedLine(format!("invalid timing point `{line}`")),
            );
        };

        let time_signature = fields
            .get(2)
            .and_then(|s| parse_field::<u32>(s))
            .filter(|&beats| beats > 0)
            .unwrap_or(4);
        let uninherited = fields.get(6).map_or(true, |s| *s != "0");
        let kiai = fields
            .get(7)
            .and_then(|s| parse_field::<u32>(s))
            .map_or(false, |effects| effects & 1 != 0);

        if uninherited && ms_per_beat > 0.0 {
            self.info.timing_points.push(TimingPoint {
                time,
                ms_per_beat,
                time_signature,
                kiai,
            });
            self.info.speed_resets.push(DifficultyPoint {
                time,
                speed_multiplier: 1.0,
                kiai,
            });
        } else if !uninherited || ms_per_beat < 0.0 {
            self.info
                .difficulty_points
                .push(DifficultyPoint::from_inherited_beat_length(time, ms_per_beat, kiai));
        } else {
            self.invalid_value(line_number, "beat length", fields[1]);
        }
    }

    fn parse_hit_object(&mut self, line_number: usize, line: &str) {
        match self.read_hit_object(line_number, line) {
            Ok(object) => self.info.hit_objects.push(object),
            Err(kind) => self.info.warn(line_number, kind),
        }
    }

    /// Hard failures drop the whole object; soft problems are recorded and
    /// the object is kept.
    fn read_hit_object(
        &mut self,
        line_number: usize,
        line: &str,
    ) -> std::result::Result<RawHitObject, ParseWarningKind> {
        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
        if fields.len() < 4 {
            return Err(ParseWarningKind::MalformedLine(format!(
                "expected at least 4 hit object fields, got {}",
                fields.len()
            )));
        }

        let (Some(x), Some(y), Some(start_time), Some(type_bits)) = (
            parse_finite(fields[0]),
            parse_finite(fields[1]),
            parse_finite(fields[2]),
            parse_field::<u32>(fields[3]),
        ) else {
            return Err(ParseWarningKind::MalformedLine(format!(
                "invalid hit object `{line}`"
            )));
        };

        let position = Point::new(x, y);
        let hit_sound = fields.get(4).and_then(|s| parse_field(s)).unwrap_or(0);

        let kind = if type_bits & TYPE_CIRCLE != 0 {
            RawHitObjectKind::Circle
        } else if type_bits & TYPE_SLIDER != 0 {
            self.read_slider(line_number, &fields, position)?
        } else if type_bits & TYPE_SPINNER != 0 {
            let end_time = fields
                .get(5)
                .and_then(|s| parse_finite(s))
                .ok_or_else(|| ParseWarningKind::MalformedLine("spinner without end time".to_owned()))?;
            RawHitObjectKind::Spinner { end_time }
        } else {
            return Err(ParseWarningKind::UnknownObjectType(type_bits));
        };

        Ok(RawHitObject {
            line: line_number,
            position,
            start_time,
            new_combo: type_bits & TYPE_NEW_COMBO != 0,
            combo_offset: (type_bits & TYPE_COMBO_OFFSET_MASK) >> 4,
            hit_sound,
            kind,
        })
    }

    fn read_slider(
        &mut self,
        line_number: usize,
        fields: &[&str],
        position: Point,
    ) -> std::result::Result<RawHitObjectKind, ParseWarningKind> {
        let Some(curve) = fields.get(5) else {
            return Err(ParseWarningKind::MalformedLine("slider without curve".to_owned()));
        };

        let mut tokens = curve.split('|');
        let curve_token = tokens.next().unwrap_or_default().trim();
        let curve_type = CurveType::try_from(curve_token).unwrap_or_else(|_| {
            self.info.warn(
                line_number,
                ParseWarningKind::UnknownCurveType(curve_token.to_owned()),
            );
            CurveType::Bezier
        });

        let mut control_points = vec![Point::zeros()];
        for token in tokens {
            let point = token
                .split_once(':')
                .and_then(|(px, py)| Some(Point::new(parse_finite(px)?, parse_finite(py)?)));
            match point {
                Some(point) => control_points.push(point - position),
                None => self.info.warn(
                    line_number,
                    ParseWarningKind::InvalidControlPoint(token.to_owned()),
                ),
            }
        }

        let repeat_count = match fields.get(6) {
            None => 1,
            Some(s) => match parse_field::<u32>(s) {
                Some(n) => n.clamp(1, MAX_REPEAT_COUNT),
                None => {
                    self.invalid_value(line_number, "slider repeats", s);
                    1
                }
            },
        };

        let pixel_length = match fields.get(7) {
            None => 0.0,
            Some(s) => parse_finite(s).unwrap_or_else(|| {
                self.invalid_value(line_number, "slider length", s);
                0.0
            }),
        };

        Ok(RawHitObjectKind::Slider {
            curve_type,
            control_points,
            repeat_count,
            pixel_length,
        })
    }
}

pub(crate) fn parse_chart_info(text: &str) -> ChartInfo {
    let parser = text
        .lines()
        .enumerate()
        .fold(ChartParser::new(), |mut parser, (i, line)| {
            parser.parse_line(i + 1, line);
            parser
        });

    parser.info
}

/// Never fails; anything unusable is skipped and reported as a warning.
pub fn parse_chart(text: &str) -> ParsedChart {
    parse_chart_info(text).create_chart()
}

/// Fails only when the file cannot be read. Invalid UTF-8 is replaced.
pub fn parse_chart_file<P: AsRef<Path>>(path: P) -> Result<ParsedChart> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read chart {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    log::info!("Parsing chart {}", path.display());
    Ok(parse_chart(&text))
}
