/*!
 * Length indexed slider paths.
 */
use crate::{
    curve::{approximate, CurveType},
    Point, LENGTH_EPSILON,
};

/// Clips `polyline` so its length equals `target_length`.
///
/// Zero-length segments are dropped. A path that is shorter than the target
/// has its final segment extended along its direction. A non-positive or
/// non-finite target keeps the natural length.
pub fn trim_to_length(polyline: &[Point], target_length: f64) -> Vec<Point> {
    let mut trimmed = Vec::with_capacity(polyline.len());
    let Some(first) = polyline.first() else {
        return trimmed;
    };
    trimmed.push(*first);

    let has_target = target_length.is_finite() && target_length > 0.0;
    let mut length = 0.0;

    for point in &polyline[1..] {
        let Some(last) = trimmed.last().copied() else {
            break;
        };
        let segment = point - last;
        let segment_length = segment.norm();
        if segment_length <= LENGTH_EPSILON {
            continue;
        }

        if has_target && length + segment_length >= target_length {
            let remaining = target_length - length;
            trimmed.push(last + segment * (remaining / segment_length));
            return trimmed;
        }

        length += segment_length;
        trimmed.push(*point);
    }

    if has_target && trimmed.len() > 1 && length < target_length {
        let end = trimmed.len() - 1;
        let segment = trimmed[end] - trimmed[end - 1];
        let segment_length = segment.norm();
        let extended = segment_length + (target_length - length);
        trimmed[end] = trimmed[end - 1] + segment * (extended / segment_length);
    }

    trimmed
}

/// `table[i]` is the path length from point 0 to point `i`.
pub fn build_cumulative_lengths(polyline: &[Point]) -> Vec<f64> {
    let mut table = Vec::with_capacity(polyline.len());
    let mut length = 0.0;

    if !polyline.is_empty() {
        table.push(0.0);
    }

    for w in polyline.windows(2) {
        length += (w[1] - w[0]).norm();
        table.push(length);
    }

    table
}

/// A trimmed polyline together with its cumulative length table.
///
/// Points are relative to the slider's anchor, so the first point is the
/// first control point (normally the origin).
#[derive(Debug, Clone, PartialEq)]
pub struct SliderPath {
    points: Vec<Point>,
    cumulative_lengths: Vec<f64>,
}

impl SliderPath {
    pub fn new(curve_type: CurveType, control_points: &[Point], expected_length: f64) -> Self {
        let polyline = approximate(curve_type, control_points);
        Self::from_polyline(&polyline, expected_length)
    }

    pub fn from_polyline(polyline: &[Point], expected_length: f64) -> Self {
        let mut points = trim_to_length(polyline, expected_length);
        if points.is_empty() {
            points.push(Point::zeros());
        }
        let cumulative_lengths = build_cumulative_lengths(&points);

        Self {
            points,
            cumulative_lengths,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn cumulative_lengths(&self) -> &[f64] {
        &self.cumulative_lengths
    }

    pub fn length(&self) -> f64 {
        self.cumulative_lengths.last().copied().unwrap_or(0.0)
    }

    pub fn start_position(&self) -> Point {
        self.points[0]
    }

    pub fn end_position(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Position at `progress` of the path length, clamped to the path's ends.
    pub fn position_at_progress(&self, progress: f64) -> Point {
        if progress <= 0.0 || progress.is_nan() {
            return self.start_position();
        }
        if progress >= 1.0 {
            return self.end_position();
        }

        let distance = progress * self.length();
        let index = self
            .cumulative_lengths
            .partition_point(|&length| length < distance);

        self.interpolate(index, distance)
    }

    /// Position within one traversal; odd spans run backwards.
    pub fn position_at_span_progress(&self, span_index: u32, progress: f64) -> Point {
        let progress = progress.clamp(0.0, 1.0);
        if span_index % 2 == 1 {
            self.position_at_progress(1.0 - progress)
        } else {
            self.position_at_progress(progress)
        }
    }

    fn interpolate(&self, index: usize, distance: f64) -> Point {
        if index == 0 {
            return self.start_position();
        }
        if index >= self.points.len() {
            return self.end_position();
        }

        let p0 = self.points[index - 1];
        let p1 = self.points[index];
        let d0 = self.cumulative_lengths[index - 1];
        let d1 = self.cumulative_lengths[index];

        if d1 - d0 <= LENGTH_EPSILON {
            return p0;
        }

        let weight = (distance - d0) / (d1 - d0);
        p0 + (p1 - p0) * weight
    }
}
