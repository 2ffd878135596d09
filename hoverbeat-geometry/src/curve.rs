/*!
 * Curve approximation.
 *
 * Every curve kind is flattened into a polyline that is dense enough for
 * length measurement and position interpolation.
 */
use std::f64::consts::PI;

use anyhow::{anyhow, Result};

use crate::{almost_equal, Point, LENGTH_EPSILON};

/// Maximum second difference allowed for a Bezier control run to be drawn as-is.
pub const BEZIER_TOLERANCE: f64 = 0.25;

/// Maximum distance between the approximated arc and the true circle.
pub const CIRCULAR_ARC_TOLERANCE: f64 = 0.1;

/// Evaluations emitted per Catmull-Rom segment.
pub const CATMULL_DETAIL: usize = 50;

/// Arcs needing more points than this are approximated as Bezier curves.
pub const MAX_CIRCULAR_ARC_POINTS: usize = 1000;

/// Subdivisions allowed for one Bezier run. Pending pieces are emitted as-is
/// once it is reached.
pub const MAX_BEZIER_SUBDIVISIONS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    Linear,
    /// Circular arc through exactly three points.
    Perfect,
    Bezier,
    Catmull,
}

impl TryFrom<&str> for CurveType {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self> {
        match s.trim() {
            "L" => Ok(CurveType::Linear),
            "P" => Ok(CurveType::Perfect),
            "B" => Ok(CurveType::Bezier),
            "C" => Ok(CurveType::Catmull),
            _ => Err(anyhow!("Invalid string for CurveType conversion: {}", s)),
        }
    }
}

/// Flattens `control_points` into a polyline according to `curve_type`.
///
/// The first and last control points are always the first and last output
/// points. Degenerate inputs fall back to simpler approximations instead of
/// failing.
pub fn approximate(curve_type: CurveType, control_points: &[Point]) -> Vec<Point> {
    if control_points.len() < 2 {
        return control_points.to_vec();
    }

    match curve_type {
        CurveType::Linear => control_points.to_vec(),
        CurveType::Perfect => {
            if control_points.len() != 3 {
                return approximate_bezier_segments(control_points);
            }

            approximate_circular_arc(control_points).unwrap_or_else(|| {
                log::debug!("Degenerate circular arc, approximating as Bezier");
                approximate_bezier_segments(control_points)
            })
        }
        CurveType::Bezier => approximate_bezier_segments(control_points),
        CurveType::Catmull => approximate_catmull(control_points),
    }
}

/// Splits the control list at consecutive duplicate points and approximates
/// each run as its own Bezier curve.
fn approximate_bezier_segments(control_points: &[Point]) -> Vec<Point> {
    let mut output = Vec::new();
    let mut segment_start = 0;

    for i in 1..control_points.len() {
        if almost_equal_points(&control_points[i], &control_points[i - 1]) {
            append_without_joint(&mut output, approximate_bezier(&control_points[segment_start..i]));
            segment_start = i;
        }
    }
    append_without_joint(&mut output, approximate_bezier(&control_points[segment_start..]));

    output
}

fn append_without_joint(output: &mut Vec<Point>, segment: Vec<Point>) {
    let mut segment = segment.into_iter().peekable();
    if let (Some(last), Some(first)) = (output.last(), segment.peek()) {
        if almost_equal_points(last, first) {
            segment.next();
        }
    }
    output.extend(segment);
}

fn almost_equal_points(a: &Point, b: &Point) -> bool {
    almost_equal(a.x, b.x) && almost_equal(a.y, b.y)
}

/// Adaptive de Casteljau subdivision.
///
/// Uses an explicit work stack so deep subdivisions cannot exhaust the call
/// stack. Buffers of finished runs are recycled for new right children.
pub fn approximate_bezier(control_points: &[Point]) -> Vec<Point> {
    let count = control_points.len();
    let mut output = Vec::new();

    if count == 0 {
        return output;
    }
    if count == 1 {
        output.push(control_points[0]);
        return output;
    }

    let mut midpoints = vec![Point::zeros(); count];
    let mut left = vec![Point::zeros(); count * 2 - 1];
    let mut right = vec![Point::zeros(); count];
    let mut left_child = vec![Point::zeros(); count];

    let mut to_flatten = vec![control_points.to_vec()];
    let mut free_buffers: Vec<Vec<Point>> = Vec::new();
    let mut subdivisions = 0;
    let mut truncated = false;

    while let Some(mut parent) = to_flatten.pop() {
        let capped = subdivisions >= MAX_BEZIER_SUBDIVISIONS;
        if capped && !truncated {
            log::warn!(
                "Bezier curve needs more than {} subdivisions, flattening early",
                MAX_BEZIER_SUBDIVISIONS
            );
            truncated = true;
        }

        if capped || is_flat_enough(&parent) {
            // Only the first point of each flat run is emitted together with
            // its interior, the run's end is the next run's start.
            subdivide(&parent, &mut left, &mut right, &mut midpoints);
            for i in 0..count - 1 {
                left[count + i] = right[i + 1];
            }

            output.push(parent[0]);
            for i in 1..count - 1 {
                let index = 2 * i;
                let point = (left[index - 1] + left[index] * 2.0 + left[index + 1]) * 0.25;
                output.push(point);
            }

            free_buffers.push(parent);
            continue;
        }

        let mut right_child = free_buffers
            .pop()
            .unwrap_or_else(|| vec![Point::zeros(); count]);
        subdivide(&parent, &mut left_child, &mut right_child, &mut midpoints);
        subdivisions += 1;

        // The parent's buffer is reused for the left half.
        parent.copy_from_slice(&left_child);

        // Left half is processed first so output stays in curve order.
        to_flatten.push(right_child);
        to_flatten.push(parent);
    }

    output.push(control_points[count - 1]);
    output
}

fn is_flat_enough(control_points: &[Point]) -> bool {
    let limit = BEZIER_TOLERANCE * BEZIER_TOLERANCE * 4.0;

    control_points.windows(3).all(|w| {
        let second_difference = w[0] - w[1] * 2.0 + w[2];
        second_difference.norm_squared() <= limit
    })
}

/// Splits a Bezier curve at t = 0.5. `left` receives the first `count`
/// points of the left half, `right` the right half.
fn subdivide(
    control_points: &[Point],
    left: &mut [Point],
    right: &mut [Point],
    midpoints: &mut [Point],
) {
    let count = control_points.len();
    midpoints[..count].copy_from_slice(control_points);

    for i in 0..count {
        left[i] = midpoints[0];
        right[count - i - 1] = midpoints[count - i - 1];

        for j in 0..count - i - 1 {
            midpoints[j] = (midpoints[j] + midpoints[j + 1]) * 0.5;
        }
    }
}

pub fn approximate_catmull(control_points: &[Point]) -> Vec<Point> {
    let n = control_points.len();
    if n < 2 {
        return control_points.to_vec();
    }

    let mut output = Vec::with_capacity((n - 1) * CATMULL_DETAIL + 1);

    for i in 0..n - 1 {
        let v1 = if i > 0 {
            control_points[i - 1]
        } else {
            control_points[i]
        };
        let v2 = control_points[i];
        let v3 = control_points[i + 1];
        let v4 = if i + 2 < n {
            control_points[i + 2]
        } else {
            v3 * 2.0 - v2
        };

        for c in 0..CATMULL_DETAIL {
            output.push(catmull_point(v1, v2, v3, v4, c as f64 / CATMULL_DETAIL as f64));
        }
    }

    output.push(control_points[n - 1]);
    output
}

fn catmull_point(v1: Point, v2: Point, v3: Point, v4: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t * t2;

    (v2 * 2.0
        + (v3 - v1) * t
        + (v1 * 2.0 - v2 * 5.0 + v3 * 4.0 - v4) * t2
        + (v2 * 3.0 - v1 - v3 * 3.0 + v4) * t3)
        * 0.5
}

/// Circle through three points, with the arc direction chosen so the arc
/// passes through the middle point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularArc {
    pub centre: Point,
    pub radius: f64,
    pub theta_start: f64,
    pub theta_range: f64,
    /// 1.0 for counter-clockwise (increasing angle), -1.0 otherwise.
    pub direction: f64,
}

impl CircularArc {
    /// Returns `None` for collinear or coincident points.
    pub fn through(a: Point, b: Point, c: Point) -> Option<Self> {
        let cross = (b.y - a.y) * (c.x - a.x) - (b.x - a.x) * (c.y - a.y);
        if cross.abs() <= LENGTH_EPSILON {
            return None;
        }

        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        let a_sq = a.norm_squared();
        let b_sq = b.norm_squared();
        let c_sq = c.norm_squared();

        let centre = Point::new(
            (a_sq * (b.y - c.y) + b_sq * (c.y - a.y) + c_sq * (a.y - b.y)) / d,
            (a_sq * (c.x - b.x) + b_sq * (a.x - c.x) + c_sq * (b.x - a.x)) / d,
        );

        let d_a = a - centre;
        let d_c = c - centre;
        let radius = d_a.norm();
        if !radius.is_finite() {
            return None;
        }

        let theta_start = d_a.y.atan2(d_a.x);
        let mut theta_end = d_c.y.atan2(d_c.x);
        while theta_end < theta_start {
            theta_end += 2.0 * PI;
        }

        let mut direction = 1.0;
        let mut theta_range = theta_end - theta_start;

        // Perpendicular of A->C; if B lies on its negative side the arc must go
        // the other way round to pass through it.
        let a_to_c = c - a;
        let ortho_a_to_c = Point::new(a_to_c.y, -a_to_c.x);
        if ortho_a_to_c.dot(&(b - a)) < 0.0 {
            direction = -1.0;
            theta_range = 2.0 * PI - theta_range;
        }

        Some(Self {
            centre,
            radius,
            theta_start,
            theta_range,
            direction,
        })
    }

    /// Number of points needed to keep the chord deviation under
    /// [`CIRCULAR_ARC_TOLERANCE`].
    pub fn point_count(&self) -> usize {
        if 2.0 * self.radius <= CIRCULAR_ARC_TOLERANCE {
            return 2;
        }

        let step = 2.0 * (1.0 - CIRCULAR_ARC_TOLERANCE / self.radius).acos();
        if step <= LENGTH_EPSILON {
            return 2;
        }

        ((self.theta_range / step).ceil() as usize).max(2)
    }

    pub fn point_at(&self, fraction: f64) -> Point {
        let theta = self.theta_start + self.direction * fraction * self.theta_range;
        self.centre + Point::new(theta.cos(), theta.sin()) * self.radius
    }
}

/// Returns `None` when the three points do not define a circle.
pub fn approximate_circular_arc(control_points: &[Point]) -> Option<Vec<Point>> {
    let [a, b, c] = control_points else {
        return None;
    };

    let arc = CircularArc::through(*a, *b, *c)?;
    let amount = arc.point_count();
    if amount > MAX_CIRCULAR_ARC_POINTS {
        log::debug!("Circular arc of radius {} needs {amount} points", arc.radius);
        return None;
    }

    let mut output = (0..amount)
        .map(|i| arc.point_at(i as f64 / (amount - 1) as f64))
        .collect::<Vec<_>>();

    // Pin the ends to the exact control points to avoid trigonometric drift.
    output[0] = *a;
    output[amount - 1] = *c;

    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn assert_close(a: Point, b: Point) {
        assert!((a - b).norm() < 1e-6, "{a:?} != {b:?}");
    }

    #[test]
    fn curve_tokens() {
        assert_eq!(CurveType::try_from("L").unwrap(), CurveType::Linear);
        assert_eq!(CurveType::try_from("P").unwrap(), CurveType::Perfect);
        assert_eq!(CurveType::try_from("B").unwrap(), CurveType::Bezier);
        assert_eq!(CurveType::try_from("C").unwrap(), CurveType::Catmull);
        assert!(CurveType::try_from("X").is_err());
    }

    #[test]
    fn linear_is_identity() {
        let points = vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)];
        assert_eq!(approximate(CurveType::Linear, &points), points);
    }

    #[test]
    fn perfect_arc_hits_end_points_and_middle() {
        let a = p(0.0, 0.0);
        let b = p(50.0, 50.0);
        let c = p(100.0, 0.0);
        let output = approximate(CurveType::Perfect, &[a, b, c]);

        assert!(output.len() > 3);
        assert_close(output[0], a);
        assert_close(*output.last().unwrap(), c);

        // Semicircle of radius 50 around (50, 0), passing through (50, 50).
        let centre = p(50.0, 0.0);
        for point in &output {
            assert!(((point - centre).norm() - 50.0).abs() < 1e-6);
        }
        assert!(output.iter().any(|point| point.y > 49.0));
        assert!(output.iter().all(|point| point.y >= -1e-6));
    }

    #[test]
    fn perfect_arc_direction_follows_middle_point() {
        let output = approximate(CurveType::Perfect, &[p(0.0, 0.0), p(50.0, -50.0), p(100.0, 0.0)]);
        assert!(output.iter().all(|point| point.y <= 1e-6));
    }

    #[test]
    fn collinear_arc_falls_back_to_bezier() {
        let points = [p(0.0, 0.0), p(50.0, 0.0), p(100.0, 0.0)];
        assert!(approximate_circular_arc(&points).is_none());

        let output = approximate(CurveType::Perfect, &points);
        assert_close(output[0], points[0]);
        assert_close(*output.last().unwrap(), points[2]);
        assert!(output.iter().all(|point| point.y.abs() < 1e-9));
    }

    #[test]
    fn arc_point_count_tracks_tolerance() {
        let arc = CircularArc::through(p(0.0, 0.0), p(50.0, 50.0), p(100.0, 0.0)).unwrap();
        let step = 2.0 * (1.0 - CIRCULAR_ARC_TOLERANCE / 50.0).acos();
        assert_eq!(arc.point_count(), (PI / step).ceil() as usize);
    }

    #[test]
    fn nearly_collinear_arc_falls_back_to_bezier() {
        let points = [p(0.0, 0.0), p(200.0, 2e-8), p(100.0, 0.0)];
        let arc = CircularArc::through(points[0], points[1], points[2]).unwrap();
        assert!(arc.point_count() > MAX_CIRCULAR_ARC_POINTS);
        assert!(approximate_circular_arc(&points).is_none());

        let output = approximate(CurveType::Perfect, &points);
        assert!(output.len() <= MAX_CIRCULAR_ARC_POINTS);
        assert_close(output[0], points[0]);
        assert_close(*output.last().unwrap(), points[2]);
    }

    #[test]
    fn huge_bezier_is_bounded() {
        let s = 1e12;
        let points = [p(0.0, 0.0), p(s, 0.0), p(0.0, s)];
        let output = approximate_bezier(&points);

        assert!(output.len() <= (MAX_BEZIER_SUBDIVISIONS + 1) * 2 + 1);
        assert_eq!(output[0], points[0]);
        assert_eq!(*output.last().unwrap(), points[2]);
    }

    #[test]
    fn bezier_keeps_end_points_and_stays_in_hull() {
        let points = [p(0.0, 0.0), p(100.0, 200.0), p(200.0, 0.0)];
        let output = approximate(CurveType::Bezier, &points);

        assert!(output.len() > 3);
        assert_close(output[0], points[0]);
        assert_close(*output.last().unwrap(), points[2]);
        // Quadratic peak is at half the control height.
        let peak = output.iter().map(|point| point.y).fold(f64::MIN, f64::max);
        assert!((peak - 100.0).abs() < 1.0);
    }

    #[test]
    fn bezier_splits_at_duplicate_points() {
        let points = [
            p(0.0, 0.0),
            p(50.0, 50.0),
            p(100.0, 0.0),
            p(100.0, 0.0),
            p(150.0, -50.0),
            p(200.0, 0.0),
        ];
        let output = approximate(CurveType::Bezier, &points);

        // The anchor is passed through exactly and only once.
        let anchors = output
            .iter()
            .filter(|point| (**point - p(100.0, 0.0)).norm() < 1e-9)
            .count();
        assert_eq!(anchors, 1);
        assert_close(*output.last().unwrap(), p(200.0, 0.0));
    }

    #[test]
    fn catmull_emits_fixed_detail() {
        let points = [p(0.0, 0.0), p(100.0, 0.0), p(100.0, 100.0)];
        let output = approximate(CurveType::Catmull, &points);

        assert_eq!(output.len(), 2 * CATMULL_DETAIL + 1);
        assert_close(output[0], points[0]);
        assert_close(output[CATMULL_DETAIL], points[1]);
        assert_close(*output.last().unwrap(), points[2]);
    }

    #[test]
    fn short_inputs_pass_through() {
        assert!(approximate(CurveType::Bezier, &[]).is_empty());
        assert_eq!(approximate(CurveType::Catmull, &[p(1.0, 2.0)]), vec![p(1.0, 2.0)]);
    }
}
