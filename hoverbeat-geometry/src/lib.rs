/*!
 * Slider path geometry.
 *
 * Turns sparse control points into dense polylines and answers length based
 * position queries along them.
 */

pub mod curve;
pub mod path;

pub use curve::{approximate, CurveType};
pub use path::{build_cumulative_lengths, trim_to_length, SliderPath};

/// A point in playfield space (osu!pixels).
pub type Point = nalgebra::Vector2<f64>;

/// Lengths and denominators below this are treated as zero.
pub const LENGTH_EPSILON: f64 = 1e-7;

pub(crate) fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= LENGTH_EPSILON
}
