/*!
 * Input signals consumed by the judgement engine.
 *
 * The engine does no hit testing of its own. Whether the pointer hovers an
 * object and which angle each hand reports both come from the host.
 */
use crate::chart::ObjectId;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

pub trait PointerSignal {
    /// Whether the pointer currently intersects the object's hit target.
    fn is_on_object(&mut self, object: ObjectId) -> bool;
}

pub trait RotationSignal {
    /// The hand's current angle in degrees, `None` when the hand is not
    /// tracked this frame.
    fn sample_angle(&mut self, hand: Hand) -> Option<f64>;
}

/// One angle sample per hand, taken once per tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HandAngles(pub [Option<f64>; 2]);

impl HandAngles {
    pub fn sample<R: RotationSignal + ?Sized>(signal: &mut R) -> Self {
        let mut angles = [None; 2];
        for hand in Hand::ALL {
            angles[hand.index()] = signal.sample_angle(hand).filter(|a| a.is_finite());
        }
        Self(angles)
    }

    pub fn get(&self, hand: Hand) -> Option<f64> {
        self.0[hand.index()]
    }
}

/// Pointer that is either always on every object or never.
#[derive(Debug, Clone, Copy)]
pub struct FixedPointer(pub bool);

impl PointerSignal for FixedPointer {
    fn is_on_object(&mut self, _object: ObjectId) -> bool {
        self.0
    }
}

/// No hands tracked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRotation;

impl RotationSignal for NoRotation {
    fn sample_angle(&mut self, _hand: Hand) -> Option<f64> {
        None
    }
}

/// Turns both hands by a fixed step on every sample.
#[derive(Debug, Clone)]
pub struct SteadyRotation {
    step_degrees: f64,
    angles: [f64; 2],
}

impl SteadyRotation {
    pub fn new(step_degrees: f64) -> Self {
        Self {
            step_degrees,
            angles: [0.0; 2],
        }
    }
}

impl RotationSignal for SteadyRotation {
    fn sample_angle(&mut self, hand: Hand) -> Option<f64> {
        let angle = &mut self.angles[hand.index()];
        *angle = (*angle + self.step_degrees).rem_euclid(360.0);
        Some(*angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_angles_are_untracked() {
        struct Broken;
        impl RotationSignal for Broken {
            fn sample_angle(&mut self, hand: Hand) -> Option<f64> {
                match hand {
                    Hand::Left => Some(f64::NAN),
                    Hand::Right => Some(90.0),
                }
            }
        }

        let angles = HandAngles::sample(&mut Broken);
        assert_eq!(angles.get(Hand::Left), None);
        assert_eq!(angles.get(Hand::Right), Some(90.0));
    }

    #[test]
    fn steady_rotation_wraps() {
        let mut rotation = SteadyRotation::new(200.0);

        assert_eq!(rotation.sample_angle(Hand::Left), Some(200.0));
        assert_eq!(rotation.sample_angle(Hand::Left), Some(40.0));
        assert_eq!(rotation.sample_angle(Hand::Right), Some(200.0));
    }
}
