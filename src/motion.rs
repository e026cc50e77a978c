use std::ops;

/// An integer displacement hypothesis between a reference and a target block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MotionVector {
    /// Horizontal displacement in pixels.
    pub dx: i32,
    /// Vertical displacement in pixels.
    pub dy: i32,
}

impl MotionVector {
    /// The zero displacement.
    pub const ZERO: MotionVector = MotionVector { dx: 0, dy: 0 };

    /// Creates a vector from its components.
    #[must_use]
    #[inline]
    pub const fn new(dx: i32, dy: i32) -> Self {
        MotionVector { dx, dy }
    }

    /// Sum of the absolute components.
    #[must_use]
    #[inline]
    pub const fn l1_norm(self) -> u64 {
        self.dx.unsigned_abs() as u64 + self.dy.unsigned_abs() as u64
    }
}

impl ops::Neg for MotionVector {
    type Output = MotionVector;

    #[inline]
    fn neg(self) -> MotionVector {
        MotionVector {
            dx: self.dx.wrapping_neg(),
            dy: self.dy.wrapping_neg(),
        }
    }
}

impl From<(i32, i32)> for MotionVector {
    #[inline]
    fn from((dx, dy): (i32, i32)) -> Self {
        MotionVector { dx, dy }
    }
}
