//! Values carried together with their screen-space differentials.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::vector::{Float2, Float3};

/// A value with its partial derivatives along screen x and y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dual<T> {
    pub val: T,
    pub dx: T,
    pub dy: T,
}

pub type Dual1 = Dual<f32>;
pub type Dual2 = Dual<Float2>;
pub type Dual3 = Dual<Float3>;

impl<T: Copy + Default> Dual<T> {
    #[inline]
    pub fn new(val: T, dx: T, dy: T) -> Self {
        Self { val, dx, dy }
    }

    /// A value with zero differentials.
    #[inline]
    pub fn constant(val: T) -> Self {
        Self {
            val,
            dx: T::default(),
            dy: T::default(),
        }
    }
}

impl<T: Add<Output = T>> Add for Dual<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            val: self.val + rhs.val,
            dx: self.dx + rhs.dx,
            dy: self.dy + rhs.dy,
        }
    }
}

impl<T: Sub<Output = T>> Sub for Dual<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            val: self.val - rhs.val,
            dx: self.dx - rhs.dx,
            dy: self.dy - rhs.dy,
        }
    }
}

impl<T: Mul<f32, Output = T>> Mul<f32> for Dual<T> {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            val: self.val * rhs,
            dx: self.dx * rhs,
            dy: self.dy * rhs,
        }
    }
}

impl Dual3 {
    /// Project onto a scalar using the component average.
    pub fn average(self) -> Dual1 {
        Dual1::new(self.val.average(), self.dx.average(), self.dy.average())
    }

    pub fn x(self) -> Dual1 {
        Dual1::new(self.val.x, self.dx.x, self.dy.x)
    }
}

impl Dual1 {
    /// Broadcast a scalar dual to all three components.
    pub fn splat3(self) -> Dual3 {
        Dual3::new(
            Float3::splat(self.val),
            Float3::splat(self.dx),
            Float3::splat(self.dy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_has_zero_derivatives() {
        let d = Dual1::constant(3.0);
        assert_eq!(d.dx, 0.0);
        assert_eq!(d.dy, 0.0);
    }

    #[test]
    fn test_scaling_applies_to_derivatives() {
        let d = Dual3::new(
            Float3::new(1.0, 2.0, 3.0),
            Float3::new(0.1, 0.0, 0.0),
            Float3::new(0.0, 0.2, 0.0),
        );
        let scaled = d * 2.0;
        assert_eq!(scaled.val, Float3::new(2.0, 4.0, 6.0));
        assert_eq!(scaled.dx, Float3::new(0.2, 0.0, 0.0));
        assert_eq!(scaled.dy, Float3::new(0.0, 0.4, 0.0));
    }

    #[test]
    fn test_average_projection() {
        let d = Dual3::new(Float3::new(3.0, 3.0, 3.0), Float3::new(3.0, 0.0, 0.0), Float3::ZERO);
        let a = d.average();
        assert_eq!(a.val, 3.0);
        assert_eq!(a.dx, 1.0);
    }
}
