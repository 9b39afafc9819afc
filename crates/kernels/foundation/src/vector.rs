//! Small fixed-size float vectors.
//!
//! All shading math runs in `f32` so that results match between CPU and GPU
//! backends. The types are plain `#[repr(C)]` structs with component-wise
//! operators; there is no SIMD dispatch here.

use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

macro_rules! componentwise {
    ($ty:ident { $($f:ident),+ }) => {
        impl Add for $ty {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self { $($f: self.$f + rhs.$f),+ }
            }
        }

        impl Sub for $ty {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self { $($f: self.$f - rhs.$f),+ }
            }
        }

        impl Mul for $ty {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: Self) -> Self {
                Self { $($f: self.$f * rhs.$f),+ }
            }
        }

        impl Mul<f32> for $ty {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: f32) -> Self {
                Self { $($f: self.$f * rhs),+ }
            }
        }

        impl Mul<$ty> for f32 {
            type Output = $ty;
            #[inline]
            fn mul(self, rhs: $ty) -> $ty {
                $ty { $($f: self * rhs.$f),+ }
            }
        }

        impl Div for $ty {
            type Output = Self;
            #[inline]
            fn div(self, rhs: Self) -> Self {
                Self { $($f: self.$f / rhs.$f),+ }
            }
        }

        impl Div<f32> for $ty {
            type Output = Self;
            #[inline]
            fn div(self, rhs: f32) -> Self {
                Self { $($f: self.$f / rhs),+ }
            }
        }

        impl Neg for $ty {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                Self { $($f: -self.$f),+ }
            }
        }

        impl AddAssign for $ty {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                $(self.$f += rhs.$f;)+
            }
        }

        impl SubAssign for $ty {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                $(self.$f -= rhs.$f;)+
            }
        }

        impl MulAssign<f32> for $ty {
            #[inline]
            fn mul_assign(&mut self, rhs: f32) {
                $(self.$f *= rhs;)+
            }
        }

        impl $ty {
            /// All components set to `v`.
            #[inline]
            pub const fn splat(v: f32) -> Self {
                Self { $($f: v),+ }
            }

            /// Apply `f` to every component.
            #[inline]
            pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
                Self { $($f: f(self.$f)),+ }
            }

            /// Combine two vectors component by component.
            #[inline]
            pub fn zip_map(self, rhs: Self, f: impl Fn(f32, f32) -> f32) -> Self {
                Self { $($f: f(self.$f, rhs.$f)),+ }
            }

            #[inline]
            pub fn dot(self, rhs: Self) -> f32 {
                0.0 $(+ self.$f * rhs.$f)+
            }

            #[inline]
            pub fn length_squared(self) -> f32 {
                self.dot(self)
            }

            #[inline]
            pub fn length(self) -> f32 {
                self.length_squared().sqrt()
            }

            #[inline]
            pub fn distance(self, rhs: Self) -> f32 {
                (self - rhs).length()
            }

            /// Normalize, returning zero for zero-length input.
            #[inline]
            pub fn safe_normalize(self) -> Self {
                let len = self.length();
                if len != 0.0 {
                    self * (1.0 / len)
                } else {
                    Self::splat(0.0)
                }
            }

            /// Component-wise division returning zero where the divisor is zero.
            #[inline]
            pub fn safe_divide(self, rhs: Self) -> Self {
                self.zip_map(rhs, |a, b| if b != 0.0 { a / b } else { 0.0 })
            }

            #[inline]
            pub fn abs(self) -> Self {
                self.map(f32::abs)
            }

            #[inline]
            pub fn floor(self) -> Self {
                self.map(f32::floor)
            }

            #[inline]
            pub fn ceil(self) -> Self {
                self.map(f32::ceil)
            }

            /// `x - floor(x)` per component.
            #[inline]
            pub fn fract(self) -> Self {
                self.map(|v| v - v.floor())
            }

            #[inline]
            pub fn min(self, rhs: Self) -> Self {
                self.zip_map(rhs, f32::min)
            }

            #[inline]
            pub fn max(self, rhs: Self) -> Self {
                self.zip_map(rhs, f32::max)
            }

            #[inline]
            pub fn max_component(self) -> f32 {
                f32::NEG_INFINITY $(.max(self.$f))+
            }

            #[inline]
            pub fn min_component(self) -> f32 {
                f32::INFINITY $(.min(self.$f))+
            }

            /// Linear interpolation `self * (1 - t) + rhs * t`.
            #[inline]
            pub fn mix(self, rhs: Self, t: f32) -> Self {
                self * (1.0 - t) + rhs * t
            }

            /// `true` if every component is finite.
            #[inline]
            pub fn is_finite(self) -> bool {
                true $(&& self.$f.is_finite())+
            }
        }
    };
}

/// Two-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Float2 {
    pub x: f32,
    pub y: f32,
}

/// Three-component vector, also used for RGB colors and closure weights.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Four-component vector, used for 4D texture coordinates and ramp entries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Float4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

componentwise!(Float2 { x, y });
componentwise!(Float3 { x, y, z });
componentwise!(Float4 { x, y, z, w });

impl Float2 {
    pub const ZERO: Self = Self::splat(0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Float3 {
    pub const ZERO: Self = Self::splat(0.0);
    pub const ONE: Self = Self::splat(1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Arithmetic mean of the three components.
    #[inline]
    pub fn average(self) -> f32 {
        (self.x + self.y + self.z) * (1.0 / 3.0)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[inline]
    pub const fn extend(self, w: f32) -> Float4 {
        Float4::new(self.x, self.y, self.z, w)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Reflect `self` about the unit normal `n`.
    #[inline]
    pub fn reflect(self, n: Self) -> Self {
        self - n * (2.0 * n.dot(self))
    }

    /// Refract `self` through the unit normal `n` with relative index `eta`.
    ///
    /// Returns zero on total internal reflection.
    #[inline]
    pub fn refract(self, n: Self, eta: f32) -> Self {
        let cos_i = n.dot(self);
        let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
        if k < 0.0 {
            Self::ZERO
        } else {
            self * eta - n * (eta * cos_i + k.sqrt())
        }
    }

    /// Flip `self` so that it faces against `incident` relative to `reference`.
    #[inline]
    pub fn faceforward(self, incident: Self, reference: Self) -> Self {
        if reference.dot(incident) < 0.0 {
            self
        } else {
            -self
        }
    }
}

impl Float4 {
    pub const ZERO: Self = Self::splat(0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub const fn truncate(self) -> Float3 {
        Float3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Index<usize> for Float3 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl From<[f32; 3]> for Float3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<[f32; 4]> for Float4 {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_is_orthogonal() {
        let a = Float3::new(1.0, 2.0, 3.0);
        let b = Float3::new(-2.0, 0.5, 4.0);
        let c = a.cross(b);
        assert!(c.dot(a).abs() < 1e-5);
        assert!(c.dot(b).abs() < 1e-5);
    }

    #[test]
    fn test_safe_normalize_zero() {
        assert_eq!(Float3::ZERO.safe_normalize(), Float3::ZERO);
        let n = Float3::new(3.0, 0.0, 4.0).safe_normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_safe_divide_by_zero_component() {
        let r = Float3::new(1.0, 2.0, 3.0).safe_divide(Float3::new(2.0, 0.0, -1.0));
        assert_eq!(r, Float3::new(0.5, 0.0, -3.0));
    }

    #[test]
    fn test_distance_4d() {
        let a = Float4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(a.distance(Float4::ZERO), 2.0);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        let i = Float3::new(1.0, -0.05, 0.0).safe_normalize();
        let n = Float3::new(0.0, 1.0, 0.0);
        assert_eq!(i.refract(n, 1.5), Float3::ZERO);
    }
}
