//! Affine transforms.
//!
//! A [`Transform`] is a 3x4 row-major affine matrix: three rows of
//! `[m0, m1, m2, translation]`. The implicit fourth row is `[0, 0, 0, 1]`.

use serde::{Deserialize, Serialize};

use crate::vector::Float3;

/// Row-major 3x4 affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rows: [[f32; 4]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    pub const fn from_rows(rows: [[f32; 4]; 3]) -> Self {
        Self { rows }
    }

    pub fn translation(t: Float3) -> Self {
        let mut m = Self::IDENTITY;
        m.rows[0][3] = t.x;
        m.rows[1][3] = t.y;
        m.rows[2][3] = t.z;
        m
    }

    pub fn scale(s: Float3) -> Self {
        Self::from_rows([
            [s.x, 0.0, 0.0, 0.0],
            [0.0, s.y, 0.0, 0.0],
            [0.0, 0.0, s.z, 0.0],
        ])
    }

    /// Rotation from XYZ Euler angles (radians), applied X then Y then Z.
    pub fn euler_xyz(r: Float3) -> Self {
        let (sx, cx) = r.x.sin_cos();
        let (sy, cy) = r.y.sin_cos();
        let (sz, cz) = r.z.sin_cos();
        Self::from_rows([
            [cy * cz, sy * sx * cz - cx * sz, sy * cx * cz + sx * sz, 0.0],
            [cy * sz, sy * sx * sz + cx * cz, sy * cx * sz - sx * cz, 0.0],
            [-sy, cy * sx, cy * cx, 0.0],
        ])
    }

    /// Translation * rotation * scale.
    pub fn from_trs(location: Float3, rotation: Float3, scale: Float3) -> Self {
        Self::translation(location)
            .compose(&Self::euler_xyz(rotation))
            .compose(&Self::scale(scale))
    }

    /// `self * rhs`: `rhs` is applied first.
    pub fn compose(&self, rhs: &Self) -> Self {
        let a = &self.rows;
        let b = &rhs.rows;
        let mut out = [[0.0f32; 4]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for col in 0..4 {
                let mut sum = a[row][0] * b[0][col] + a[row][1] * b[1][col] + a[row][2] * b[2][col];
                if col == 3 {
                    sum += a[row][3];
                }
                out_row[col] = sum;
            }
        }
        Self { rows: out }
    }

    #[inline]
    pub fn point(&self, p: Float3) -> Float3 {
        let m = &self.rows;
        Float3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    #[inline]
    pub fn direction(&self, d: Float3) -> Float3 {
        let m = &self.rows;
        Float3::new(
            m[0][0] * d.x + m[0][1] * d.y + m[0][2] * d.z,
            m[1][0] * d.x + m[1][1] * d.y + m[1][2] * d.z,
            m[2][0] * d.x + m[2][1] * d.y + m[2][2] * d.z,
        )
    }

    /// Transform a direction by the transpose of the linear part.
    ///
    /// Passing the inverse of a transform gives the correct normal transform.
    #[inline]
    pub fn direction_transposed(&self, d: Float3) -> Float3 {
        let m = &self.rows;
        Float3::new(
            m[0][0] * d.x + m[1][0] * d.y + m[2][0] * d.z,
            m[0][1] * d.x + m[1][1] * d.y + m[2][1] * d.z,
            m[0][2] * d.x + m[1][2] * d.y + m[2][2] * d.z,
        )
    }

    /// Inverse of the affine transform, `None` when singular.
    pub fn inverse(&self) -> Option<Self> {
        let m = &self.rows;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        let r = [
            [
                c00 * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                c01 * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                c02 * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ];

        let t = Float3::new(m[0][3], m[1][3], m[2][3]);
        let mut rows = [[0.0f32; 4]; 3];
        for i in 0..3 {
            rows[i][0] = r[i][0];
            rows[i][1] = r[i][1];
            rows[i][2] = r[i][2];
            rows[i][3] = -(r[i][0] * t.x + r[i][1] * t.y + r[i][2] * t.z);
        }
        Some(Self { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Float3, b: Float3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_identity_point() {
        let p = Float3::new(1.0, -2.0, 3.5);
        assert_eq!(Transform::IDENTITY.point(p), p);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Transform::from_trs(
            Float3::new(1.0, 2.0, 3.0),
            Float3::new(0.3, -0.2, 1.1),
            Float3::new(2.0, 0.5, 1.5),
        );
        let inv = t.inverse().expect("invertible");
        let p = Float3::new(-0.7, 4.0, 0.25);
        assert!(close(inv.point(t.point(p)), p));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let t = Transform::scale(Float3::new(1.0, 0.0, 1.0));
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_direction_ignores_translation() {
        let t = Transform::translation(Float3::new(5.0, 5.0, 5.0));
        let d = Float3::new(0.0, 1.0, 0.0);
        assert_eq!(t.direction(d), d);
    }

    #[test]
    fn test_euler_z_quarter_turn() {
        let t = Transform::euler_xyz(Float3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2));
        assert!(close(t.direction(Float3::new(1.0, 0.0, 0.0)), Float3::new(0.0, 1.0, 0.0)));
    }
}
