use std::f32::consts::PI;

use umbra_foundation::Float3;

node_enum! {
    pub enum GradientType {
        Linear = 0 => "linear",
        Quadratic = 1 => "quadratic",
        Easing = 2 => "easing",
        Diagonal = 3 => "diagonal",
        Radial = 4 => "radial",
        QuadraticSphere = 5 => "quadratic_sphere",
        Spherical = 6 => "spherical",
    }
}

/// Unclamped gradient value at `p`; callers saturate the result.
pub fn gradient(kind: GradientType, p: Float3) -> f32 {
    match kind {
        GradientType::Linear => p.x,
        GradientType::Quadratic => {
            let r = p.x.max(0.0);
            r * r
        }
        GradientType::Easing => {
            let r = p.x.clamp(0.0, 1.0);
            let t = r * r;
            3.0 * t - 2.0 * t * r
        }
        GradientType::Diagonal => (p.x + p.y) * 0.5,
        GradientType::Radial => p.y.atan2(p.x) / (2.0 * PI) + 0.5,
        GradientType::QuadraticSphere => {
            let r = (0.999_999 - p.length()).max(0.0);
            r * r
        }
        GradientType::Spherical => (0.999_999 - p.length()).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_and_easing_endpoints() {
        assert_eq!(gradient(GradientType::Linear, Float3::new(0.25, 9.0, 9.0)), 0.25);
        assert_eq!(gradient(GradientType::Easing, Float3::new(0.0, 0.0, 0.0)), 0.0);
        assert_eq!(gradient(GradientType::Easing, Float3::new(1.0, 0.0, 0.0)), 1.0);
        assert_eq!(gradient(GradientType::Easing, Float3::new(0.5, 0.0, 0.0)), 0.5);
    }

    #[test]
    fn test_spherical_falls_off() {
        let center = gradient(GradientType::Spherical, Float3::ZERO);
        let edge = gradient(GradientType::Spherical, Float3::new(1.0, 0.0, 0.0));
        assert!(center > 0.99);
        assert_eq!(edge, 0.0);
    }

    #[test]
    fn test_radial_range() {
        for i in 0..16 {
            let a = i as f32 * 0.4;
            let v = gradient(GradientType::Radial, Float3::new(a.cos(), a.sin(), 0.0));
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
