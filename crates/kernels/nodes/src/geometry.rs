//! Vector mapping, facing ratios and surface perturbation.

use umbra_foundation::scalar::fresnel_dielectric_cos;
use umbra_foundation::{Dual3, Float3, Transform};

node_enum! {
    /// How the mapping node interprets its input.
    pub enum MappingType {
        Point = 0 => "point",
        Texture = 1 => "texture",
        Vector = 2 => "vector",
        Normal = 3 => "normal",
    }
}

node_enum! {
    pub enum LayerWeightOutput {
        Fresnel = 0 => "fresnel",
        Facing = 1 => "facing",
    }
}

/// Location / rotation (XYZ Euler, radians) / scale of the mapping node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub location: Float3,
    pub rotation: Float3,
    pub scale: Float3,
}

impl Mapping {
    pub fn apply(&self, kind: MappingType, v: Float3) -> Float3 {
        let rot = Transform::euler_xyz(self.rotation);
        match kind {
            MappingType::Point => rot.direction(v * self.scale) + self.location,
            MappingType::Texture => {
                rot.direction_transposed(v - self.location).safe_divide(self.scale)
            }
            MappingType::Vector => rot.direction(v * self.scale),
            MappingType::Normal => rot.direction(v.safe_divide(self.scale)).safe_normalize(),
        }
    }

    /// Map a value together with its differentials.
    ///
    /// Differentials go through the linear part of the mapping only, so
    /// location never leaks into them. Normals are not differentiable here
    /// and get zero differentials.
    pub fn apply_dual(&self, kind: MappingType, v: Dual3) -> Dual3 {
        let val = self.apply(kind, v.val);
        let linear = |d: Float3| match kind {
            MappingType::Point | MappingType::Vector => self.apply(MappingType::Vector, d),
            MappingType::Texture => {
                let rot = Transform::euler_xyz(self.rotation);
                rot.direction_transposed(d).safe_divide(self.scale)
            }
            MappingType::Normal => Float3::ZERO,
        };
        Dual3::new(val, linear(v.dx), linear(v.dy))
    }
}

/// Fresnel reflectance for incident direction `incoming` (pointing away from
/// the surface) and normal `n`.
pub fn fresnel(incoming: Float3, n: Float3, ior: f32, backfacing: bool) -> f32 {
    let eta = ior.max(1e-5);
    let eta = if backfacing { 1.0 / eta } else { eta };
    fresnel_dielectric_cos(incoming.dot(n), eta)
}

/// Layer weight node: fresnel- or facing-based blend factor.
pub fn layer_weight(
    output: LayerWeightOutput,
    incoming: Float3,
    n: Float3,
    blend: f32,
    backfacing: bool,
) -> f32 {
    let blend = blend.clamp(0.0, 1.0 - 1e-5);
    match output {
        LayerWeightOutput::Fresnel => {
            let eta = (1.0 - blend).max(1e-5);
            let eta = if backfacing { eta } else { 1.0 / eta };
            fresnel_dielectric_cos(incoming.dot(n), eta)
        }
        LayerWeightOutput::Facing => {
            let mut f = incoming.dot(n).abs();
            if blend != 0.5 {
                let exponent = if blend < 0.5 {
                    2.0 * blend
                } else {
                    0.5 / (1.0 - blend)
                };
                f = f.powf(exponent);
            }
            1.0 - f
        }
    }
}

/// Inputs of the bump node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumpInput {
    /// Unperturbed normal.
    pub normal: Float3,
    pub dpdx: Float3,
    pub dpdy: Float3,
    /// Heights sampled at P, P + dP/dx and P + dP/dy.
    pub height_center: f32,
    pub height_dx: f32,
    pub height_dy: f32,
    pub strength: f32,
    pub distance: f32,
    pub invert: bool,
}

/// Perturbed normal from three height samples (surface gradient method).
pub fn bump(b: &BumpInput) -> Float3 {
    let n = b.normal;
    let rx = b.dpdy.cross(n);
    let ry = n.cross(b.dpdx);
    let det = b.dpdx.dot(rx);

    let dhdx = b.height_dx - b.height_center;
    let dhdy = b.height_dy - b.height_center;
    let surfgrad = rx * dhdx + ry * dhdy;

    let strength = b.strength.max(0.0);
    let distance = if b.invert { -b.distance } else { b.distance };
    let sign = if det < 0.0 { -1.0 } else { 1.0 };

    let perturbed = (n * det.abs() - surfgrad * (distance * sign)).safe_normalize();
    (perturbed * strength + n * (1.0 - strength)).safe_normalize()
}

/// Offset along `normal` for the displacement node.
pub fn displacement(height: f32, midlevel: f32, scale: f32, normal: Float3) -> Float3 {
    normal * ((height - midlevel) * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Float3, b: Float3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_mapping_identity() {
        let m = Mapping {
            location: Float3::ZERO,
            rotation: Float3::ZERO,
            scale: Float3::ONE,
        };
        let v = Float3::new(0.3, -1.0, 2.0);
        for kind in [MappingType::Point, MappingType::Texture, MappingType::Vector] {
            assert!(close(m.apply(kind, v), v));
        }
    }

    #[test]
    fn test_texture_inverts_point() {
        let m = Mapping {
            location: Float3::new(1.0, 2.0, 3.0),
            rotation: Float3::new(0.2, 0.4, -0.3),
            scale: Float3::new(2.0, 2.0, 2.0),
        };
        let v = Float3::new(0.3, -1.0, 2.0);
        let scaled = Mapping {
            scale: Float3::ONE,
            ..m
        };
        // texture mapping undoes location/rotation of point mapping
        let mapped = scaled.apply(MappingType::Point, v);
        assert!(close(scaled.apply(MappingType::Texture, mapped), v));
    }

    #[test]
    fn test_dual_mapping_drops_location() {
        let m = Mapping {
            location: Float3::new(5.0, 5.0, 5.0),
            rotation: Float3::ZERO,
            scale: Float3::new(2.0, 1.0, 1.0),
        };
        let d = Dual3::new(Float3::ZERO, Float3::new(1.0, 0.0, 0.0), Float3::new(0.0, 1.0, 0.0));
        let out = m.apply_dual(MappingType::Point, d);
        assert_eq!(out.val, Float3::new(5.0, 5.0, 5.0));
        assert!(close(out.dx, Float3::new(2.0, 0.0, 0.0)));
        assert!(close(out.dy, Float3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_flat_height_keeps_normal() {
        let b = BumpInput {
            normal: Float3::new(0.0, 0.0, 1.0),
            dpdx: Float3::new(0.01, 0.0, 0.0),
            dpdy: Float3::new(0.0, 0.01, 0.0),
            height_center: 0.5,
            height_dx: 0.5,
            height_dy: 0.5,
            strength: 1.0,
            distance: 1.0,
            invert: false,
        };
        assert!(close(bump(&b), b.normal));
    }

    #[test]
    fn test_slope_tilts_normal_against_gradient() {
        let b = BumpInput {
            normal: Float3::new(0.0, 0.0, 1.0),
            dpdx: Float3::new(0.01, 0.0, 0.0),
            dpdy: Float3::new(0.0, 0.01, 0.0),
            height_center: 0.0,
            height_dx: 0.01,
            height_dy: 0.0,
            strength: 1.0,
            distance: 1.0,
            invert: false,
        };
        let n = bump(&b);
        assert!(n.x < 0.0);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_facing_weight() {
        let n = Float3::new(0.0, 0.0, 1.0);
        assert!(layer_weight(LayerWeightOutput::Facing, n, n, 0.5, false).abs() < 1e-6);
        let grazing = Float3::new(1.0, 0.0, 0.0);
        assert_eq!(layer_weight(LayerWeightOutput::Facing, grazing, n, 0.5, false), 1.0);
    }

    #[test]
    fn test_fresnel_head_on() {
        let n = Float3::new(0.0, 0.0, 1.0);
        assert!((fresnel(n, n, 1.5, false) - 0.04).abs() < 1e-4);
    }
}
