use umbra_foundation::hash::{
    hash_float2_to_float, hash_float2_to_float3, hash_float3_to_float, hash_float3_to_float3,
    hash_float4_to_float, hash_float4_to_float3, hash_float_to_float, hash_float_to_float3,
};
use umbra_foundation::{Float2, Float3, Float4};

/// Uncorrelated value and color for `dimensions` (1 to 4) of `(p, w)`.
///
/// 1D uses `w` alone; 4D appends `w` to `p`.
pub fn white_noise(dimensions: u32, p: Float3, w: f32) -> (f32, Float3) {
    match dimensions {
        1 => (hash_float_to_float(w), hash_float_to_float3(w)),
        2 => {
            let k = Float2::new(p.x, p.y);
            (hash_float2_to_float(k), hash_float2_to_float3(k))
        }
        4 => {
            let k = Float4::new(p.x, p.y, p.z, w);
            (hash_float4_to_float(k), hash_float4_to_float3(k))
        }
        _ => (hash_float3_to_float(p), hash_float3_to_float3(p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_select_inputs() {
        let p = Float3::new(0.1, 0.2, 0.3);
        let (a, _) = white_noise(2, p, 0.0);
        let (b, _) = white_noise(2, Float3::new(0.1, 0.2, 9.0), 5.0);
        assert_eq!(a, b);
        let (c, _) = white_noise(1, p, 0.5);
        let (d, _) = white_noise(1, Float3::ZERO, 0.5);
        assert_eq!(c, d);
    }

    #[test]
    fn test_values_in_unit_range() {
        for dims in 1..=4 {
            let (v, c) = white_noise(dims, Float3::new(1.5, -2.0, 0.25), 3.0);
            assert!((0.0..=1.0).contains(&v));
            assert!(c.max_component() <= 1.0 && c.min_component() >= 0.0);
        }
    }
}
