use umbra_foundation::scalar::saturate;
use umbra_foundation::Float3;

/// Integer hash producing a per-brick tint in `[0, 1]`.
fn brick_noise(n: u32) -> f32 {
    let n = n.wrapping_add(1013) & 0x7fff_ffff;
    let n = (n >> 13) ^ n;
    let nn = n
        .wrapping_mul(
            n.wrapping_mul(n)
                .wrapping_mul(60493)
                .wrapping_add(19_990_303),
        )
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff;
    0.5 * (nn as f32 / 1_073_741_824.0)
}

#[inline]
fn smoothstep_unit(f: f32) -> f32 {
    let ff = f * f;
    (3.0 - 2.0 * f) * ff
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrickParams {
    pub mortar_size: f32,
    pub mortar_smooth: f32,
    pub bias: f32,
    pub brick_width: f32,
    pub row_height: f32,
    pub offset_amount: f32,
    pub offset_frequency: i32,
    pub squash_amount: f32,
    pub squash_frequency: i32,
}

/// Returns `(tint, mortar)`: the per-brick tint and the mortar mask
/// (`1` fully mortar, `0` fully brick).
pub fn brick(p: Float3, b: &BrickParams) -> (f32, f32) {
    let mut brick_width = b.brick_width;
    let mut offset = 0.0;

    let rownum = (p.y / b.row_height).floor() as i32;

    if b.offset_frequency != 0 && b.squash_frequency != 0 {
        if rownum % b.squash_frequency == 0 {
            brick_width *= b.squash_amount;
        }
        if rownum % b.offset_frequency == 0 {
            offset = brick_width * b.offset_amount;
        }
    }

    let bricknum = ((p.x + offset) / brick_width).floor() as i32;

    let x = (p.x + offset) - brick_width * bricknum as f32;
    let y = p.y - b.row_height * rownum as f32;

    let seed = ((rownum as u32) << 16).wrapping_add((bricknum as u32) & 0xffff);
    let tint = saturate(brick_noise(seed) + b.bias);

    let min_dist = x.min(y).min((brick_width - x).min(b.row_height - y));

    let mortar = if min_dist >= b.mortar_size {
        0.0
    } else if b.mortar_smooth == 0.0 {
        1.0
    } else {
        let min_dist = 1.0 - min_dist / b.mortar_size;
        if min_dist < b.mortar_smooth {
            smoothstep_unit(min_dist / b.mortar_smooth)
        } else {
            1.0
        }
    };

    (tint, mortar)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BrickParams {
        BrickParams {
            mortar_size: 0.02,
            mortar_smooth: 0.0,
            bias: 0.0,
            brick_width: 0.5,
            row_height: 0.25,
            offset_amount: 0.5,
            offset_frequency: 2,
            squash_amount: 1.0,
            squash_frequency: 2,
        }
    }

    #[test]
    fn test_brick_center_has_no_mortar() {
        let (_, mortar) = brick(Float3::new(0.0, 0.125, 0.0), &params());
        assert_eq!(mortar, 0.0);
    }

    #[test]
    fn test_row_seam_is_mortar() {
        let (_, mortar) = brick(Float3::new(0.1, 0.251, 0.0), &params());
        assert_eq!(mortar, 1.0);
    }

    #[test]
    fn test_tint_in_unit_range() {
        for i in 0..64 {
            let (tint, _) = brick(Float3::new(i as f32 * 0.37, i as f32 * 0.11, 0.0), &params());
            assert!((0.0..=1.0).contains(&tint));
        }
        for n in [0u32, 1, 77, 0xffff_ffff] {
            let v = brick_noise(n);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
