use umbra_foundation::Float3;

/// `1.0` on "white" cells of a unit checkerboard, `0.0` elsewhere.
///
/// Coordinates are nudged off integer boundaries so that flat surfaces lying
/// exactly on a cell border don't flicker between the two colors.
pub fn checker(p: Float3) -> f32 {
    let p = p.map(|v| (v + 0.000_001) * 0.999_999);
    let xi = (p.x.floor() as i32).abs();
    let yi = (p.y.floor() as i32).abs();
    let zi = (p.z.floor() as i32).abs();

    let xy_match = (xi % 2 == yi % 2) as i32;
    if xy_match == zi % 2 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbouring_cells_alternate() {
        let a = checker(Float3::new(0.5, 0.5, 0.5));
        let b = checker(Float3::new(1.5, 0.5, 0.5));
        let c = checker(Float3::new(1.5, 1.5, 0.5));
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_origin_cell() {
        // x, y even -> match = 1; z even -> 0 != 1
        assert_eq!(checker(Float3::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(checker(Float3::new(0.5, 0.5, 1.5)), 1.0);
    }
}
