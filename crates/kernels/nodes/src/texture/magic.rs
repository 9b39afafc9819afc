use umbra_foundation::Float3;

/// Highest supported turbulence depth.
pub const MAX_DEPTH: i32 = 10;

/// Psychedelic sine/cosine cascade. `depth` is clamped to [`MAX_DEPTH`].
pub fn magic(p: Float3, depth: i32, distortion: f32) -> Float3 {
    let n = depth.min(MAX_DEPTH);
    let d = distortion;

    let mut x = ((p.x + p.y + p.z) * 5.0).sin();
    let mut y = ((-p.x + p.y - p.z) * 5.0).cos();
    let mut z = -((-p.x - p.y + p.z) * 5.0).cos();

    'cascade: {
        if n <= 0 {
            break 'cascade;
        }
        x *= d;
        y *= d;
        z *= d;
        y = -(x - y + z).cos();
        y *= d;
        if n <= 1 {
            break 'cascade;
        }
        x = (x - y - z).cos();
        x *= d;
        if n <= 2 {
            break 'cascade;
        }
        z = (-x - y - z).sin();
        z *= d;
        if n <= 3 {
            break 'cascade;
        }
        x = -(-x + y - z).cos();
        x *= d;
        if n <= 4 {
            break 'cascade;
        }
        y = -(-x + y + z).sin();
        y *= d;
        if n <= 5 {
            break 'cascade;
        }
        y = -(-x + y + z).cos();
        y *= d;
        if n <= 6 {
            break 'cascade;
        }
        x = (x + y + z).cos();
        x *= d;
        if n <= 7 {
            break 'cascade;
        }
        z = (x + y - z).sin();
        z *= d;
        if n <= 8 {
            break 'cascade;
        }
        x = -(-x - y + z).cos();
        x *= d;
        if n <= 9 {
            break 'cascade;
        }
        y = -(x - y + z).sin();
        y *= d;
    }

    if d != 0.0 {
        let d2 = d * 2.0;
        x /= d2;
        y /= d2;
        z /= d2;
    }

    Float3::new(0.5 - x, 0.5 - y, 0.5 - z)
}
