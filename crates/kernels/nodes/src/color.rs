//! Color space conversions, blend modes and color adjustment nodes.
//!
//! Colors are linear Rec.709 RGB stored in [`Float3`].

use umbra_foundation::scalar::{fract, saturate};
use umbra_foundation::Float3;

/// Rec.709 luminance weights (the Y row of the RGB to XYZ matrix).
pub const LUMINANCE_WEIGHTS: Float3 = Float3::new(0.212_672_9, 0.715_152_2, 0.072_175_0);

node_enum! {
    /// Color model of the separate/combine color nodes.
    pub enum ColorModel {
        Rgb = 0 => "rgb",
        Hsv = 1 => "hsv",
        Hsl = 2 => "hsl",
    }
}

node_enum! {
    /// Blend mode of the color mix node.
    pub enum BlendMode {
        Mix = 0 => "mix",
        Add = 1 => "add",
        Multiply = 2 => "multiply",
        Subtract = 3 => "subtract",
        Screen = 4 => "screen",
        Divide = 5 => "divide",
        Difference = 6 => "difference",
        Darken = 7 => "darken",
        Lighten = 8 => "lighten",
        Overlay = 9 => "overlay",
        Dodge = 10 => "dodge",
        Burn = 11 => "burn",
        Hue = 12 => "hue",
        Saturation = 13 => "saturation",
        Value = 14 => "value",
        Color = 15 => "color",
        SoftLight = 16 => "soft_light",
        LinearLight = 17 => "linear_light",
        Exclusion = 18 => "exclusion",
    }
}

// === Conversions ===

pub fn luminance(c: Float3) -> f32 {
    c.dot(LUMINANCE_WEIGHTS)
}

pub fn rgb_to_hsv(rgb: Float3) -> Float3 {
    let cmax = rgb.x.max(rgb.y).max(rgb.z);
    let cmin = rgb.x.min(rgb.y).min(rgb.z);
    let cdelta = cmax - cmin;
    let v = cmax;

    let s = if cmax != 0.0 { cdelta / cmax } else { 0.0 };
    if s == 0.0 {
        return Float3::new(0.0, 0.0, v);
    }

    let c = (Float3::splat(cmax) - rgb) / cdelta;
    let mut h = if rgb.x == cmax {
        c.z - c.y
    } else if rgb.y == cmax {
        2.0 + c.x - c.z
    } else {
        4.0 + c.y - c.x
    };
    h /= 6.0;
    if h < 0.0 {
        h += 1.0;
    }
    Float3::new(h, s, v)
}

pub fn hsv_to_rgb(hsv: Float3) -> Float3 {
    let (mut h, s, v) = (hsv.x, hsv.y, hsv.z);
    if s == 0.0 {
        return Float3::splat(v);
    }
    if h == 1.0 {
        h = 0.0;
    }
    h *= 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match i as i32 {
        0 => Float3::new(v, t, p),
        1 => Float3::new(q, v, p),
        2 => Float3::new(p, v, t),
        3 => Float3::new(p, q, v),
        4 => Float3::new(t, p, v),
        _ => Float3::new(v, p, q),
    }
}

pub fn rgb_to_hsl(rgb: Float3) -> Float3 {
    let cmax = rgb.x.max(rgb.y).max(rgb.z);
    let cmin = rgb.x.min(rgb.y).min(rgb.z);
    let l = ((cmax + cmin) / 2.0).min(1.0);

    if cmax == cmin {
        return Float3::new(0.0, 0.0, l);
    }

    let d = cmax - cmin;
    let s = if l > 0.5 {
        d / (2.0 - cmax - cmin)
    } else {
        d / (cmax + cmin)
    };
    let h = if cmax == rgb.x {
        (rgb.y - rgb.z) / d + if rgb.y < rgb.z { 6.0 } else { 0.0 }
    } else if cmax == rgb.y {
        (rgb.z - rgb.x) / d + 2.0
    } else {
        (rgb.x - rgb.y) / d + 4.0
    };
    Float3::new(h / 6.0, s, l)
}

pub fn hsl_to_rgb(hsl: Float3) -> Float3 {
    let (h, s, l) = (hsl.x, hsl.y, hsl.z);
    let nr = saturate((h * 6.0 - 3.0).abs() - 1.0);
    let ng = saturate(2.0 - (h * 6.0 - 2.0).abs());
    let nb = saturate(2.0 - (h * 6.0 - 4.0).abs());
    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    Float3::new(
        (nr - 0.5) * chroma + l,
        (ng - 0.5) * chroma + l,
        (nb - 0.5) * chroma + l,
    )
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        if c < 0.0 {
            0.0
        } else {
            c * (1.0 / 12.92)
        }
    } else {
        ((c + 0.055) * (1.0 / 1.055)).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.003_130_8 {
        if c < 0.0 {
            0.0
        } else {
            c * 12.92
        }
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

pub fn xyz_to_rgb(xyz: Float3) -> Float3 {
    Float3::new(
        3.240_454_2 * xyz.x - 1.537_138_5 * xyz.y - 0.498_531_4 * xyz.z,
        -0.969_266_0 * xyz.x + 1.876_010_8 * xyz.y + 0.041_556_0 * xyz.z,
        0.055_643_4 * xyz.x - 0.204_025_9 * xyz.y + 1.057_225_2 * xyz.z,
    )
}

pub fn rgb_to_xyz(rgb: Float3) -> Float3 {
    Float3::new(
        0.412_456_4 * rgb.x + 0.357_576_1 * rgb.y + 0.180_437_5 * rgb.z,
        LUMINANCE_WEIGHTS.dot(rgb),
        0.019_333_9 * rgb.x + 0.119_192_0 * rgb.y + 0.950_304_1 * rgb.z,
    )
}

/// Convert from the given model into RGB.
pub fn combine_color(model: ColorModel, c: Float3) -> Float3 {
    match model {
        ColorModel::Rgb => c,
        ColorModel::Hsv => hsv_to_rgb(c),
        ColorModel::Hsl => hsl_to_rgb(c),
    }
}

/// Convert RGB into the given model.
pub fn separate_color(model: ColorModel, c: Float3) -> Float3 {
    match model {
        ColorModel::Rgb => c,
        ColorModel::Hsv => rgb_to_hsv(c),
        ColorModel::Hsl => rgb_to_hsl(c),
    }
}

// === Adjustments ===

/// Raise positive channels to `gamma`; non-positive channels pass through.
pub fn gamma(c: Float3, gamma: f32) -> Float3 {
    c.map(|v| if v > 0.0 { v.powf(gamma) } else { v })
}

pub fn bright_contrast(c: Float3, bright: f32, contrast: f32) -> Float3 {
    let a = 1.0 + contrast;
    let b = bright - contrast * 0.5;
    c.map(|v| (a * v + b).max(0.0))
}

pub fn invert(c: Float3, fac: f32) -> Float3 {
    c.map(|v| fac * (1.0 - v) + (1.0 - fac) * v)
}

pub fn hue_saturation(c: Float3, hue: f32, saturation: f32, value: f32, fac: f32) -> Float3 {
    let mut hsv = rgb_to_hsv(c);
    hsv.x = fract(hsv.x + hue + 0.5);
    hsv.y = saturate(hsv.y * saturation);
    hsv.z *= value;
    let out = hsv_to_rgb(hsv);
    (out * fac + c * (1.0 - fac)).max(Float3::ZERO)
}

// === Blend modes ===

/// Blend `c2` over `c1` by factor `t` (saturated to `[0, 1]`).
pub fn blend(mode: BlendMode, t: f32, c1: Float3, c2: Float3) -> Float3 {
    let t = saturate(t);
    let tm = 1.0 - t;
    match mode {
        BlendMode::Mix => c1.mix(c2, t),
        BlendMode::Add => c1.mix(c1 + c2, t),
        BlendMode::Multiply => c1.mix(c1 * c2, t),
        BlendMode::Subtract => c1.mix(c1 - c2, t),
        BlendMode::Screen => {
            Float3::ONE - (Float3::splat(tm) + (Float3::ONE - c2) * t) * (Float3::ONE - c1)
        }
        BlendMode::Divide => c1.zip_map(c2, |a, b| if b != 0.0 { tm * a + t * a / b } else { a }),
        BlendMode::Difference => c1.mix((c1 - c2).abs(), t),
        BlendMode::Darken => c1.mix(c1.min(c2), t),
        BlendMode::Lighten => c1.mix(c1.max(c2), t),
        BlendMode::Overlay => c1.zip_map(c2, |a, b| {
            if a < 0.5 {
                a * (tm + 2.0 * t * b)
            } else {
                1.0 - (tm + 2.0 * t * (1.0 - b)) * (1.0 - a)
            }
        }),
        BlendMode::Dodge => c1.zip_map(c2, |a, b| {
            if a == 0.0 {
                return a;
            }
            let tmp = 1.0 - t * b;
            if tmp <= 0.0 {
                1.0
            } else {
                (a / tmp).min(1.0)
            }
        }),
        BlendMode::Burn => c1.zip_map(c2, |a, b| {
            let tmp = tm + t * b;
            if tmp <= 0.0 {
                0.0
            } else {
                saturate(1.0 - (1.0 - a) / tmp)
            }
        }),
        BlendMode::Hue => {
            let hsv2 = rgb_to_hsv(c2);
            if hsv2.y == 0.0 {
                return c1;
            }
            let mut hsv = rgb_to_hsv(c1);
            hsv.x = hsv2.x;
            c1.mix(hsv_to_rgb(hsv), t)
        }
        BlendMode::Saturation => {
            let mut hsv = rgb_to_hsv(c1);
            if hsv.y == 0.0 {
                return c1;
            }
            let hsv2 = rgb_to_hsv(c2);
            hsv.y = tm * hsv.y + t * hsv2.y;
            hsv_to_rgb(hsv)
        }
        BlendMode::Value => {
            let mut hsv = rgb_to_hsv(c1);
            let hsv2 = rgb_to_hsv(c2);
            hsv.z = tm * hsv.z + t * hsv2.z;
            hsv_to_rgb(hsv)
        }
        BlendMode::Color => {
            let hsv2 = rgb_to_hsv(c2);
            if hsv2.y == 0.0 {
                return c1;
            }
            let mut hsv = rgb_to_hsv(c1);
            hsv.x = hsv2.x;
            hsv.y = hsv2.y;
            c1.mix(hsv_to_rgb(hsv), t)
        }
        BlendMode::SoftLight => {
            let scr = Float3::ONE - (Float3::ONE - c2) * (Float3::ONE - c1);
            c1 * tm + ((Float3::ONE - c1) * c2 * c1 + c1 * scr) * t
        }
        BlendMode::LinearLight => c1 + (c2 * 2.0 - Float3::ONE) * t,
        BlendMode::Exclusion => c1.mix(c1 + c2 - c1 * c2 * 2.0, t).max(Float3::ZERO),
    }
}

/// [`blend`] followed by an optional saturate of the result.
pub fn blend_clamped(mode: BlendMode, t: f32, c1: Float3, c2: Float3, clamp: bool) -> Float3 {
    let out = blend(mode, t, c1, c2);
    if clamp {
        out.map(saturate)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Float3, b: Float3, eps: f32) -> bool {
        (a - b).abs().max_component() <= eps
    }

    const SAMPLES: [Float3; 6] = [
        Float3::new(0.2, 0.4, 0.8),
        Float3::new(0.9, 0.1, 0.3),
        Float3::new(0.5, 0.5, 0.5),
        Float3::new(0.0, 0.0, 0.0),
        Float3::new(1.0, 0.7, 0.0),
        Float3::new(0.3, 0.9, 0.6),
    ];

    #[test]
    fn test_hsv_roundtrip() {
        for c in SAMPLES {
            assert!(close(hsv_to_rgb(rgb_to_hsv(c)), c, 1e-5), "{c:?}");
        }
        for hsv in [
            Float3::new(0.0, 0.5, 0.5),
            Float3::new(0.3, 0.8, 0.9),
            Float3::new(0.55, 0.2, 0.4),
            Float3::new(0.9, 1.0, 1.0),
        ] {
            assert!(close(rgb_to_hsv(hsv_to_rgb(hsv)), hsv, 1e-5), "{hsv:?}");
        }
    }

    #[test]
    fn test_hsl_roundtrip() {
        for c in SAMPLES {
            assert!(close(hsl_to_rgb(rgb_to_hsl(c)), c, 1e-5), "{c:?}");
        }
        for hsl in [Float3::new(0.1, 0.5, 0.4), Float3::new(0.7, 0.9, 0.6)] {
            assert!(close(rgb_to_hsl(hsl_to_rgb(hsl)), hsl, 1e-5), "{hsl:?}");
        }
    }

    #[test]
    fn test_srgb_roundtrip() {
        for v in [0.0, 0.001, 0.04, 0.2, 0.5, 1.0] {
            assert!((srgb_to_linear(linear_to_srgb(v)) - v).abs() < 1e-5);
        }
    }

    #[test]
    fn test_xyz_roundtrip() {
        let c = Float3::new(0.25, 0.5, 0.75);
        assert!(close(xyz_to_rgb(rgb_to_xyz(c)), c, 1e-4));
    }

    #[test]
    fn test_blend_identity_factors() {
        let a = Float3::new(0.2, 0.4, 0.6);
        let b = Float3::new(0.9, 0.1, 0.5);
        for mode in BlendMode::ALL {
            let r = blend(*mode, 0.0, a, a);
            assert!(r.is_finite(), "{}", mode.name());
        }
        assert_eq!(blend(BlendMode::Mix, 1.0, a, b), b);
        assert_eq!(blend(BlendMode::Mix, 0.0, a, b), a);
        assert_eq!(blend(BlendMode::Mix, 0.5, a, a), a);
    }

    #[test]
    fn test_divide_by_zero_keeps_base() {
        let a = Float3::new(0.5, 0.5, 0.5);
        assert_eq!(blend(BlendMode::Divide, 1.0, a, Float3::ZERO), a);
    }

    #[test]
    fn test_invert_full() {
        let c = Float3::new(0.25, 0.5, 1.0);
        assert_eq!(invert(c, 1.0), Float3::new(0.75, 0.5, 0.0));
    }

    #[test]
    fn test_hue_saturation_neutral() {
        let c = Float3::new(0.2, 0.4, 0.6);
        assert!(close(hue_saturation(c, 0.5, 1.0, 1.0, 1.0), c, 1e-5));
    }
}
