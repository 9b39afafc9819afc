use std::f32::consts::{FRAC_PI_2, PI};

use umbra_foundation::Float3;

use crate::fractal::fbm;

node_enum! {
    pub enum WaveType {
        Bands = 0 => "bands",
        Rings = 1 => "rings",
    }
}

node_enum! {
    pub enum WaveBandsDirection {
        X = 0 => "x",
        Y = 1 => "y",
        Z = 2 => "z",
        Diagonal = 3 => "diagonal",
    }
}

node_enum! {
    pub enum WaveRingsDirection {
        X = 0 => "x",
        Y = 1 => "y",
        Z = 2 => "z",
        Spherical = 3 => "spherical",
    }
}

node_enum! {
    pub enum WaveProfile {
        Sine = 0 => "sine",
        Saw = 1 => "saw",
        Triangle = 2 => "triangle",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub kind: WaveType,
    pub bands_direction: WaveBandsDirection,
    pub rings_direction: WaveRingsDirection,
    pub profile: WaveProfile,
    pub distortion: f32,
    pub detail: f32,
    pub detail_scale: f32,
    pub detail_roughness: f32,
    pub phase: f32,
}

/// Wave pattern value in `[0, 1]` at `p`.
pub fn wave(p: Float3, w: &WaveParams) -> f32 {
    let p = p.map(|v| (v + 0.000_001) * 0.999_999);

    let mut n = match w.kind {
        WaveType::Bands => match w.bands_direction {
            WaveBandsDirection::X => p.x * 20.0,
            WaveBandsDirection::Y => p.y * 20.0,
            WaveBandsDirection::Z => p.z * 20.0,
            WaveBandsDirection::Diagonal => (p.x + p.y + p.z) * 10.0,
        },
        WaveType::Rings => {
            let rp = match w.rings_direction {
                WaveRingsDirection::X => p * Float3::new(0.0, 1.0, 1.0),
                WaveRingsDirection::Y => p * Float3::new(1.0, 0.0, 1.0),
                WaveRingsDirection::Z => p * Float3::new(1.0, 1.0, 0.0),
                WaveRingsDirection::Spherical => p,
            };
            rp.length() * 20.0
        }
    };

    n += w.phase;

    if w.distortion != 0.0 {
        let detail = w.detail.clamp(0.0, crate::fractal::MAX_DETAIL);
        let distortion = fbm(p * w.detail_scale, detail, w.detail_roughness, 2.0, true);
        n += w.distortion * (distortion * 2.0 - 1.0);
    }

    match w.profile {
        WaveProfile::Sine => 0.5 + 0.5 * (n - FRAC_PI_2).sin(),
        WaveProfile::Saw => {
            let n = n / (2.0 * PI);
            n - n.floor()
        }
        WaveProfile::Triangle => {
            let n = n / (2.0 * PI);
            (n - (n + 0.5).floor()).abs() * 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(profile: WaveProfile) -> WaveParams {
        WaveParams {
            kind: WaveType::Bands,
            bands_direction: WaveBandsDirection::X,
            rings_direction: WaveRingsDirection::Spherical,
            profile,
            distortion: 0.0,
            detail: 2.0,
            detail_scale: 1.0,
            detail_roughness: 0.5,
            phase: 0.0,
        }
    }

    #[test]
    fn test_profiles_in_unit_range() {
        for profile in WaveProfile::ALL {
            let mut w = params(*profile);
            w.distortion = 3.0;
            for i in 0..100 {
                let v = wave(Float3::new(i as f32 * 0.031, 0.2, 0.7), &w);
                assert!((0.0..=1.0).contains(&v), "{} {v}", profile.name());
            }
        }
    }

    #[test]
    fn test_sine_band_starts_dark() {
        let v = wave(Float3::new(-0.000_001, 0.0, 0.0), &params(WaveProfile::Sine));
        assert!(v < 1e-4);
    }

    #[test]
    fn test_rings_ignore_axis() {
        let mut w = params(WaveProfile::Sine);
        w.kind = WaveType::Rings;
        w.rings_direction = WaveRingsDirection::Z;
        let a = wave(Float3::new(0.2, 0.1, 0.0), &w);
        let b = wave(Float3::new(0.2, 0.1, 5.0), &w);
        assert!((a - b).abs() < 1e-5);
    }
}
