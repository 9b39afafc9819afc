//! Lattice hashing for procedural textures.
//!
//! Bob Jenkins' lookup3 `mix`/`final` rounds over 1 to 4 unsigned keys, plus
//! helpers that hash float bit patterns into uniform floats in `[0, 1]`.
//! These are bit-exact on every target: noise and Voronoi cell positions
//! depend on them, so any change here changes every rendered texture.

use crate::vector::{Float2, Float3, Float4};

const SEED: u32 = 0xdeadbeef;

#[inline(always)]
const fn rot(x: u32, k: u32) -> u32 {
    x.rotate_left(k)
}

#[inline(always)]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= rot(*c, 4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= rot(*a, 6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= rot(*b, 8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c);
    *a ^= rot(*c, 16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= rot(*a, 19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= rot(*b, 4);
    *b = b.wrapping_add(*a);
}

#[inline(always)]
fn finalize(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(rot(*b, 14));
    *a ^= *c;
    *a = a.wrapping_sub(rot(*c, 11));
    *b ^= *a;
    *b = b.wrapping_sub(rot(*a, 25));
    *c ^= *b;
    *c = c.wrapping_sub(rot(*b, 16));
    *a ^= *c;
    *a = a.wrapping_sub(rot(*c, 4));
    *b ^= *a;
    *b = b.wrapping_sub(rot(*a, 14));
    *c ^= *b;
    *c = c.wrapping_sub(rot(*b, 24));
}

#[inline(always)]
const fn init(len: u32) -> u32 {
    SEED.wrapping_add(len << 2).wrapping_add(13)
}

#[inline]
pub fn hash_uint(kx: u32) -> u32 {
    let (mut a, mut b, mut c) = (init(1), init(1), init(1));
    a = a.wrapping_add(kx);
    finalize(&mut a, &mut b, &mut c);
    c
}

#[inline]
pub fn hash_uint2(kx: u32, ky: u32) -> u32 {
    let (mut a, mut b, mut c) = (init(2), init(2), init(2));
    b = b.wrapping_add(ky);
    a = a.wrapping_add(kx);
    finalize(&mut a, &mut b, &mut c);
    c
}

#[inline]
pub fn hash_uint3(kx: u32, ky: u32, kz: u32) -> u32 {
    let (mut a, mut b, mut c) = (init(3), init(3), init(3));
    c = c.wrapping_add(kz);
    b = b.wrapping_add(ky);
    a = a.wrapping_add(kx);
    finalize(&mut a, &mut b, &mut c);
    c
}

#[inline]
pub fn hash_uint4(kx: u32, ky: u32, kz: u32, kw: u32) -> u32 {
    let (mut a, mut b, mut c) = (init(4), init(4), init(4));
    a = a.wrapping_add(kx);
    b = b.wrapping_add(ky);
    c = c.wrapping_add(kz);
    mix(&mut a, &mut b, &mut c);
    a = a.wrapping_add(kw);
    finalize(&mut a, &mut b, &mut c);
    c
}

/// Map a hash onto `[0, 1]`, both ends inclusive.
#[inline]
pub fn uint_to_float_incl(n: u32) -> f32 {
    n as f32 * (1.0 / u32::MAX as f32)
}

#[inline]
pub fn hash_uint_to_float(kx: u32) -> f32 {
    uint_to_float_incl(hash_uint(kx))
}

#[inline]
pub fn hash_uint2_to_float(kx: u32, ky: u32) -> f32 {
    uint_to_float_incl(hash_uint2(kx, ky))
}

#[inline]
pub fn hash_uint3_to_float(kx: u32, ky: u32, kz: u32) -> f32 {
    uint_to_float_incl(hash_uint3(kx, ky, kz))
}

#[inline]
pub fn hash_uint4_to_float(kx: u32, ky: u32, kz: u32, kw: u32) -> f32 {
    uint_to_float_incl(hash_uint4(kx, ky, kz, kw))
}

#[inline]
pub fn hash_float_to_float(k: f32) -> f32 {
    hash_uint_to_float(k.to_bits())
}

#[inline]
pub fn hash_float2_to_float(k: Float2) -> f32 {
    hash_uint2_to_float(k.x.to_bits(), k.y.to_bits())
}

#[inline]
pub fn hash_float3_to_float(k: Float3) -> f32 {
    hash_uint3_to_float(k.x.to_bits(), k.y.to_bits(), k.z.to_bits())
}

#[inline]
pub fn hash_float4_to_float(k: Float4) -> f32 {
    hash_uint4_to_float(k.x.to_bits(), k.y.to_bits(), k.z.to_bits(), k.w.to_bits())
}

pub fn hash_float2_to_float2(k: Float2) -> Float2 {
    Float2::new(
        hash_float2_to_float(k),
        hash_float3_to_float(Float3::new(k.x, k.y, 1.0)),
    )
}

pub fn hash_float3_to_float3(k: Float3) -> Float3 {
    Float3::new(
        hash_float3_to_float(k),
        hash_float4_to_float(Float4::new(k.x, k.y, k.z, 1.0)),
        hash_float4_to_float(Float4::new(k.x, k.y, k.z, 2.0)),
    )
}

pub fn hash_float4_to_float4(k: Float4) -> Float4 {
    Float4::new(
        hash_float4_to_float(k),
        hash_float4_to_float(Float4::new(k.w, k.x, k.y, k.z)),
        hash_float4_to_float(Float4::new(k.z, k.w, k.x, k.y)),
        hash_float4_to_float(Float4::new(k.y, k.z, k.w, k.x)),
    )
}

pub fn hash_float_to_float3(k: f32) -> Float3 {
    Float3::new(
        hash_float_to_float(k),
        hash_float2_to_float(Float2::new(k, 1.0)),
        hash_float2_to_float(Float2::new(k, 2.0)),
    )
}

pub fn hash_float2_to_float3(k: Float2) -> Float3 {
    Float3::new(
        hash_float2_to_float(k),
        hash_float3_to_float(Float3::new(k.x, k.y, 1.0)),
        hash_float3_to_float(Float3::new(k.x, k.y, 2.0)),
    )
}

pub fn hash_float4_to_float3(k: Float4) -> Float3 {
    Float3::new(
        hash_float4_to_float(k),
        hash_float4_to_float(Float4::new(k.z, k.x, k.w, k.y)),
        hash_float4_to_float(Float4::new(k.w, k.z, k.y, k.x)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_uint(42), hash_uint(42));
        assert_eq!(hash_uint4(1, 2, 3, 4), hash_uint4(1, 2, 3, 4));
    }

    #[test]
    fn test_hash_key_order_matters() {
        assert_ne!(hash_uint2(1, 2), hash_uint2(2, 1));
        assert_ne!(hash_uint3(1, 2, 3), hash_uint3(3, 2, 1));
    }

    #[test]
    fn test_arity_changes_hash() {
        assert_ne!(hash_uint(0), hash_uint2(0, 0));
        assert_ne!(hash_uint2(0, 0), hash_uint3(0, 0, 0));
    }

    #[test]
    fn test_float_hash_in_unit_range() {
        for i in 0..256 {
            let v = hash_float3_to_float3(Float3::new(i as f32, -(i as f32) * 0.5, 3.0));
            for c in [v.x, v.y, v.z] {
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }

    #[test]
    fn test_known_values() {
        // Texture output depends on these exact bits.
        assert_eq!(hash_uint(0), 2501500005);
        assert_eq!(hash_uint(1), 1255655072);
        assert_eq!(hash_uint(42), 778167589);
        assert_eq!(hash_uint2(1, 2), 272092061);
        assert_eq!(hash_uint3(1, 2, 3), 3100736010);
        assert_eq!(hash_uint3(u32::MAX, 0, 7), 2981886133);
        assert_eq!(hash_uint4(1, 2, 3, 4), 92593857);
    }

    #[test]
    fn test_known_float_hashes() {
        let close = |a: Float3, b: Float3| (a - b).abs().max_component() < 1e-6;
        let v = hash_float3_to_float3(Float3::new(1.0, -2.0, 3.0));
        assert!(close(v, Float3::new(0.258_374_4, 0.019_448_392, 0.473_835_23)), "{v:?}");
        let v = hash_float3_to_float3(Float3::ZERO);
        assert!(close(v, Float3::new(0.611_067_65, 0.102_912_73, 0.865_152_7)), "{v:?}");
    }

    #[test]
    fn test_uint_to_float_endpoints() {
        assert_eq!(uint_to_float_incl(0), 0.0);
        assert_eq!(uint_to_float_incl(u32::MAX), 1.0);
    }
}
