//! Stable 64-bit FNV-1a hashing for interned names.
//!
//! Coordinate space names and attribute names are compared as 64-bit hashes
//! computed at build time. The hash must be identical on every target, so this
//! is a plain `const fn` FNV-1a with no platform-dependent inputs.
//!
//! NOTE: FNV-1a is **not** cryptographically secure. It is only used to turn a
//! small fixed vocabulary into integer keys.

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Mix bytes into an existing FNV-1a 64-bit hash state.
///
/// For each byte: XOR it into the hash, then multiply by the FNV prime.
///
/// # Example
/// ```
/// use umbra_foundation::stable_hash::{fnv1a64_mix, FNV1A_OFFSET_BASIS_64};
///
/// let hash = fnv1a64_mix(FNV1A_OFFSET_BASIS_64, b"geom:");
/// let hash = fnv1a64_mix(hash, b"uv");
/// assert_eq!(hash, umbra_foundation::fnv1a64_str("geom:uv"));
/// ```
#[inline]
pub const fn fnv1a64_mix(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    fnv1a64_mix(FNV1A_OFFSET_BASIS_64, bytes)
}

/// Hash a UTF-8 string with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64_str(s: &str) -> u64 {
    fnv1a64(s.as_bytes())
}
