//! Per-invocation float register file.

use umbra_foundation::Float3;

use crate::encoding::is_connected;

/// Fixed-capacity float registers addressed by byte offsets.
///
/// A vector occupies three consecutive registers. Out-of-range offsets are
/// a broken program: they trip a debug assertion, and release builds clamp
/// them to the last register.
#[derive(Debug, Clone)]
pub struct Stack {
    data: Vec<f32>,
}

impl Stack {
    pub fn new(capacity: u32) -> Self {
        Self {
            data: vec![0.0; capacity.max(1) as usize],
        }
    }

    pub fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    /// Zero every register.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn index(&self, offset: u32) -> usize {
        let len = self.data.len();
        debug_assert!(
            (offset as usize) < len,
            "register {offset} out of range ({len} registers)"
        );
        (offset as usize).min(len - 1)
    }

    #[inline]
    pub fn load_scalar(&self, offset: u32) -> f32 {
        self.data[self.index(offset)]
    }

    #[inline]
    pub fn load_vector(&self, offset: u32) -> Float3 {
        Float3::new(
            self.data[self.index(offset)],
            self.data[self.index(offset + 1)],
            self.data[self.index(offset + 2)],
        )
    }

    /// Load `offset`, or `default` when the input is not connected.
    #[inline]
    pub fn load_scalar_or(&self, offset: u32, default: f32) -> f32 {
        if is_connected(offset) {
            self.load_scalar(offset)
        } else {
            default
        }
    }

    #[inline]
    pub fn load_vector_or(&self, offset: u32, default: Float3) -> Float3 {
        if is_connected(offset) {
            self.load_vector(offset)
        } else {
            default
        }
    }

    /// Store to `offset` unless the output is not requested.
    #[inline]
    pub fn store_scalar(&mut self, offset: u32, value: f32) {
        if is_connected(offset) {
            let i = self.index(offset);
            self.data[i] = value;
        }
    }

    #[inline]
    pub fn store_vector(&mut self, offset: u32, value: Float3) {
        if is_connected(offset) {
            let i = self.index(offset);
            self.data[i] = value.x;
            let i = self.index(offset + 1);
            self.data[i] = value.y;
            let i = self.index(offset + 2);
            self.data[i] = value.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::UNCONNECTED;

    #[test]
    fn test_vectors_span_three_registers() {
        let mut stack = Stack::new(16);
        stack.store_vector(4, Float3::new(1.0, 2.0, 3.0));
        assert_eq!(stack.load_scalar(5), 2.0);
        assert_eq!(stack.load_vector(4), Float3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_unconnected_uses_default_and_skips_store() {
        let mut stack = Stack::new(8);
        assert_eq!(stack.load_scalar_or(UNCONNECTED, 0.25), 0.25);
        assert_eq!(stack.load_vector_or(UNCONNECTED, Float3::ONE), Float3::ONE);
        stack.store_scalar(UNCONNECTED, 9.0);
        assert!(stack.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_reset_zeroes() {
        let mut stack = Stack::new(4);
        stack.store_scalar(3, 1.0);
        stack.reset();
        assert_eq!(stack.load_scalar(3), 0.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_asserts_in_debug() {
        let stack = Stack::new(4);
        stack.load_scalar(4);
    }
}
