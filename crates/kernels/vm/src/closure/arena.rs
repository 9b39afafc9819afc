//! Bump allocator for closure nodes.

use umbra_foundation::Float3;

use super::{ClosureKind, ClosureNode, ClosureParams, ClosureRef, ClosureTree};

/// Alignment of every closure node.
pub const NODE_ALIGN: usize = 16;
/// Largest alignment [`ClosureArena::allocate`] accepts.
pub const MAX_ALIGN: usize = 64;

const LEAF_BYTES: usize = 32;
const SCALE_BYTES: usize = 32;
const ADD_BYTES: usize = 16;

/// Smallest usable arena: one leaf with the largest parameter block.
pub const MIN_ARENA_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("requested {requested} bytes with {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },

    #[error("alignment {alignment} is not a power of two up to {MAX_ALIGN}")]
    InvalidAlignment { alignment: usize },
}

/// Byte-budgeted node storage for one invocation.
///
/// `allocate` only moves a cursor forward; nothing is freed until
/// [`reset`](Self::reset) starts the next invocation. Node storage itself is
/// a `Vec` whose allocation is reused across resets.
#[derive(Debug, Clone)]
pub struct ClosureArena {
    capacity: usize,
    cursor: usize,
    nodes: Vec<ClosureNode>,
}

impl ClosureArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cursor: 0,
            nodes: Vec::with_capacity(capacity / LEAF_BYTES),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.nodes.clear();
    }

    /// Reserve `size` bytes at the next `alignment` boundary and return the
    /// byte offset.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidAlignment`] for a zero, non-power-of-two or
    /// oversized alignment; [`ArenaError::Exhausted`] when the budget can't
    /// hold the request. A failed allocation leaves the cursor unchanged.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> Result<usize, ArenaError> {
        if !alignment.is_power_of_two() || alignment > MAX_ALIGN {
            return Err(ArenaError::InvalidAlignment { alignment });
        }
        let exhausted = ArenaError::Exhausted {
            requested: size,
            remaining: self.remaining(),
        };
        let start = self
            .cursor
            .checked_next_multiple_of(alignment)
            .ok_or(exhausted.clone())?;
        let end = start.checked_add(size).ok_or(exhausted.clone())?;
        if end > self.capacity {
            return Err(exhausted);
        }
        self.cursor = end;
        Ok(start)
    }

    fn push(&mut self, size: usize, node: ClosureNode) -> Result<ClosureRef, ArenaError> {
        self.allocate(size, NODE_ALIGN)?;
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        Ok(ClosureRef(index))
    }

    pub fn get(&self, node: ClosureRef) -> Option<&ClosureNode> {
        self.nodes.get(node.index())
    }

    /// Leaf with identity weight and an `extra_size`-byte parameter block.
    pub fn allocate_leaf(
        &mut self,
        kind: ClosureKind,
        extra_size: usize,
        params: ClosureParams,
    ) -> Result<ClosureRef, ArenaError> {
        self.allocate_weighted_leaf(kind, extra_size, Float3::ONE, params)
    }

    pub fn allocate_weighted_leaf(
        &mut self,
        kind: ClosureKind,
        extra_size: usize,
        weight: Float3,
        params: ClosureParams,
    ) -> Result<ClosureRef, ArenaError> {
        self.push(
            LEAF_BYTES + extra_size,
            ClosureNode::Leaf {
                kind,
                weight,
                params,
            },
        )
    }

    /// `child * weight`.
    ///
    /// Identity weight returns `child` itself; zero weight or a missing child
    /// yields no closure.
    pub fn scale_by_color(
        &mut self,
        child: Option<ClosureRef>,
        weight: Float3,
    ) -> Result<Option<ClosureRef>, ArenaError> {
        let Some(child) = child else {
            return Ok(None);
        };
        if weight.is_zero() {
            return Ok(None);
        }
        if weight == Float3::ONE {
            return Ok(Some(child));
        }
        self.push(SCALE_BYTES, ClosureNode::Scale { child, weight })
            .map(Some)
    }

    pub fn scale_by_scalar(
        &mut self,
        child: Option<ClosureRef>,
        weight: f32,
    ) -> Result<Option<ClosureRef>, ArenaError> {
        self.scale_by_color(child, Float3::splat(weight))
    }

    /// `a + b`, collapsing to the other operand when one is missing.
    pub fn combine(
        &mut self,
        a: Option<ClosureRef>,
        b: Option<ClosureRef>,
    ) -> Result<Option<ClosureRef>, ArenaError> {
        match (a, b) {
            (None, other) | (other, None) => Ok(other),
            (Some(a), Some(b)) => self.push(ADD_BYTES, ClosureNode::Add { a, b }).map(Some),
        }
    }

    /// View the tree rooted at `root`.
    pub fn tree(&self, root: Option<ClosureRef>) -> ClosureTree<'_> {
        ClosureTree::new(self, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(arena: &mut ClosureArena, kind: ClosureKind) -> Option<ClosureRef> {
        Some(
            arena
                .allocate_leaf(kind, kind.param_bytes(), ClosureParams::default())
                .unwrap(),
        )
    }

    #[test]
    fn test_allocate_aligns_and_advances() {
        let mut arena = ClosureArena::new(128);
        assert_eq!(arena.allocate(3, 1).unwrap(), 0);
        assert_eq!(arena.allocate(8, 8).unwrap(), 8);
        assert_eq!(arena.used(), 16);
        assert_eq!(arena.allocate(4, 64).unwrap(), 64);
    }

    #[test]
    fn test_invalid_alignment() {
        let mut arena = ClosureArena::new(128);
        assert_eq!(
            arena.allocate(4, 3),
            Err(ArenaError::InvalidAlignment { alignment: 3 })
        );
        assert!(arena.allocate(4, 0).is_err());
        assert!(arena.allocate(4, 128).is_err());
    }

    #[test]
    fn test_overflow_is_reported_and_leaves_cursor() {
        let mut arena = ClosureArena::new(64);
        arena.allocate(40, 16).unwrap();
        assert_eq!(
            arena.allocate(40, 16),
            Err(ArenaError::Exhausted {
                requested: 40,
                remaining: 24
            })
        );
        assert_eq!(arena.used(), 40);
    }

    #[test]
    fn test_scale_identities() {
        let mut arena = ClosureArena::new(1024);
        let c = leaf(&mut arena, ClosureKind::Diffuse);
        assert_eq!(arena.scale_by_scalar(c, 1.0).unwrap(), c);
        assert_eq!(arena.scale_by_scalar(c, 0.0).unwrap(), None);
        assert_eq!(arena.scale_by_color(None, Float3::splat(0.5)).unwrap(), None);
        assert_eq!(arena.len(), 1);

        let scaled = arena.scale_by_scalar(c, 0.5).unwrap();
        assert!(matches!(
            scaled.and_then(|r| arena.get(r)),
            Some(ClosureNode::Scale { .. })
        ));
    }

    #[test]
    fn test_combine_identities() {
        let mut arena = ClosureArena::new(1024);
        let x = leaf(&mut arena, ClosureKind::GlossyGgx);
        assert_eq!(arena.combine(None, x).unwrap(), x);
        assert_eq!(arena.combine(x, None).unwrap(), x);
        assert_eq!(arena.combine(None, None).unwrap(), None);
        let y = leaf(&mut arena, ClosureKind::Emission);
        let sum = arena.combine(x, y).unwrap().unwrap();
        assert!(matches!(arena.get(sum), Some(ClosureNode::Add { .. })));
    }

    #[test]
    fn test_reset_reclaims_budget() {
        let mut arena = ClosureArena::new(64);
        leaf(&mut arena, ClosureKind::Refraction);
        assert!(arena
            .allocate_leaf(ClosureKind::Refraction, 20, ClosureParams::default())
            .is_err());
        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.remaining(), 64);
    }
}
