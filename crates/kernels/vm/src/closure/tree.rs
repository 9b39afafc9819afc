use umbra_foundation::Float3;

use super::{ClosureArena, ClosureKind, ClosureNode, ClosureParams, ClosureRef};

/// A leaf with every enclosing `Scale` folded into its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedClosure {
    pub kind: ClosureKind,
    pub weight: Float3,
    pub params: ClosureParams,
}

/// Read-only view of a closure tree.
#[derive(Debug, Clone, Copy)]
pub struct ClosureTree<'a> {
    arena: &'a ClosureArena,
    root: Option<ClosureRef>,
}

impl<'a> ClosureTree<'a> {
    pub fn new(arena: &'a ClosureArena, root: Option<ClosureRef>) -> Self {
        Self { arena, root }
    }

    pub fn root(&self) -> Option<ClosureRef> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Flatten into weighted leaves, left to right.
    ///
    /// Dangling handles are skipped; they can only come from a tree built in a
    /// different arena.
    pub fn flatten(&self) -> Vec<WeightedClosure> {
        let mut leaves = Vec::new();
        let mut pending: Vec<(ClosureRef, Float3)> =
            self.root.map(|r| (r, Float3::ONE)).into_iter().collect();

        while let Some((node, scale)) = pending.pop() {
            match self.arena.get(node) {
                Some(ClosureNode::Leaf {
                    kind,
                    weight,
                    params,
                }) => leaves.push(WeightedClosure {
                    kind: *kind,
                    weight: *weight * scale,
                    params: *params,
                }),
                Some(ClosureNode::Scale { child, weight }) => {
                    pending.push((*child, *weight * scale))
                }
                Some(ClosureNode::Add { a, b }) => {
                    pending.push((*b, scale));
                    pending.push((*a, scale));
                }
                None => {}
            }
        }
        leaves
    }

    /// Summed weight of every leaf matching `filter`.
    pub fn total_weight(&self, filter: impl Fn(ClosureKind) -> bool) -> Float3 {
        self.flatten()
            .iter()
            .filter(|leaf| filter(leaf.kind))
            .fold(Float3::ZERO, |acc, leaf| acc + leaf.weight)
    }
}
