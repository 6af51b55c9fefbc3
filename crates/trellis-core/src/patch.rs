//! Patches produced by reconciliation
//!
//! A patch is plain data: the kind of edit, the parent context it applies
//! under, and the paths of the nodes involved. Paths into the previous
//! generation name nodes being removed or moved; paths into the next
//! generation name nodes being added.

use std::fmt;
use std::ops::AddAssign;

use crate::{NodeId, NodePath};

/// Which generation a path points into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Generation {
    Previous,
    Next,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Previous => f.write_str("previous"),
            Generation::Next => f.write_str("next"),
        }
    }
}

/// Patch kind, without payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchKind {
    Add,
    Remove,
    Move,
    Replace,
}

/// One structural edit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch<C> {
    /// Insert a next-generation node, before `hint` if given
    Add {
        parent: C,
        id: NodeId,
        node: NodePath,
        hint: Option<C>,
    },
    /// Detach a previous-generation node
    Remove { parent: C, id: NodeId, node: NodePath },
    /// Move a previous-generation node to the end of its siblings
    Move { parent: C, id: NodeId, node: NodePath },
    /// Put a next-generation node in place of a previous-generation node
    Replace {
        parent: C,
        old_id: NodeId,
        old: NodePath,
        new_id: NodeId,
        new: NodePath,
    },
}

impl<C> Patch<C> {
    pub fn kind(&self) -> PatchKind {
        match self {
            Patch::Add { .. } => PatchKind::Add,
            Patch::Remove { .. } => PatchKind::Remove,
            Patch::Move { .. } => PatchKind::Move,
            Patch::Replace { .. } => PatchKind::Replace,
        }
    }

    pub fn parent(&self) -> &C {
        match self {
            Patch::Add { parent, .. }
            | Patch::Remove { parent, .. }
            | Patch::Move { parent, .. }
            | Patch::Replace { parent, .. } => parent,
        }
    }

    /// Identity of the node the patch acts on (the old node for replaces)
    pub fn id(&self) -> NodeId {
        match self {
            Patch::Add { id, .. } | Patch::Remove { id, .. } | Patch::Move { id, .. } => *id,
            Patch::Replace { old_id, .. } => *old_id,
        }
    }

    /// Depth of the edited sibling list; 1 for the root sequence
    pub fn depth(&self) -> usize {
        match self {
            Patch::Add { node, .. } | Patch::Remove { node, .. } | Patch::Move { node, .. } => {
                node.depth()
            }
            Patch::Replace { old, .. } => old.depth(),
        }
    }
}

impl<C> fmt::Display for Patch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Add { id, node, hint, .. } => {
                write!(f, "add {} at {}", id, node)?;
                if hint.is_some() {
                    f.write_str(" (hinted)")?;
                }
                Ok(())
            }
            Patch::Remove { id, node, .. } => write!(f, "remove {} at {}", id, node),
            Patch::Move { id, node, .. } => write!(f, "move {} at {}", id, node),
            Patch::Replace {
                old_id,
                old,
                new_id,
                new,
                ..
            } => write!(f, "replace {} at {} with {} at {}", old_id, old, new_id, new),
        }
    }
}

/// Patch counts by kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub added: u32,
    pub removed: u32,
    pub moved: u32,
    pub replaced: u32,
}

impl PatchSummary {
    pub fn record(&mut self, kind: PatchKind) {
        match kind {
            PatchKind::Add => self.added += 1,
            PatchKind::Remove => self.removed += 1,
            PatchKind::Move => self.moved += 1,
            PatchKind::Replace => self.replaced += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.added + self.removed + self.moved + self.replaced
    }
}

impl AddAssign for PatchSummary {
    fn add_assign(&mut self, other: PatchSummary) {
        self.added += other.added;
        self.removed += other.removed;
        self.moved += other.moved;
        self.replaced += other.replaced;
    }
}

impl fmt::Display for PatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} -{} ~{} ={}",
            self.added, self.removed, self.moved, self.replaced
        )
    }
}

/// Ordered patches, plus the paths of the sibling lists currently being
/// reconciled.
///
/// Must be applied front to back: later patches assume earlier ones ran.
#[derive(Clone, Debug)]
pub struct PatchList<C> {
    patches: Vec<Patch<C>>,
    prev_path: NodePath,
    next_path: NodePath,
}

impl<C> PatchList<C> {
    pub fn new() -> Self {
        PatchList {
            patches: Vec::new(),
            prev_path: NodePath::root(),
            next_path: NodePath::root(),
        }
    }

    pub fn push(&mut self, patch: Patch<C>) {
        self.patches.push(patch);
    }

    /// Path of the `index`-th previous-generation node in the current list
    pub fn prev_path(&self, index: usize) -> NodePath {
        self.prev_path.child(index)
    }

    /// Path of the `index`-th next-generation node in the current list
    pub fn next_path(&self, index: usize) -> NodePath {
        self.next_path.child(index)
    }

    /// Run `f` with the matched pair at (`prev_index`, `next_index`) as the
    /// current parent. Paths are restored when `f` returns.
    pub fn descend<R>(
        &mut self,
        prev_index: usize,
        next_index: usize,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.prev_path.push(prev_index);
        self.next_path.push(next_index);
        let result = f(self);
        self.next_path.pop();
        self.prev_path.pop();
        result
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch<C>> {
        self.patches.iter()
    }

    pub fn as_slice(&self) -> &[Patch<C>] {
        &self.patches
    }

    pub fn into_vec(self) -> Vec<Patch<C>> {
        self.patches
    }

    pub fn summary(&self) -> PatchSummary {
        let mut summary = PatchSummary::default();
        for patch in &self.patches {
            summary.record(patch.kind());
        }
        summary
    }
}

impl<C> Default for PatchList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> IntoIterator for PatchList<C> {
    type Item = Patch<C>;
    type IntoIter = std::vec::IntoIter<Patch<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.into_iter()
    }
}

impl<'a, C> IntoIterator for &'a PatchList<C> {
    type Item = &'a Patch<C>;
    type IntoIter = std::slice::Iter<'a, Patch<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
