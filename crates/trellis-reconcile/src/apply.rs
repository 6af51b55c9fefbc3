//! Patch application
//!
//! Resolves each patch's node paths against the two generations and calls
//! the matching [`TreeNode`] method. Patches run strictly in order; the first
//! failure stops the run and nothing already applied is undone.

use tracing::{debug, warn};
use trellis_core::{
    Generation, NodePath, Patch, PatchList, PatchSummary, TreeNode, TrellisError, TrellisResult,
};

/// Apply `patches` to `target`. Returns the counts of applied patches.
pub fn apply<N: TreeNode>(
    patches: &PatchList<N::Context>,
    target: &mut N::Target,
    prev: &[N],
    next: &mut [N],
) -> TrellisResult<PatchSummary> {
    let mut applied = PatchSummary::default();

    for patch in patches {
        if let Err(err) = apply_one(patch, target, prev, next) {
            warn!(
                %patch,
                error = %err,
                skipped = patches.len() - applied.total() as usize - 1,
                "patch failed"
            );
            return Err(err);
        }
        applied.record(patch.kind());
    }

    debug!(applied = %applied, "patches applied");
    Ok(applied)
}

fn apply_one<N: TreeNode>(
    patch: &Patch<N::Context>,
    target: &mut N::Target,
    prev: &[N],
    next: &mut [N],
) -> TrellisResult<()> {
    match patch {
        Patch::Add {
            parent, node, hint, ..
        } => resolve_mut(next, node)?.add_to(target, parent, hint.as_ref()),
        Patch::Remove { parent, node, .. } => resolve(prev, node)?.remove_from(target, parent),
        Patch::Move { parent, node, .. } => resolve(prev, node)?.move_to(target, parent),
        Patch::Replace {
            parent, old, new, ..
        } => {
            let old = resolve(prev, old)?;
            let new = resolve_mut(next, new)?;
            old.replace_from(target, parent, new)
        }
    }
}

/// Previous-generation node at `path`
pub fn resolve<'a, N: TreeNode>(roots: &'a [N], path: &NodePath) -> TrellisResult<&'a N> {
    let not_found = || TrellisError::NodeNotFound {
        generation: Generation::Previous,
        path: path.clone(),
    };

    let (first, rest) = path.indices().split_first().ok_or_else(not_found)?;
    let mut node = roots.get(*first).ok_or_else(not_found)?;
    for &index in rest {
        node = node.children().get(index).ok_or_else(not_found)?;
    }
    Ok(node)
}

/// Next-generation node at `path`
pub fn resolve_mut<'a, N: TreeNode>(
    roots: &'a mut [N],
    path: &NodePath,
) -> TrellisResult<&'a mut N> {
    let not_found = || TrellisError::NodeNotFound {
        generation: Generation::Next,
        path: path.clone(),
    };

    let (first, rest) = path.indices().split_first().ok_or_else(not_found)?;
    let mut node = roots.get_mut(*first).ok_or_else(not_found)?;
    for &index in rest {
        node = node.children_mut().get_mut(index).ok_or_else(not_found)?;
    }
    Ok(node)
}
