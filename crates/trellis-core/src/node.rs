//! Node capability
//!
//! [`TreeNode`] is the whole boundary between Trellis and an embedding
//! application. The builder uses it to attach children, the reconciliation
//! engine uses it to read identities and move contexts between generations,
//! and the patch applier uses it to edit the real structure.

use std::fmt;

use crate::{NodeId, PatchList, TrellisResult};

/// A node that can be built into a tree and reconciled against another
/// generation of itself.
///
/// Two nodes with the same [`id`](TreeNode::id) are the same logical node,
/// whatever else differs between them.
pub trait TreeNode: Sized {
    /// Opaque handle into the structure the tree mirrors
    type Context: Clone + fmt::Debug;
    /// The structure patches are applied to
    type Target: ?Sized;

    /// Identity assigned at construction
    fn id(&self) -> NodeId;

    fn context(&self) -> &Self::Context;

    /// Overwrite the context. Reconciliation calls this once per matched
    /// node to carry the previous generation's context forward.
    fn set_context(&mut self, context: Self::Context);

    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> &mut Vec<Self>;

    /// Append `self` to `parent`'s children
    fn register(self, parent: &mut Self) {
        parent.children_mut().push(self);
    }

    /// Insert this node's counterpart under `parent`, before `hint` when one
    /// is given and at the end otherwise.
    fn add_to(
        &mut self,
        target: &mut Self::Target,
        parent: &Self::Context,
        hint: Option<&Self::Context>,
    ) -> TrellisResult<()>;

    /// Detach this node's counterpart from `parent`
    fn remove_from(&self, target: &mut Self::Target, parent: &Self::Context) -> TrellisResult<()>;

    /// Move this node's counterpart to the end of `parent`'s children
    fn move_to(&self, target: &mut Self::Target, parent: &Self::Context) -> TrellisResult<()>;

    /// Put `next` where this node is, then remove this node
    fn replace_from(
        &self,
        target: &mut Self::Target,
        parent: &Self::Context,
        next: &mut Self,
    ) -> TrellisResult<()> {
        next.add_to(target, parent, Some(self.context()))?;
        self.remove_from(target, parent)
    }

    /// Reconcile this node's contents against its next generation.
    ///
    /// Leaves do nothing. Containers reconcile their children here.
    fn diff(&self, patches: &mut PatchList<Self::Context>, next: &mut Self) {
        let _ = (patches, next);
    }
}
