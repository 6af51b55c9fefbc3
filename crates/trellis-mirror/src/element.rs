//! Element nodes

use std::hash::{Hash, Hasher};

use trellis_builder::Scope;
use trellis_core::{NodeId, PatchList, TreeNode, TrellisError, TrellisResult};
use trellis_reconcile::reconcile_children;

use crate::{ElementHandle, Mirror, Snapshot};

/// Declared element; its context is the mirror element it stands for,
/// `None` until mounted.
///
/// Equality and hashing go by identity only.
#[derive(Clone, Debug)]
pub struct ElementNode {
    id: NodeId,
    tag: String,
    handle: Option<ElementHandle>,
    children: Vec<ElementNode>,
}

impl ElementNode {
    pub fn new(tag: &str, id: NodeId) -> Self {
        ElementNode {
            id,
            tag: tag.to_string(),
            handle: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Node factory for a [`TreeBuilder`](trellis_builder::TreeBuilder):
    /// the declared name becomes the tag
    pub fn factory(name: &str, id: NodeId, _scope: &Scope) -> Self {
        Self::new(name, id)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn handle(&self) -> Option<ElementHandle> {
        self.handle
    }

    /// Structure this node expects the mirror to hold
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tag: self.tag.clone(),
            id: self.id,
            children: self.children.iter().map(ElementNode::snapshot).collect(),
        }
    }

    fn mounted(&self) -> TrellisResult<ElementHandle> {
        self.handle.ok_or(TrellisError::Detached(self.id))
    }
}

impl PartialEq for ElementNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ElementNode {}

impl Hash for ElementNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Parent element, failing when the parent was never mounted
fn parent_handle(parent: &Option<ElementHandle>, child: NodeId) -> TrellisResult<ElementHandle> {
    parent.ok_or_else(|| TrellisError::Target(format!("parent of {} is not mounted", child)))
}

impl TreeNode for ElementNode {
    type Context = Option<ElementHandle>;
    type Target = Mirror;

    fn id(&self) -> NodeId {
        self.id
    }

    fn context(&self) -> &Option<ElementHandle> {
        &self.handle
    }

    fn set_context(&mut self, context: Option<ElementHandle>) {
        self.handle = context;
    }

    fn children(&self) -> &[ElementNode] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<ElementNode> {
        &mut self.children
    }

    fn add_to(
        &mut self,
        mirror: &mut Mirror,
        parent: &Option<ElementHandle>,
        hint: Option<&Option<ElementHandle>>,
    ) -> TrellisResult<()> {
        let parent = parent_handle(parent, self.id)?;
        let handle = mirror.create(&self.tag, self.id);
        if let Err(err) = mirror.insert(parent, handle, hint.copied().flatten()) {
            mirror.discard(handle)?;
            return Err(err.into());
        }
        self.handle = Some(handle);

        let mount_point = self.handle;
        for child in &mut self.children {
            child.add_to(mirror, &mount_point, None)?;
        }
        Ok(())
    }

    fn remove_from(
        &self,
        mirror: &mut Mirror,
        parent: &Option<ElementHandle>,
    ) -> TrellisResult<()> {
        let parent = parent_handle(parent, self.id)?;
        mirror.remove(parent, self.mounted()?)?;
        Ok(())
    }

    fn move_to(&self, mirror: &mut Mirror, parent: &Option<ElementHandle>) -> TrellisResult<()> {
        let parent = parent_handle(parent, self.id)?;
        mirror.move_to_end(parent, self.mounted()?)?;
        Ok(())
    }

    fn diff(&self, patches: &mut PatchList<Option<ElementHandle>>, next: &mut Self) {
        reconcile_children(patches, self, next);
    }
}

impl Mirror {
    /// Whether each of `roots`, all the way down, is bound to the element at
    /// its position with a matching tag and identity.
    ///
    /// Reconciliation leaves a moved node's children unbound, so this can be
    /// false after a successful apply.
    pub fn is_bound_to(&self, roots: &[ElementNode]) -> bool {
        self.bound_under(self.root(), roots)
    }

    fn bound_under(&self, parent: ElementHandle, nodes: &[ElementNode]) -> bool {
        self.aligned(parent, nodes)
            && nodes.iter().all(|node| match node.handle {
                Some(handle) => self.bound_under(handle, &node.children),
                None => false,
            })
    }

    /// `parent`'s children are exactly `nodes`' elements, in order
    fn aligned(&self, parent: ElementHandle, nodes: &[ElementNode]) -> bool {
        let Ok(children) = self.children(parent) else {
            return false;
        };
        children.len() == nodes.len()
            && children.iter().zip(nodes).all(|(&handle, node)| {
                node.handle == Some(handle)
                    && self.tag(handle).map_or(false, |tag| tag == node.tag)
                    && self.id(handle).map_or(false, |id| id == node.id)
            })
    }

    /// Drop everything under the root and mount `roots` from scratch
    pub fn remount(&mut self, roots: &mut [ElementNode]) -> TrellisResult<()> {
        let root = self.root();
        self.remount_under(root, roots)
    }

    /// Remount only the child lists that are out of step with `roots`.
    ///
    /// Elements at aligned levels keep their handles. Returns how many child
    /// lists were remounted; zero when the mirror was already bound.
    pub fn repair(&mut self, roots: &mut [ElementNode]) -> TrellisResult<usize> {
        let root = self.root();
        self.repair_under(root, roots)
    }

    fn repair_under(
        &mut self,
        parent: ElementHandle,
        nodes: &mut [ElementNode],
    ) -> TrellisResult<usize> {
        if !self.aligned(parent, nodes) {
            self.remount_under(parent, nodes)?;
            return Ok(1);
        }

        let mut repaired = 0;
        for node in nodes.iter_mut() {
            let handle = node.mounted()?;
            repaired += self.repair_under(handle, &mut node.children)?;
        }
        Ok(repaired)
    }

    fn remount_under(
        &mut self,
        parent: ElementHandle,
        nodes: &mut [ElementNode],
    ) -> TrellisResult<()> {
        let stale = self.children(parent)?.to_vec();
        for child in stale {
            self.remove(parent, child)?;
        }

        let mount_point = Some(parent);
        for node in nodes.iter_mut() {
            node.add_to(self, &mount_point, None)?;
        }
        Ok(())
    }
}
