//! Test node and list-backed target shared by the unit tests

use std::collections::HashMap;

use trellis_core::{NodeId, PatchList, TreeNode, TrellisError, TrellisResult};

use crate::reconcile_children;

/// Handle of the target's root list
pub const ROOT: u64 = 0;

#[derive(Clone, Debug)]
pub struct Item {
    pub id: NodeId,
    pub context: u64,
    pub children: Vec<Item>,
}

impl Item {
    pub fn with_context(mut self, context: u64) -> Self {
        self.context = context;
        self
    }

    pub fn shape(&self) -> Shape {
        Shape(self.id, self.children.iter().map(Item::shape).collect())
    }
}

pub fn leaf(id: u64) -> Item {
    item(id, Vec::new())
}

pub fn item(id: u64, children: Vec<Item>) -> Item {
    Item {
        id: NodeId(id),
        context: 0,
        children,
    }
}

/// Identity tree, for comparing a target against a generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub NodeId, pub Vec<Shape>);

/// Nested ordered lists keyed by handle
#[derive(Debug)]
pub struct ListTarget {
    lists: HashMap<u64, Vec<u64>>,
    ids: HashMap<u64, NodeId>,
    next_handle: u64,
}

impl ListTarget {
    pub fn new() -> Self {
        let mut lists = HashMap::new();
        lists.insert(ROOT, Vec::new());
        ListTarget {
            lists,
            ids: HashMap::new(),
            next_handle: ROOT + 1,
        }
    }

    fn insert(&mut self, parent: u64, id: NodeId, before: Option<u64>) -> TrellisResult<u64> {
        let handle = self.next_handle;
        let list = self
            .lists
            .get_mut(&parent)
            .ok_or_else(|| TrellisError::Target(format!("no list {}", parent)))?;
        match before {
            Some(sibling) => {
                let at = list
                    .iter()
                    .position(|&h| h == sibling)
                    .ok_or_else(|| {
                        TrellisError::Target(format!("{} not under {}", sibling, parent))
                    })?;
                list.insert(at, handle);
            }
            None => list.push(handle),
        }
        self.next_handle += 1;
        self.lists.insert(handle, Vec::new());
        self.ids.insert(handle, id);
        Ok(handle)
    }

    fn detach(&mut self, parent: u64, handle: u64) -> TrellisResult<()> {
        let list = self
            .lists
            .get_mut(&parent)
            .ok_or_else(|| TrellisError::Target(format!("no list {}", parent)))?;
        let at = list
            .iter()
            .position(|&h| h == handle)
            .ok_or_else(|| TrellisError::Target(format!("{} not under {}", handle, parent)))?;
        list.remove(at);
        Ok(())
    }

    pub fn shape(&self, handle: u64) -> Vec<Shape> {
        self.lists
            .get(&handle)
            .map(|list| {
                list.iter()
                    .map(|h| Shape(self.ids[h], self.shape(*h)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TreeNode for Item {
    type Context = u64;
    type Target = ListTarget;

    fn id(&self) -> NodeId {
        self.id
    }

    fn context(&self) -> &u64 {
        &self.context
    }

    fn set_context(&mut self, context: u64) {
        self.context = context;
    }

    fn children(&self) -> &[Item] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Item> {
        &mut self.children
    }

    fn add_to(
        &mut self,
        target: &mut ListTarget,
        parent: &u64,
        hint: Option<&u64>,
    ) -> TrellisResult<()> {
        self.context = target.insert(*parent, self.id, hint.copied())?;
        let handle = self.context;
        for child in &mut self.children {
            child.add_to(target, &handle, None)?;
        }
        Ok(())
    }

    fn remove_from(&self, target: &mut ListTarget, parent: &u64) -> TrellisResult<()> {
        target.detach(*parent, self.context)
    }

    fn move_to(&self, target: &mut ListTarget, parent: &u64) -> TrellisResult<()> {
        target.detach(*parent, self.context)?;
        target
            .lists
            .get_mut(parent)
            .ok_or_else(|| TrellisError::Target(format!("no list {}", parent)))?
            .push(self.context);
        Ok(())
    }

    fn diff(&self, patches: &mut PatchList<u64>, next: &mut Self) {
        reconcile_children(patches, self, next);
    }
}

/// Target holding `nodes` as its root list, with contexts assigned
pub fn mount(nodes: &mut [Item]) -> ListTarget {
    let mut target = ListTarget::new();
    for node in nodes.iter_mut() {
        node.add_to(&mut target, &ROOT, None)
            .expect("mounting into a fresh target");
    }
    target
}
