//! Element arena
//!
//! Elements live in generational slots. A handle names a slot and the
//! generation it was allocated in, so a handle kept past its element's
//! removal stops resolving instead of reaching whatever reused the slot.

use std::fmt;

use tracing::trace;
use trellis_core::NodeId;

use crate::{MirrorError, MirrorResult};

/// Generational index of an element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    index: u32,
    generation: u32,
}

impl ElementHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Element {
    tag: String,
    id: NodeId,
    parent: Option<ElementHandle>,
    children: Vec<ElementHandle>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Arena of tagged elements with ordered children under one root
#[derive(Debug)]
pub struct Mirror {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ElementHandle,
    len: usize,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror {
    /// Tag of the root element
    pub const ROOT_TAG: &'static str = "#root";

    pub fn new() -> Self {
        let root = Element {
            tag: Self::ROOT_TAG.to_string(),
            id: NodeId::ZERO,
            parent: None,
            children: Vec::new(),
        };
        Mirror {
            slots: vec![Slot {
                generation: 0,
                element: Some(root),
            }],
            free: Vec::new(),
            root: ElementHandle {
                index: 0,
                generation: 0,
            },
            len: 0,
        }
    }

    pub fn root(&self) -> ElementHandle {
        self.root
    }

    /// Live elements, not counting the root
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, handle: ElementHandle) -> bool {
        self.element(handle).is_ok()
    }

    /// Allocate a detached element
    pub fn create(&mut self, tag: &str, id: NodeId) -> ElementHandle {
        let element = Element {
            tag: tag.to_string(),
            id,
            parent: None,
            children: Vec::new(),
        };
        self.len += 1;

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.element = Some(element);
                ElementHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    element: Some(element),
                });
                ElementHandle {
                    index,
                    generation: 0,
                }
            }
        };
        trace!(element = %handle, tag, id = %id, "create element");
        handle
    }

    /// Attach a detached `child` under `parent`, before `before` or at the end
    pub fn insert(
        &mut self,
        parent: ElementHandle,
        child: ElementHandle,
        before: Option<ElementHandle>,
    ) -> MirrorResult<()> {
        if child == self.root {
            return Err(MirrorError::RootElement);
        }
        if self.element(child)?.parent.is_some() {
            return Err(MirrorError::AlreadyAttached(child));
        }
        if self.is_ancestor(child, parent)? {
            return Err(MirrorError::Cycle { parent, child });
        }

        let siblings = &mut self.element_mut(parent)?.children;
        match before {
            Some(sibling) => {
                let at = siblings
                    .iter()
                    .position(|&h| h == sibling)
                    .ok_or(MirrorError::NotAChild {
                        parent,
                        child: sibling,
                    })?;
                siblings.insert(at, child);
            }
            None => siblings.push(child),
        }

        self.element_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent` and free it with its whole subtree.
    /// Returns the number of elements freed.
    pub fn remove(&mut self, parent: ElementHandle, child: ElementHandle) -> MirrorResult<usize> {
        self.detach(parent, child)?;
        let freed = self.free_subtree(child);
        trace!(element = %child, freed, "remove element");
        Ok(freed)
    }

    /// Free a detached element with its subtree, as after a failed insert
    pub fn discard(&mut self, handle: ElementHandle) -> MirrorResult<usize> {
        if handle == self.root {
            return Err(MirrorError::RootElement);
        }
        if self.element(handle)?.parent.is_some() {
            return Err(MirrorError::AlreadyAttached(handle));
        }
        let freed = self.free_subtree(handle);
        trace!(element = %handle, freed, "discard element");
        Ok(freed)
    }

    fn free_subtree(&mut self, top: ElementHandle) -> usize {
        let mut freed = 0;
        let mut pending = vec![top];
        while let Some(handle) = pending.pop() {
            let Some(slot) = self.slots.get_mut(handle.index as usize) else {
                continue;
            };
            if slot.generation != handle.generation {
                continue;
            }
            if let Some(element) = slot.element.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
                pending.extend(element.children);
                freed += 1;
            }
        }

        self.len -= freed;
        freed
    }

    /// Move `child` to the end of `parent`'s children
    pub fn move_to_end(&mut self, parent: ElementHandle, child: ElementHandle) -> MirrorResult<()> {
        self.detach(parent, child)?;
        self.element_mut(parent)?.children.push(child);
        self.element_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn children(&self, handle: ElementHandle) -> MirrorResult<&[ElementHandle]> {
        Ok(&self.element(handle)?.children)
    }

    pub fn parent(&self, handle: ElementHandle) -> MirrorResult<Option<ElementHandle>> {
        Ok(self.element(handle)?.parent)
    }

    pub fn tag(&self, handle: ElementHandle) -> MirrorResult<&str> {
        Ok(&self.element(handle)?.tag)
    }

    pub fn id(&self, handle: ElementHandle) -> MirrorResult<NodeId> {
        Ok(self.element(handle)?.id)
    }

    /// Structure under the root
    pub fn snapshot(&self) -> Vec<Snapshot> {
        self.element(self.root)
            .map(|root| {
                root.children
                    .iter()
                    .filter_map(|&child| self.snapshot_of(child).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Structure of one element and its descendants
    pub fn snapshot_of(&self, handle: ElementHandle) -> MirrorResult<Snapshot> {
        let element = self.element(handle)?;
        let children = element
            .children
            .iter()
            .map(|&child| self.snapshot_of(child))
            .collect::<MirrorResult<Vec<_>>>()?;
        Ok(Snapshot {
            tag: element.tag.clone(),
            id: element.id,
            children,
        })
    }

    /// Whether `ancestor` is `handle` or one of its ancestors
    fn is_ancestor(&self, ancestor: ElementHandle, handle: ElementHandle) -> MirrorResult<bool> {
        let mut current = Some(handle);
        while let Some(h) = current {
            if h == ancestor {
                return Ok(true);
            }
            current = self.element(h)?.parent;
        }
        Ok(false)
    }

    fn detach(&mut self, parent: ElementHandle, child: ElementHandle) -> MirrorResult<()> {
        if child == self.root {
            return Err(MirrorError::RootElement);
        }
        let siblings = &mut self.element_mut(parent)?.children;
        let at = siblings
            .iter()
            .position(|&h| h == child)
            .ok_or(MirrorError::NotAChild { parent, child })?;
        siblings.remove(at);
        self.element_mut(child)?.parent = None;
        Ok(())
    }

    fn element(&self, handle: ElementHandle) -> MirrorResult<&Element> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.element.as_ref())
            .ok_or(MirrorError::UnknownElement(handle))
    }

    fn element_mut(&mut self, handle: ElementHandle) -> MirrorResult<&mut Element> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.element.as_mut())
            .ok_or(MirrorError::UnknownElement(handle))
    }
}

/// Owned copy of a subtree's tags and identities
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub tag: String,
    pub id: NodeId,
    pub children: Vec<Snapshot>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
