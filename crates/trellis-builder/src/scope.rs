//! Declaration scope
//!
//! The scope is the builder's "current context": the loop item being
//! declared, its index, and the modifier seed folded into identities.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Values in effect for the declaration being built
#[derive(Clone, Default)]
pub struct Scope {
    modifier: u64,
    index: Option<usize>,
    item: Option<Rc<dyn Any>>,
}

impl Scope {
    /// Scope outside any loop
    pub fn with_modifier(modifier: u64) -> Self {
        Scope {
            modifier,
            index: None,
            item: None,
        }
    }

    /// Scope for one loop iteration. The modifier is derived from the item
    /// alone, so an item keeps its identities when the collection is reordered.
    pub(crate) fn for_item<T: 'static>(item: Rc<T>, index: usize, modifier: u64) -> Self {
        Scope {
            modifier,
            index: Some(index),
            item: Some(item as Rc<dyn Any>),
        }
    }

    pub fn modifier(&self) -> u64 {
        self.modifier
    }

    /// Position of the current item within its loop
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Current loop item, if there is one and it is a `T`
    pub fn item<T: 'static>(&self) -> Option<&T> {
        self.item.as_deref().and_then(|item| item.downcast_ref::<T>())
    }

    pub fn has_item(&self) -> bool {
        self.item.is_some()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("modifier", &format_args!("{:016x}", self.modifier))
            .field("index", &self.index)
            .field("item", &self.item.as_ref().map(|_| "<item>"))
            .finish()
    }
}
