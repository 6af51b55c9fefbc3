//! Tree builder
//!
//! A build pass runs a closure against a [`TreeBuilder`]. Every call to
//! [`TreeBuilder::named`] creates a node through the factory, opens it as the
//! cursor, runs the node's children and attaches the finished node to the
//! enclosing node (or to the root sequence). Groups, loops and conditionals
//! only decide which children get declared.
//!
//! ```
//! use trellis_builder::TreeBuilder;
//! # use trellis_core::{NodeId, TreeNode, TrellisResult};
//! # #[derive(Debug)]
//! # struct Rule { id: NodeId, name: String, children: Vec<Rule> }
//! # impl TreeNode for Rule {
//! #     type Context = ();
//! #     type Target = ();
//! #     fn id(&self) -> NodeId { self.id }
//! #     fn context(&self) -> &() { &() }
//! #     fn set_context(&mut self, _: ()) {}
//! #     fn children(&self) -> &[Rule] { &self.children }
//! #     fn children_mut(&mut self) -> &mut Vec<Rule> { &mut self.children }
//! #     fn add_to(&mut self, _: &mut (), _: &(), _: Option<&()>) -> TrellisResult<()> { Ok(()) }
//! #     fn remove_from(&self, _: &mut (), _: &()) -> TrellisResult<()> { Ok(()) }
//! #     fn move_to(&self, _: &mut (), _: &()) -> TrellisResult<()> { Ok(()) }
//! # }
//! let mut builder = TreeBuilder::new(|name, id, _scope| Rule {
//!     id,
//!     name: name.to_string(),
//!     children: Vec::new(),
//! });
//!
//! let roots = builder.build(|b| {
//!     b.named("body", |b| {
//!         b.for_each(["home", "about"], |b, _page| b.named("a", |_| {}));
//!         b.if_then(false, |b| b.named("banner", |_| {}));
//!     });
//! });
//!
//! assert_eq!(roots.len(), 1);
//! assert_eq!(roots[0].children.len(), 2);
//! ```

use std::hash::Hash;
use std::panic::Location;
use std::rc::Rc;

use tracing::{debug, trace};
use trellis_core::{
    keyed_identity, stable_hash, NodeId, Slot, TreeNode, TrellisError, TrellisResult,
};

use crate::{BuilderConfig, Scope};

/// A deferred child declaration
pub type Declaration<'a, N> = Box<dyn FnOnce(&mut TreeBuilder<N>) + 'a>;

/// Hook that runs every child declaration in place of the builder
pub type Follower<N> = Rc<dyn Fn(&mut TreeBuilder<N>, Declaration<'_, N>)>;

/// Creates a node from its name, identity and the current scope
pub type NodeFactory<N> = Box<dyn FnMut(&str, NodeId, &Scope) -> N>;

/// Box a closure as a [`Declaration`], for use with [`TreeBuilder::group`]
pub fn declaration<'a, N, F>(f: F) -> Declaration<'a, N>
where
    F: FnOnce(&mut TreeBuilder<N>) + 'a,
{
    Box::new(f)
}

/// Branch condition, evaluated once when the conditional is declared
pub trait Condition {
    fn holds(self) -> bool;
}

impl Condition for bool {
    fn holds(self) -> bool {
        self
    }
}

impl<F> Condition for F
where
    F: FnOnce() -> bool,
{
    fn holds(self) -> bool {
        self()
    }
}

/// An open node and the number of children attached to it so far
struct Frame<N> {
    node: N,
    declared: usize,
}

/// Builder setup, checked when the builder is created
pub struct BuilderSetup<N> {
    factory: Option<NodeFactory<N>>,
    follower: Option<Follower<N>>,
    config: BuilderConfig,
}

impl<N: TreeNode> BuilderSetup<N> {
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut(&str, NodeId, &Scope) -> N + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn follower<F>(mut self, follower: F) -> Self
    where
        F: Fn(&mut TreeBuilder<N>, Declaration<'_, N>) + 'static,
    {
        self.follower = Some(Rc::new(follower));
        self
    }

    pub fn config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the identity strategy with a function of the modifier
    pub fn identity_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) -> u64 + Send + Sync + 'static,
    {
        self.config.identity = trellis_core::IdentityStrategy::custom(f);
        self
    }

    pub fn build(self) -> TrellisResult<TreeBuilder<N>> {
        let factory = self.factory.ok_or(TrellisError::MissingFactory)?;
        let scope = Scope::with_modifier(self.config.root_modifier);

        Ok(TreeBuilder {
            factory,
            follower: self.follower,
            config: self.config,
            open: Vec::new(),
            roots: Vec::new(),
            root_declared: 0,
            scope,
        })
    }
}

/// Declarative tree builder
///
/// One builder runs one pass at a time; it is not `Sync` and its cursor
/// state must not be shared between passes in flight.
pub struct TreeBuilder<N> {
    factory: NodeFactory<N>,
    follower: Option<Follower<N>>,
    config: BuilderConfig,
    /// Open nodes, innermost last
    open: Vec<Frame<N>>,
    roots: Vec<N>,
    root_declared: usize,
    scope: Scope,
}

impl<N: TreeNode> TreeBuilder<N> {
    /// Builder with the default configuration
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut(&str, NodeId, &Scope) -> N + 'static,
    {
        TreeBuilder {
            factory: Box::new(factory),
            follower: None,
            config: BuilderConfig::default(),
            open: Vec::new(),
            roots: Vec::new(),
            root_declared: 0,
            scope: Scope::default(),
        }
    }

    /// Start configuring a builder
    pub fn configure() -> BuilderSetup<N> {
        BuilderSetup {
            factory: None,
            follower: None,
            config: BuilderConfig::default(),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Run one build pass and return the root sequence it declared
    pub fn build<F>(&mut self, declarations: F) -> Vec<N>
    where
        F: FnOnce(&mut Self),
    {
        // Start clean even if an earlier pass unwound mid-declaration
        self.open.clear();
        self.roots.clear();
        self.root_declared = 0;
        self.scope = Scope::with_modifier(self.config.root_modifier);

        self.dispatch(Box::new(declarations));

        let roots = std::mem::take(&mut self.roots);
        debug!(roots = roots.len(), "build pass complete");
        roots
    }

    /// Node currently accepting children, `None` at the root
    pub fn current(&self) -> Option<&N> {
        self.open.last().map(|frame| &frame.node)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of open nodes
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Declare a node identified by the calling source location
    #[track_caller]
    pub fn named<F>(&mut self, name: &str, children: F)
    where
        F: FnOnce(&mut Self),
    {
        let location = Location::caller();
        let id = self
            .config
            .identity
            .identify(Some(location), self.slot(), self.scope.modifier());
        self.declare(name, id, children);
    }

    /// Declare a node identified by an explicit key
    pub fn keyed<K, F>(&mut self, key: &K, name: &str, children: F)
    where
        K: Hash + ?Sized,
        F: FnOnce(&mut Self),
    {
        let id = keyed_identity(key, self.scope.modifier());
        self.declare(name, id, children);
    }

    /// Declare several children under the current node without adding one
    pub fn group<'a, I>(&mut self, children: I)
    where
        I: IntoIterator<Item = Declaration<'a, N>>,
    {
        for child in children {
            self.dispatch(child);
        }
    }

    /// Declare children once per item.
    ///
    /// While `writer` runs for an item, the scope carries the item and its
    /// hash is the modifier. Ranges and arrays of enum values work as
    /// collections directly. Use [`for_each_option`](Self::for_each_option)
    /// when items can be absent.
    pub fn for_each<I, T, F>(&mut self, items: I, mut writer: F)
    where
        I: IntoIterator<Item = T>,
        T: Hash + 'static,
        F: FnMut(&mut Self, &T),
    {
        self.for_each_indexed(items, |b, _, item| writer(b, item));
    }

    /// Like [`for_each`](Self::for_each), also passing the item's index
    pub fn for_each_indexed<I, T, F>(&mut self, items: I, mut writer: F)
    where
        I: IntoIterator<Item = T>,
        T: Hash + 'static,
        F: FnMut(&mut Self, usize, &T),
    {
        self.each(items, |item| stable_hash(item), writer);
    }

    /// Like [`for_each`](Self::for_each) over items that may be absent.
    /// An absent item declares its children with modifier `0`.
    pub fn for_each_option<I, T, F>(&mut self, items: I, mut writer: F)
    where
        I: IntoIterator<Item = Option<T>>,
        T: Hash + 'static,
        F: FnMut(&mut Self, Option<&T>),
    {
        self.each(
            items,
            |item| item.as_ref().map_or(0, |item| stable_hash(item)),
            |b, _, item| writer(b, item.as_ref()),
        );
    }

    fn each<I, T, S, F>(&mut self, items: I, seed: S, mut writer: F)
    where
        I: IntoIterator<Item = T>,
        T: 'static,
        S: Fn(&T) -> u64,
        F: FnMut(&mut Self, usize, &T),
    {
        let outer = self.scope.clone();

        for (index, item) in items.into_iter().enumerate() {
            let modifier = seed(&item);
            let item = Rc::new(item);
            self.scope = Scope::for_item(Rc::clone(&item), index, modifier);
            let writer = &mut writer;
            self.dispatch(Box::new(move |b: &mut Self| writer(b, index, &*item)));
        }

        self.scope = outer;
    }

    /// Declare `then` only if `condition` holds
    pub fn if_then<C, F>(&mut self, condition: C, then: F)
    where
        C: Condition,
        F: FnOnce(&mut Self),
    {
        if condition.holds() {
            self.dispatch(Box::new(then));
        }
    }

    /// Declare exactly one of two branches
    pub fn if_else<C, T, E>(&mut self, condition: C, then: T, otherwise: E)
    where
        C: Condition,
        T: FnOnce(&mut Self),
        E: FnOnce(&mut Self),
    {
        if condition.holds() {
            self.dispatch(Box::new(then));
        } else {
            self.dispatch(Box::new(otherwise));
        }
    }

    fn slot(&self) -> Slot {
        match self.open.last() {
            Some(frame) => Slot::new(frame.node.id(), frame.declared),
            None => Slot::new(NodeId::ZERO, self.root_declared),
        }
    }

    fn dispatch(&mut self, declaration: Declaration<'_, N>) {
        match self.follower.clone() {
            Some(follower) => follower(self, declaration),
            None => declaration(self),
        }
    }

    fn declare<F>(&mut self, name: &str, id: NodeId, children: F)
    where
        F: FnOnce(&mut Self),
    {
        let node = (self.factory)(name, id, &self.scope);
        trace!(name, id = %id, depth = self.open.len(), "declare node");

        self.open.push(Frame { node, declared: 0 });
        self.dispatch(Box::new(children));

        if let Some(frame) = self.open.pop() {
            self.attach(frame.node);
        }
    }

    fn attach(&mut self, node: N) {
        match self.open.last_mut() {
            Some(parent) => {
                parent.declared += 1;
                node.register(&mut parent.node);
            }
            None => {
                self.root_declared += 1;
                self.roots.push(node);
            }
        }
    }
}
