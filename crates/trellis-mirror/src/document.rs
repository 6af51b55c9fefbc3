//! Build, reconcile and apply in one call

use tracing::{debug, warn};
use trellis_builder::{BuilderConfig, TreeBuilder};
use trellis_core::{PatchSummary, TrellisResult};
use trellis_reconcile::{apply, reconcile};

use crate::{ElementNode, Mirror};

/// Outcome of one [`Document::render`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    /// Generation number, starting at 1 for the first render
    pub generation: u64,
    /// Patches applied to the mirror
    pub applied: PatchSummary,
    /// Part of the mirror had to be remounted after applying
    pub resynced: bool,
}

/// A mirror kept in step with successive builder passes.
///
/// Each render builds the next generation, reconciles it against the current
/// one and applies the patches. If the applied mirror is not fully bound to
/// the next generation (children of a moved node), the document remounts
/// the child lists that are out of step.
pub struct Document {
    builder: TreeBuilder<ElementNode>,
    mirror: Mirror,
    tree: Vec<ElementNode>,
    generation: u64,
    resyncs: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_builder(TreeBuilder::new(ElementNode::factory))
    }

    pub fn with_config(config: BuilderConfig) -> TrellisResult<Self> {
        TreeBuilder::<ElementNode>::configure()
            .factory(ElementNode::factory)
            .config(config)
            .build()
            .map(Self::with_builder)
    }

    pub fn with_builder(builder: TreeBuilder<ElementNode>) -> Self {
        Document {
            builder,
            mirror: Mirror::new(),
            tree: Vec::new(),
            generation: 0,
            resyncs: 0,
        }
    }

    /// Render the next generation.
    ///
    /// On error the document keeps its current tree and the mirror may be
    /// partially patched; [`resync`](Self::resync) recovers it.
    pub fn render<F>(&mut self, view: F) -> TrellisResult<RenderReport>
    where
        F: FnOnce(&mut TreeBuilder<ElementNode>),
    {
        let mut next = self.builder.build(view);
        let root = Some(self.mirror.root());
        let patches = reconcile(&root, &self.tree, &mut next);
        let applied = apply(&patches, &mut self.mirror, &self.tree, &mut next)?;

        let generation = self.generation + 1;
        let resynced = !self.mirror.is_bound_to(&next);
        if resynced {
            let repaired = self.mirror.repair(&mut next)?;
            warn!(generation, repaired, "mirror out of step after apply, remounted");
            self.resyncs += 1;
        }

        self.tree = next;
        self.generation = generation;
        debug!(generation, applied = %applied, resynced, "render complete");

        Ok(RenderReport {
            generation,
            applied,
            resynced,
        })
    }

    /// Remount the current tree from scratch
    pub fn resync(&mut self) -> TrellisResult<()> {
        self.mirror.remount(&mut self.tree)?;
        self.resyncs += 1;
        Ok(())
    }

    pub fn tree(&self) -> &[ElementNode] {
        &self.tree
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Renders completed so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trellis_core::{keyed_identity, TreeNode, TrellisError};

    fn tags(document: &Document) -> Vec<String> {
        document.mirror().snapshot().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_render_mounts() {
        let mut document = Document::new();
        let report = document
            .render(|b| {
                b.named("header", |_| {});
                b.named("ul", |b| {
                    b.for_each(["a", "b"], |b, _| b.named("li", |_| {}));
                });
            })
            .unwrap();

        assert_eq!(report.generation, 1);
        assert_eq!(report.applied.added, 2);
        assert!(!report.resynced);
        assert_eq!(tags(&document), vec!["header", "ul(li, li)"]);
    }

    #[test]
    fn test_rerender_keeps_elements() {
        fn view(b: &mut TreeBuilder<ElementNode>, items: &[u32]) {
            b.named("ul", |b| {
                b.for_each(items.to_vec(), |b, _| b.named("li", |_| {}));
            });
        }

        let mut document = Document::new();
        document.render(|b| view(b, &[1, 2, 3])).unwrap();
        let list = document.tree()[0].handle();
        let third = document.tree()[0].children()[2].handle();

        let report = document.render(|b| view(b, &[3, 1, 4])).unwrap();

        assert_eq!(document.tree()[0].handle(), list);
        assert_eq!(document.tree()[0].children()[0].handle(), third);
        assert_eq!(report.applied.added + report.applied.replaced, 1);
        assert!(document.mirror().is_bound_to(document.tree()));
        assert_eq!(document.generation(), 2);
    }

    #[test]
    fn test_moved_node_with_new_children_resyncs() {
        let mut document = Document::new();
        document
            .render(|b| {
                b.keyed("a", "section", |b| b.keyed("x", "p", |_| {}));
                b.keyed("b", "nav", |_| {});
            })
            .unwrap();
        let section = document.tree()[0].handle();
        let nav = document.tree()[1].handle();

        let report = document
            .render(|b| {
                b.keyed("b", "nav", |_| {});
                b.keyed("a", "section", |b| {
                    b.keyed("x", "p", |_| {});
                    b.keyed("y", "p", |_| {});
                });
            })
            .unwrap();

        assert!(report.resynced);
        assert_eq!(document.resyncs(), 1);
        assert_eq!(tags(&document), vec!["nav", "section(p, p)"]);
        assert!(document.mirror().is_bound_to(document.tree()));
        assert_eq!(document.tree()[0].handle(), nav);
        assert_eq!(document.tree()[1].handle(), section);

        // The next generation reconciles cleanly against the remounted tree
        let report = document
            .render(|b| {
                b.keyed("a", "section", |b| b.keyed("y", "p", |_| {}));
            })
            .unwrap();
        assert!(!report.resynced);
        assert_eq!(tags(&document), vec!["section(p)"]);
    }

    #[test]
    fn test_with_config_and_missing_factory() {
        let document = Document::with_config(BuilderConfig::sequential());
        assert!(document.is_ok());

        let missing = TreeBuilder::<ElementNode>::configure().build();
        assert!(matches!(missing, Err(TrellisError::MissingFactory)));
    }

    fn keys() -> impl Strategy<Value = Vec<u32>> {
        proptest::sample::subsequence((0..12u32).collect::<Vec<_>>(), 0..=12).prop_shuffle()
    }

    proptest! {
        #[test]
        fn prop_flat_renders_stay_bound(first in keys(), second in keys()) {
            let mut document = Document::new();
            for generation in [&first, &second] {
                let report = document
                    .render(|b| {
                        for key in generation.iter() {
                            b.keyed(key, "li", |_| {});
                        }
                    })
                    .unwrap();
                prop_assert!(!report.resynced);
            }

            let ids: Vec<_> = document.mirror().snapshot().iter().map(|s| s.id).collect();
            let expected: Vec<_> = second.iter().map(|key| keyed_identity(key, 0)).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
