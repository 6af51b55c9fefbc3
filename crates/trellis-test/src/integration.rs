//! End-to-end Integration Test Suite
//!
//! Scenarios that drive a [`Document`] through successive renders:
//! - Keyed list churn with element reuse
//! - Conditional sections
//! - Identity strategies under sibling insertion
//! - Follower hooks around every declaration

use std::cell::Cell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};
use trellis_builder::{BuilderConfig, TreeBuilder};
use trellis_core::{NodeId, PatchSummary, TreeNode, TrellisResult};
use trellis_mirror::{Document, ElementHandle, ElementNode, Snapshot};

// ============================================================================
// LIST VIEW
// ============================================================================

/// One row of the list view. Rows are identified by `id` alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: u32,
    pub done: bool,
}

impl Entry {
    pub fn new(id: u32) -> Self {
        Entry { id, done: false }
    }
}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Header, one `li` per entry (with an `s` child when done), a placeholder
/// while empty, and a footer
pub fn list_view(b: &mut TreeBuilder<ElementNode>, entries: &[Entry]) {
    b.named("header", |_| {});
    b.named("ul", |b| {
        b.for_each(entries.to_vec(), |b, entry| {
            b.named("li", |b| {
                b.if_then(entry.done, |b| b.named("s", |_| {}));
            });
        });
    });
    b.if_then(|| entries.is_empty(), |b| b.named("p", |_| {}));
    b.named("footer", |_| {});
}

fn rendered(document: &Document) -> Vec<String> {
    document
        .mirror()
        .snapshot()
        .iter()
        .map(Snapshot::to_string)
        .collect()
}

// ============================================================================
// INTEGRATION TEST HARNESS
// ============================================================================

/// Integration run configuration
#[derive(Clone, Debug)]
pub struct IntegrationTestConfig {
    /// Renders after the first
    pub renders: usize,
    /// Entries in the first render
    pub initial_entries: u32,
    /// Probability of each edit between renders (0.0 - 1.0)
    pub churn: f64,
    pub seed: u64,
}

impl Default for IntegrationTestConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl IntegrationTestConfig {
    pub fn minimal() -> Self {
        IntegrationTestConfig {
            renders: 5,
            initial_entries: 3,
            churn: 0.2,
            seed: 1,
        }
    }

    pub fn standard() -> Self {
        IntegrationTestConfig {
            renders: 50,
            initial_entries: 10,
            churn: 0.3,
            seed: 1,
        }
    }

    pub fn stress() -> Self {
        IntegrationTestConfig {
            renders: 300,
            initial_entries: 40,
            churn: 0.6,
            seed: 1,
        }
    }
}

/// Integration run result
#[derive(Debug)]
pub struct IntegrationTestResult {
    pub renders: usize,
    /// Patches applied across all renders
    pub applied: PatchSummary,
    pub resyncs: u64,
    /// List rows that kept their element from one render to the next
    pub reused: usize,
    /// The mirror matched every generation and stayed bound to it
    pub converged: bool,
    pub errors: Vec<String>,
}

impl IntegrationTestResult {
    pub fn passed(&self) -> bool {
        self.converged && self.errors.is_empty()
    }
}

/// Renders the list view through churn
pub struct IntegrationTestHarness {
    config: IntegrationTestConfig,
    document: Document,
    entries: Vec<Entry>,
    next_id: u32,
    rng: StdRng,
}

impl IntegrationTestHarness {
    pub fn new(config: IntegrationTestConfig) -> Self {
        let entries = (0..config.initial_entries).map(Entry::new).collect();
        IntegrationTestHarness {
            rng: StdRng::seed_from_u64(config.seed),
            next_id: config.initial_entries,
            entries,
            document: Document::new(),
            config,
        }
    }

    pub fn run(&mut self) -> IntegrationTestResult {
        let mut result = IntegrationTestResult {
            renders: 0,
            applied: PatchSummary::default(),
            resyncs: 0,
            reused: 0,
            converged: true,
            errors: Vec::new(),
        };

        for round in 0..=self.config.renders {
            let before = self.row_handles();
            let entries = self.entries.clone();

            match self.document.render(|b| list_view(b, &entries)) {
                Ok(report) => result.applied += report.applied,
                Err(err) => {
                    warn!(round, error = %err, "render failed");
                    result.errors.push(format!("render {}: {}", round, err));
                    if let Err(err) = self.document.resync() {
                        result.errors.push(format!("resync {}: {}", round, err));
                    }
                }
            }

            let expected: Vec<Snapshot> =
                self.document.tree().iter().map(ElementNode::snapshot).collect();
            if self.document.mirror().snapshot() != expected
                || !self.document.mirror().is_bound_to(self.document.tree())
            {
                result.converged = false;
            }

            result.reused += self
                .row_handles()
                .iter()
                .filter(|(id, handle)| before.get(*id) == Some(*handle))
                .count();
            result.renders += 1;

            self.churn();
        }

        result.resyncs = self.document.resyncs();
        debug!(
            renders = result.renders,
            applied = %result.applied,
            resyncs = result.resyncs,
            reused = result.reused,
            "integration run complete"
        );
        result
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Element handle of every mounted list row
    fn row_handles(&self) -> HashMap<NodeId, ElementHandle> {
        self.document
            .tree()
            .iter()
            .find(|node| node.tag() == "ul")
            .map(|list| {
                list.children()
                    .iter()
                    .filter_map(|row| row.handle().map(|handle| (row.id(), handle)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn churn(&mut self) {
        let p = self.config.churn;

        let rng = &mut self.rng;
        self.entries.retain(|_| !rng.gen_bool(p / 2.0));
        for entry in &mut self.entries {
            if self.rng.gen_bool(p / 2.0) {
                entry.done = !entry.done;
            }
        }
        if self.rng.gen_bool(p) {
            self.entries.shuffle(&mut self.rng);
        }
        while self.rng.gen_bool(p) {
            let at = self.rng.gen_range(0..=self.entries.len());
            self.entries.insert(at, Entry::new(self.next_id));
            self.next_id += 1;
        }
    }
}

// ============================================================================
// TEST FUNCTIONS
// ============================================================================

/// A few renders with light churn
pub fn test_basic_render_cycle() -> IntegrationTestResult {
    let mut harness = IntegrationTestHarness::new(IntegrationTestConfig::minimal());
    harness.run()
}

/// Many renders with moderate churn
pub fn test_list_churn() -> IntegrationTestResult {
    let mut harness = IntegrationTestHarness::new(IntegrationTestConfig::standard());
    harness.run()
}

/// Long run with heavy churn
pub fn test_list_churn_under_stress() -> IntegrationTestResult {
    let mut harness = IntegrationTestHarness::new(IntegrationTestConfig::stress());
    harness.run()
}

/// The placeholder appears and disappears with the list contents
pub fn test_empty_state_toggle() -> TrellisResult<bool> {
    let mut document = Document::new();
    let empty: Vec<Entry> = Vec::new();
    let one = vec![Entry::new(1)];

    document.render(|b| list_view(b, &empty))?;
    assert_eq!(rendered(&document), vec!["header", "ul", "p", "footer"]);

    let report = document.render(|b| list_view(b, &one))?;
    assert_eq!(rendered(&document), vec!["header", "ul(li)", "footer"]);
    assert_eq!(report.applied.added, 1);
    assert_eq!(report.applied.removed, 1);

    document.render(|b| list_view(b, &empty))?;
    assert_eq!(rendered(&document), vec!["header", "ul", "p", "footer"]);

    Ok(document.resyncs() == 0)
}

fn page(b: &mut TreeBuilder<ElementNode>, with_banner: bool) {
    b.if_then(with_banner, |b| b.named("aside", |_| {}));
    b.named("header", |_| {});
    b.named("main", |_| {});
}

/// Inserting a sibling in front: call-site identities see an insertion,
/// positional identities see renamed nodes and need a remount
pub fn test_identity_strategies() -> TrellisResult<bool> {
    let mut call_site = Document::new();
    call_site.render(|b| page(b, false))?;
    let report = call_site.render(|b| page(b, true))?;
    assert_eq!(report.applied.added, 1);
    assert!(!report.resynced);

    let mut positional = Document::with_config(BuilderConfig::sequential())?;
    positional.render(|b| page(b, false))?;
    let report = positional.render(|b| page(b, true))?;
    assert_eq!(report.applied.added, 1);
    assert!(report.resynced);

    let expected = vec!["aside", "header", "main"];
    Ok(rendered(&call_site) == expected && rendered(&positional) == expected)
}

/// A follower runs every child declaration and can count them
pub fn test_follower_sees_every_declaration() -> TrellisResult<bool> {
    let count = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&count);
    let builder = TreeBuilder::<ElementNode>::configure()
        .factory(ElementNode::factory)
        .follower(move |b, declaration| {
            seen.set(seen.get() + 1);
            declaration(b);
        })
        .build()?;

    let mut document = Document::with_builder(builder);
    let entries = vec![Entry::new(1), Entry::new(2)];
    document.render(|b| list_view(b, &entries))?;

    // root, header, ul, two loop items, two rows, footer
    assert_eq!(count.get(), 8);
    Ok(rendered(&document) == vec!["header", "ul(li, li)", "footer"])
}
