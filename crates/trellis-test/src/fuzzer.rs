//! Generation Fuzzer - Randomized build, reconcile and apply rounds
//!
//! Each round mutates the previous declaration plan (drops, shuffles and
//! fresh subtrees), builds it, reconciles it against the current generation
//! and applies the patches to a mirror. Checks:
//! - Patches apply without error
//! - Root-level order of the mirror equals the next generation's
//! - Root-level patch counts agree with an unordered set diff of identities
//! - The mirror matches a fresh mount of the next generation (counted, not
//!   a violation: moved nodes keep their old children)

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};
use trellis_builder::TreeBuilder;
use trellis_core::{NodeId, PatchSummary, TreeNode};
use trellis_mirror::{ElementNode, Mirror};
use trellis_reconcile::{apply, reconcile, set_diff};

const TAGS: [&str; 6] = ["div", "section", "ul", "li", "p", "span"];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Generations to build after the first
    pub rounds: usize,
    /// Most children a fresh node gets
    pub max_children: usize,
    /// Deepest level a fresh node can sit at
    pub max_depth: usize,
    /// Distinct keys available to a generation
    pub id_pool: u64,
    /// Probability of each mutation step (0.0 - 1.0)
    pub mutation_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            rounds: 50,
            max_children: 4,
            max_depth: 3,
            id_pool: 256,
            mutation_prob: 0.3,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            rounds: 20,
            max_children: 3,
            max_depth: 2,
            id_pool: 64,
            mutation_prob: 0.2,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            rounds: 500,
            max_children: 6,
            max_depth: 4,
            id_pool: 4096,
            mutation_prob: 0.4,
            seed: 42,
        }
    }

    /// Mostly churn: nearly every step mutates
    pub fn adversarial() -> Self {
        FuzzerConfig {
            rounds: 200,
            max_children: 8,
            max_depth: 3,
            id_pool: 1024,
            mutation_prob: 0.9,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One node of a declaration plan. Keys are unique across a plan and a key
/// always declares the same tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanNode {
    pub key: u64,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn tag(&self) -> &'static str {
        TAGS[(self.key % TAGS.len() as u64) as usize]
    }

    fn collect_keys(&self, keys: &mut HashSet<u64>) {
        keys.insert(self.key);
        for child in &self.children {
            child.collect_keys(keys);
        }
    }
}

/// Declare `plan` through `builder`'s keyed identities
pub fn declare_plan(builder: &mut TreeBuilder<ElementNode>, plan: &[PlanNode]) {
    for node in plan {
        builder.keyed(&node.key, node.tag(), |b| declare_plan(b, &node.children));
    }
}

/// Fuzzing result
#[derive(Debug, Default)]
pub struct FuzzReport {
    pub rounds: usize,
    /// Patches produced across all rounds
    pub patches: PatchSummary,
    /// Rounds whose mirror differed from a fresh mount
    pub mismatches: usize,
    /// Rounds that ended with a repair or remount
    pub resyncs: usize,
    pub violations: Vec<String>,
}

impl FuzzReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Generation fuzzer
pub struct GenerationFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
    builder: TreeBuilder<ElementNode>,
    mirror: Mirror,
    plan: Vec<PlanNode>,
    current: Vec<ElementNode>,
}

impl GenerationFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        GenerationFuzzer {
            config,
            rng,
            builder: TreeBuilder::new(ElementNode::factory),
            mirror: Mirror::new(),
            plan: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Mount a random first generation, then run the configured rounds
    pub fn run(&mut self) -> FuzzReport {
        let mut report = FuzzReport::default();

        let mut used = HashSet::new();
        let first = self.fresh_children(1, &mut used);
        self.step(first, &mut report);

        for _ in 0..self.config.rounds {
            let plan = self.mutate_plan();
            self.step(plan, &mut report);
            report.rounds += 1;
        }

        debug!(
            rounds = report.rounds,
            patches = %report.patches,
            mismatches = report.mismatches,
            resyncs = report.resyncs,
            violations = report.violations.len(),
            "fuzzing complete"
        );
        report
    }

    fn step(&mut self, plan: Vec<PlanNode>, report: &mut FuzzReport) {
        let round = report.rounds;
        let mut next = self.builder.build(|b| declare_plan(b, &plan));
        let root = Some(self.mirror.root());
        let patches = reconcile(&root, &self.current, &mut next);

        let mut root_level = PatchSummary::default();
        for patch in &patches {
            report.patches.record(patch.kind());
            if patch.depth() == 1 {
                root_level.record(patch.kind());
            }
        }
        self.check_accounting(round, &next, root_level, report);

        if let Err(err) = apply(&patches, &mut self.mirror, &self.current, &mut next) {
            report
                .violations
                .push(format!("round {}: apply failed: {}", round, err));
        } else {
            self.check_root_order(round, &next, report);
            self.check_fresh_mount(&next, report);
        }

        if !self.mirror.is_bound_to(&next) {
            // A failed apply can leave the mirror past repair
            let resynced = match self.mirror.repair(&mut next) {
                Ok(_) => Ok(()),
                Err(_) => self.mirror.remount(&mut next),
            };
            if let Err(err) = resynced {
                report
                    .violations
                    .push(format!("round {}: remount failed: {}", round, err));
            }
            report.resyncs += 1;
        }

        self.plan = plan;
        self.current = next;
    }

    fn check_accounting(
        &self,
        round: usize,
        next: &[ElementNode],
        root_level: PatchSummary,
        report: &mut FuzzReport,
    ) {
        let prev_ids: Vec<NodeId> = self.current.iter().map(TreeNode::id).collect();
        let next_ids: Vec<NodeId> = next.iter().map(TreeNode::id).collect();
        let changes = set_diff(&prev_ids, &next_ids);
        let appeared = changes.iter().filter(|change| change.is_add()).count() as u32;
        let vanished = changes.len() as u32 - appeared;

        if root_level.added + root_level.replaced != appeared
            || root_level.removed + root_level.replaced != vanished
        {
            warn!(round, %root_level, appeared, vanished, "patch accounting mismatch");
            report.violations.push(format!(
                "round {}: root patches {} for {} new and {} gone identities",
                round, root_level, appeared, vanished
            ));
        }
    }

    fn check_root_order(&self, round: usize, next: &[ElementNode], report: &mut FuzzReport) {
        let expected: Vec<NodeId> = next.iter().map(TreeNode::id).collect();
        let actual: Vec<NodeId> = self
            .mirror
            .snapshot()
            .iter()
            .map(|snapshot| snapshot.id)
            .collect();

        if actual != expected {
            report
                .violations
                .push(format!("round {}: root order diverged", round));
        }
    }

    fn check_fresh_mount(&self, next: &[ElementNode], report: &mut FuzzReport) {
        let mut fresh = Mirror::new();
        let mut copy = next.to_vec();
        if fresh.remount(&mut copy).is_err() || fresh.snapshot() != self.mirror.snapshot() {
            report.mismatches += 1;
        }
    }

    fn mutate_plan(&mut self) -> Vec<PlanNode> {
        let mut used = HashSet::new();
        for node in &self.plan {
            node.collect_keys(&mut used);
        }
        let plan = std::mem::take(&mut self.plan);
        let mutated = self.mutate_level(plan, 1, &mut used);
        // Never go empty for long
        if mutated.is_empty() {
            self.fresh_children(1, &mut used)
        } else {
            mutated
        }
    }

    fn mutate_level(
        &mut self,
        nodes: Vec<PlanNode>,
        depth: usize,
        used: &mut HashSet<u64>,
    ) -> Vec<PlanNode> {
        let p = self.config.mutation_prob;
        let mut kept = Vec::with_capacity(nodes.len());

        for mut node in nodes {
            if self.rng.gen_bool(p / 2.0) {
                continue;
            }
            let children = std::mem::take(&mut node.children);
            node.children = self.mutate_level(children, depth + 1, used);
            kept.push(node);
        }

        if self.rng.gen_bool(p) {
            kept.shuffle(&mut self.rng);
        }

        while kept.len() < self.config.max_children && self.rng.gen_bool(p) {
            let Some(node) = self.fresh_node(depth, used) else {
                break;
            };
            let at = self.rng.gen_range(0..=kept.len());
            kept.insert(at, node);
        }

        kept
    }

    fn fresh_children(&mut self, depth: usize, used: &mut HashSet<u64>) -> Vec<PlanNode> {
        if depth > self.config.max_depth {
            return Vec::new();
        }
        let count = self.rng.gen_range(0..=self.config.max_children);
        (0..count)
            .filter_map(|_| self.fresh_node(depth, used))
            .collect()
    }

    fn fresh_node(&mut self, depth: usize, used: &mut HashSet<u64>) -> Option<PlanNode> {
        let key = self.unused_key(used)?;
        used.insert(key);
        Some(PlanNode {
            key,
            children: self.fresh_children(depth + 1, used),
        })
    }

    fn unused_key(&mut self, used: &HashSet<u64>) -> Option<u64> {
        if used.len() as u64 >= self.config.id_pool {
            return None;
        }
        // Bounded retries, then a scan
        for _ in 0..16 {
            let key = self.rng.gen_range(0..self.config.id_pool);
            if !used.contains(&key) {
                return Some(key);
            }
        }
        (0..self.config.id_pool).find(|key| !used.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_light_fuzz() {
        let mut fuzzer = GenerationFuzzer::new(FuzzerConfig::light());
        let report = fuzzer.run();

        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.rounds, 20);
        assert!(report.patches.total() > 0);
    }

    #[test]
    fn test_seeds_are_deterministic() {
        let config = FuzzerConfig::light().with_seed(7);
        let a = GenerationFuzzer::new(config.clone()).run();
        let b = GenerationFuzzer::new(config).run();

        assert_eq!(a.patches, b.patches);
        assert_eq!(a.mismatches, b.mismatches);
    }

    #[test]
    fn test_adversarial_fuzz() {
        for seed in 0..4 {
            let config = FuzzerConfig {
                rounds: 50,
                ..FuzzerConfig::adversarial()
            }
            .with_seed(seed);
            let report = GenerationFuzzer::new(config).run();
            assert!(report.is_valid(), "seed {}: {:?}", seed, report.violations);
            assert!(report.mismatches <= report.resyncs);
        }
    }

    #[test]
    fn test_small_pool_stays_unique() {
        let config = FuzzerConfig {
            rounds: 30,
            max_children: 8,
            max_depth: 3,
            id_pool: 12,
            mutation_prob: 0.8,
            seed: 3,
        };
        let report = GenerationFuzzer::new(config).run();
        assert!(report.is_valid(), "{:?}", report.violations);
    }

    #[test]
    fn test_plan_tags_follow_keys() {
        let node = PlanNode {
            key: 8,
            children: Vec::new(),
        };
        assert_eq!(node.tag(), TAGS[2]);

        let sibling = PlanNode {
            key: 9,
            children: vec![],
        };
        let mut builder = TreeBuilder::new(ElementNode::factory);
        let roots = builder.build(|b| declare_plan(b, &[node.clone(), sibling]));
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].tag(), "ul");
        assert_ne!(roots[0].id(), roots[1].id());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_any_seed_is_valid(seed in any::<u64>(), mutation_prob in 0.0f64..1.0) {
            let config = FuzzerConfig {
                rounds: 15,
                mutation_prob,
                ..FuzzerConfig::light()
            }
            .with_seed(seed);
            let report = GenerationFuzzer::new(config).run();
            prop_assert!(report.is_valid(), "{:?}", report.violations);
        }
    }
}
