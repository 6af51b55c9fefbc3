//! Reconciliation engine
//!
//! Walks the previous and next sibling sequences with one cursor each and
//! decides, per step, between matching, adding, removing, moving and
//! replacing. Decisions are O(1) apart from the identity searches on a
//! mismatch, so the worst case is O((p + n) * p). Sibling lists are expected
//! to be short.
//!
//! The engine is pure apart from context transplant: a next-generation node
//! matched to a previous one receives the previous node's context before
//! anything else looks at it.

use tracing::{debug, trace};
use trellis_core::{NodeId, Patch, PatchList, TreeNode};

/// Diff two root sequences
pub fn reconcile<N: TreeNode>(
    parent: &N::Context,
    prev: &[N],
    next: &mut [N],
) -> PatchList<N::Context> {
    let mut patches = PatchList::new();
    reconcile_into(&mut patches, parent, prev, next);
    debug!(
        prev = prev.len(),
        next = next.len(),
        patches = %patches.summary(),
        "reconciled generations"
    );
    patches
}

/// Diff the children of a matched pair, for use in [`TreeNode::diff`]
pub fn reconcile_children<N: TreeNode>(
    patches: &mut PatchList<N::Context>,
    prev: &N,
    next: &mut N,
) {
    reconcile_into(patches, prev.context(), prev.children(), next.children_mut());
}

/// Diff one sibling sequence under `parent`, appending to `patches`
pub fn reconcile_into<N: TreeNode>(
    patches: &mut PatchList<N::Context>,
    parent: &N::Context,
    prev: &[N],
    next: &mut [N],
) {
    let (p, n) = (prev.len(), next.len());
    let (mut i, mut j) = (0, 0);

    for _ in 0..p + n {
        if i >= p && j >= n {
            break;
        }

        if i >= p {
            // Previous exhausted: the rest of next is new or moved
            let id = next[j].id();
            match position(prev, id) {
                None => {
                    trace!(id = %id, "add at end");
                    patches.push(Patch::Add {
                        parent: parent.clone(),
                        id,
                        node: patches.next_path(j),
                        hint: None,
                    });
                }
                Some(k) => {
                    trace!(id = %id, "move to end");
                    next[j].set_context(prev[k].context().clone());
                    patches.push(Patch::Move {
                        parent: parent.clone(),
                        id,
                        node: patches.prev_path(k),
                    });
                }
            }
            j += 1;
        } else if j >= n {
            // Next exhausted: the rest of previous goes
            let id = prev[i].id();
            trace!(id = %id, "remove trailing");
            patches.push(Patch::Remove {
                parent: parent.clone(),
                id,
                node: patches.prev_path(i),
            });
            i += 1;
        } else if prev[i].id() == next[j].id() {
            next[j].set_context(prev[i].context().clone());
            let (prev_node, next_node) = (&prev[i], &mut next[j]);
            patches.descend(i, j, |patches| prev_node.diff(patches, next_node));
            i += 1;
            j += 1;
        } else {
            let prev_id = prev[i].id();
            let next_id = next[j].id();
            let next_in_prev = position(prev, next_id).is_some();
            let prev_in_next = position(next, prev_id).is_some();

            match (next_in_prev, prev_in_next) {
                (false, false) => {
                    trace!(old = %prev_id, new = %next_id, "replace");
                    patches.push(Patch::Replace {
                        parent: parent.clone(),
                        old_id: prev_id,
                        old: patches.prev_path(i),
                        new_id: next_id,
                        new: patches.next_path(j),
                    });
                    i += 1;
                    j += 1;
                }
                (false, true) => {
                    trace!(id = %next_id, before = %prev_id, "insert");
                    patches.push(Patch::Add {
                        parent: parent.clone(),
                        id: next_id,
                        node: patches.next_path(j),
                        hint: Some(prev[i].context().clone()),
                    });
                    j += 1;
                }
                (true, false) => {
                    trace!(id = %prev_id, "remove");
                    patches.push(Patch::Remove {
                        parent: parent.clone(),
                        id: prev_id,
                        node: patches.prev_path(i),
                    });
                    i += 1;
                }
                (true, true) => {
                    // Both still wanted elsewhere; settled by later steps
                    trace!(prev = %prev_id, next = %next_id, "defer");
                    i += 1;
                }
            }
        }
    }
}

fn position<N: TreeNode>(nodes: &[N], id: NodeId) -> Option<usize> {
    nodes.iter().position(|node| node.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, leaf, Item, ROOT};
    use trellis_core::{NodePath, PatchKind};

    fn kinds(patches: &PatchList<u64>) -> Vec<(PatchKind, u64)> {
        patches.iter().map(|p| (p.kind(), p.id().get())).collect()
    }

    #[test]
    fn test_add_only() {
        let mut next = vec![leaf(1)];
        let patches = reconcile(&ROOT, &[], &mut next);
        assert_eq!(kinds(&patches), vec![(PatchKind::Add, 1)]);
        assert_eq!(
            patches.as_slice()[0],
            Patch::Add {
                parent: ROOT,
                id: NodeId(1),
                node: NodePath::from(vec![0]),
                hint: None,
            }
        );
    }

    #[test]
    fn test_remove_only() {
        let prev = vec![leaf(1).with_context(5)];
        let patches = reconcile(&ROOT, &prev, &mut []);
        assert_eq!(kinds(&patches), vec![(PatchKind::Remove, 1)]);
    }

    #[test]
    fn test_stable_match_transplants_context() {
        let prev = vec![leaf(1).with_context(42)];
        let mut next = vec![leaf(1)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert!(patches.is_empty());
        assert_eq!(next[0].context, 42);
    }

    #[test]
    fn test_append() {
        let prev = vec![leaf(1).with_context(7)];
        let mut next = vec![leaf(1), leaf(2)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(kinds(&patches), vec![(PatchKind::Add, 2)]);
        assert_eq!(next[0].context, 7);
    }

    #[test]
    fn test_truncate() {
        let prev = vec![leaf(1).with_context(7), leaf(2).with_context(8)];
        let mut next = vec![leaf(1)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(kinds(&patches), vec![(PatchKind::Remove, 2)]);
        assert_eq!(
            patches.as_slice()[0],
            Patch::Remove {
                parent: ROOT,
                id: NodeId(2),
                node: NodePath::from(vec![1]),
            }
        );
    }

    #[test]
    fn test_unrelated_replace() {
        let prev = vec![leaf(1).with_context(7)];
        let mut next = vec![leaf(2)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            patches.into_vec(),
            vec![Patch::Replace {
                parent: ROOT,
                old_id: NodeId(1),
                old: NodePath::from(vec![0]),
                new_id: NodeId(2),
                new: NodePath::from(vec![0]),
            }]
        );
        // Unmatched nodes keep their own context
        assert_eq!(next[0].context, 0);
    }

    #[test]
    fn test_insert_before_surviving_node() {
        let prev = vec![leaf(1).with_context(7)];
        let mut next = vec![leaf(3), leaf(1)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            patches.into_vec(),
            vec![Patch::Add {
                parent: ROOT,
                id: NodeId(3),
                node: NodePath::from(vec![0]),
                hint: Some(7),
            }]
        );
        assert_eq!(next[1].context, 7);
    }

    #[test]
    fn test_remove_before_surviving_node() {
        let prev = vec![leaf(2).with_context(8), leaf(1).with_context(7)];
        let mut next = vec![leaf(1)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(kinds(&patches), vec![(PatchKind::Remove, 2)]);
        assert_eq!(next[0].context, 7);
    }

    #[test]
    fn test_swap_defers_then_moves() {
        let prev = vec![leaf(1).with_context(7), leaf(2).with_context(8)];
        let mut next = vec![leaf(2), leaf(1)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            patches.into_vec(),
            vec![Patch::Move {
                parent: ROOT,
                id: NodeId(1),
                node: NodePath::from(vec![0]),
            }]
        );
        assert_eq!(next[0].context, 8);
        assert_eq!(next[1].context, 7);
    }

    #[test]
    fn test_rotation_moves_each_displaced_node() {
        let prev: Vec<Item> = (1..=3).map(|id| leaf(id).with_context(id * 10)).collect();
        let mut next = vec![leaf(3), leaf(1), leaf(2)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            kinds(&patches),
            vec![(PatchKind::Move, 1), (PatchKind::Move, 2)]
        );
        let contexts: Vec<u64> = next.iter().map(|n| n.context).collect();
        assert_eq!(contexts, vec![30, 10, 20]);
    }

    #[test]
    fn test_nested_diff_uses_child_paths() {
        let children = vec![leaf(10).with_context(100), leaf(11).with_context(101)];
        let prev = vec![item(1, children).with_context(9)];
        let mut next = vec![item(1, vec![leaf(10), leaf(12)])];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            patches.into_vec(),
            vec![Patch::Replace {
                parent: 9,
                old_id: NodeId(11),
                old: NodePath::from(vec![0, 1]),
                new_id: NodeId(12),
                new: NodePath::from(vec![0, 1]),
            }]
        );
        assert_eq!(next[0].context, 9);
        assert_eq!(next[0].children[0].context, 100);
    }

    #[test]
    fn test_nested_paths_follow_both_generations() {
        // Parent sits at index 1 in prev and index 0 in next
        let prev = vec![
            leaf(5).with_context(50),
            item(1, vec![leaf(10).with_context(100)]).with_context(9),
        ];
        let mut next = vec![item(1, vec![leaf(10), leaf(11)])];
        let patches = reconcile(&ROOT, &prev, &mut next);

        assert_eq!(
            patches.into_vec(),
            vec![
                Patch::Remove {
                    parent: ROOT,
                    id: NodeId(5),
                    node: NodePath::from(vec![0]),
                },
                Patch::Add {
                    parent: 9,
                    id: NodeId(11),
                    node: NodePath::from(vec![0, 1]),
                    hint: None,
                },
            ]
        );
    }

    #[test]
    fn test_moved_node_children_not_diffed() {
        let prev = vec![
            item(1, vec![leaf(10).with_context(100)]).with_context(7),
            leaf(2).with_context(8),
        ];
        let mut next = vec![leaf(2), item(1, vec![leaf(10), leaf(11)])];
        let patches = reconcile(&ROOT, &prev, &mut next);

        // Node 1 is moved wholesale; its new child is not reported
        assert_eq!(kinds(&patches), vec![(PatchKind::Move, 1)]);
        assert_eq!(next[1].context, 7);
        assert_eq!(next[1].children[0].context, 0);
    }

    #[test]
    fn test_mixed_edit_sequence() {
        let prev: Vec<Item> = [1, 2, 3, 4]
            .into_iter()
            .map(|id| leaf(id).with_context(id * 10))
            .collect();
        let mut next = vec![leaf(1), leaf(5), leaf(3), leaf(2)];
        let patches = reconcile(&ROOT, &prev, &mut next);

        // 1 matches; 2 vs 5: 5 is new, 2 survives -> insert 5 before 2;
        // 2 vs 3: both survive -> defer; 3 matches; 4 vs 2: 2 known, 4 gone
        // -> remove 4; previous exhausted -> move 2 to the end
        assert_eq!(
            kinds(&patches),
            vec![
                (PatchKind::Add, 5),
                (PatchKind::Remove, 4),
                (PatchKind::Move, 2)
            ]
        );
        assert_eq!(patches.as_slice()[0].parent(), &ROOT);
        if let Patch::Add { hint, .. } = &patches.as_slice()[0] {
            assert_eq!(*hint, Some(20));
        }
    }
}
