use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key, key)).is_none());
        tree.assert_invariants();
    }

    tree
}

fn keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn root_key(tree: &AvlTree<TestNode>) -> Option<u32> {
    tree.root.map(|root| unsafe { root.as_ref().key })
}

fn balance_of(tree: &AvlTree<TestNode>, key: u32) -> i8 {
    tree.get(&key).expect("key not found").links.balance()
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key, key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(tree.remove(key).map(|node| node.key), Some(*key));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_every_order_of_five() {
    fn permutations(items: &mut Vec<u32>, k: usize, out: &mut Vec<Vec<u32>>) {
        if k == items.len() {
            out.push(items.clone());
            return;
        }

        for i in k..items.len() {
            items.swap(k, i);
            permutations(items, k + 1, out);
            items.swap(k, i);
        }
    }

    let mut orders = Vec::new();
    permutations(&mut Vec::from([0, 1, 2, 3, 4]), 0, &mut orders);
    assert_eq!(orders.len(), 120);

    for order in &orders {
        insert_remove_all(order);
    }
}

#[test]
fn ascending_insert_rotates_left() {
    let tree = tree_of(&[1, 2, 3]);

    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(model::shape(&tree), [
        (1, 0, Some(2), None, None),
        (2, 0, None, Some(1), Some(3)),
        (3, 0, Some(2), None, None),
    ]);
}

#[test]
fn descending_insert_rotates_right() {
    let tree = tree_of(&[3, 2, 1]);

    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(balance_of(&tree, 2), 0);
}

#[test]
fn zig_zag_insert() {
    // 3 -> 1 -> 2 leans left, then right.
    let tree = tree_of(&[3, 1, 2]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(keys(&tree), [1, 2, 3]);

    let tree = tree_of(&[1, 3, 2]);
    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(keys(&tree), [1, 2, 3]);
}

#[test]
fn zig_zag_insert_below_root() {
    let mut tree = tree_of(&[20, 10, 30, 5, 15, 25, 12]);
    assert_eq!(balance_of(&tree, 15), -1);

    // 13 lands right of 12, which is left of 15.
    tree.insert(TestNode::new(13, 13));
    tree.assert_invariants();

    let thirteen = tree.get(&13).unwrap();
    assert_eq!(thirteen.links.parent(), tree.get_raw(&10));
    assert_eq!(keys(&tree), [5, 10, 12, 13, 15, 20, 25, 30]);
}

#[test]
fn mixed_insert_sequence() {
    let inserted = [10, 3, 2, 15, 12, 11, 14, 13, 16, 17];
    let tree = tree_of(&inserted);

    assert_eq!(keys(&tree), [2, 3, 10, 11, 12, 13, 14, 15, 16, 17]);
    assert_eq!(tree.len(), inserted.len());
}

#[test]
fn remove_root_with_two_children() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
    assert_eq!(root_key(&tree), Some(4));

    let removed = tree.remove(&4).expect("4 is present");
    assert_eq!(removed.key, 4);
    assert_eq!(removed.links.parent(), None);
    assert!(removed.links.is_leaf());

    assert_eq!(root_key(&tree), Some(3));
    tree.assert_invariants();
    assert_eq!(keys(&tree), [1, 2, 3, 5, 6, 7]);
}

#[test]
fn sequential_insert_is_perfectly_balanced() {
    let tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);

    assert_eq!(root_key(&tree), Some(4));
    assert_eq!(tree.height(), 3);
    assert!(tree.iter().all(|node| node.links.balance() == 0));
}

#[test]
fn remove_with_adjacent_predecessor() {
    // 2's predecessor is its own left child.
    let mut tree = tree_of(&[2, 1, 3]);
    assert!(tree.remove(&2).is_some());

    assert_eq!(root_key(&tree), Some(1));
    assert_eq!(balance_of(&tree, 1), 1);
    tree.assert_invariants();
}

#[test]
fn remove_with_zero_balance_taller_child() {
    // Removing 1 leaves 2 right-heavy by two, with 4 balanced: a single rotation that does not
    // change the height of the subtree.
    let mut tree = tree_of(&[2, 1, 4, 3, 5]);
    assert_eq!(balance_of(&tree, 4), 0);

    assert!(tree.remove(&1).is_some());
    tree.assert_invariants();

    assert_eq!(root_key(&tree), Some(4));
    assert_eq!(balance_of(&tree, 4), -1);
    assert_eq!(balance_of(&tree, 2), 1);
}

#[test]
fn remove_requiring_double_rotation() {
    let mut tree = tree_of(&[5, 2, 8, 1, 4, 9, 3]);
    assert!(tree.remove(&9).is_some());
    tree.assert_invariants();
    assert_eq!(keys(&tree), [1, 2, 3, 4, 5, 8]);
}

#[test]
fn remove_absent_is_noop() {
    let mut tree = tree_of(&[1, 2, 3]);
    let before = model::shape(&tree);

    assert!(tree.remove(&42).is_none());
    assert_eq!(model::shape(&tree), before);
    assert_eq!(tree.len(), 3);
}

#[test]
fn duplicate_insert_replaces_in_place() {
    let mut tree = tree_of(&[5, 3, 8, 1, 4]);
    let before = model::shape(&tree);

    let old = tree.insert(TestNode::new(3, 33)).expect("3 was present");
    assert_eq!((old.key, old.value), (3, 3));
    assert_eq!(old.links.parent(), None);

    assert_eq!(model::shape(&tree), before);
    assert_eq!(tree.get(&3).map(|node| node.value), Some(33));
    assert_eq!(tree.len(), 5);
    tree.assert_invariants();
}

#[test]
fn rotation_relinks_three_nodes() {
    let mut tree = tree_of(&[2, 1, 4, 3, 5]);
    let pivot = tree.get_raw(&2).unwrap();
    let before = keys(&tree);

    let up = unsafe { tree.rotate(pivot, Dir::Left) };
    assert_eq!(unsafe { up.as_ref().key }, 4);
    assert_eq!(root_key(&tree), Some(4));

    // 3 moved across from 4 to 2.
    let three = tree.get(&3).unwrap();
    assert_eq!(three.links.parent(), Some(pivot));
    assert_eq!(keys(&tree), before);

    let up = unsafe { tree.rotate(up, Dir::Right) };
    assert_eq!(up, pivot);

    // Rotating back restores the previous shape, balance factors included.
    tree.assert_invariants();
}

#[test]
fn swap_nodes_keeps_balance_with_position() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7, 8]);
    let six = tree.get_raw(&6).unwrap();
    let eight = tree.get_raw(&8).unwrap();

    let six_balance = balance_of(&tree, 6);
    let eight_balance = balance_of(&tree, 8);

    unsafe {
        tree.swap_nodes(six, eight);
        assert_eq!(tree.links(eight).balance(), six_balance);
        assert_eq!(tree.links(six).balance(), eight_balance);

        // Swap back so the tree is ordered for the invariant check.
        tree.swap_nodes(six, eight);
    }

    tree.assert_invariants();
}

#[test]
fn swap_positions_of_siblings_and_parent_child() {
    let mut tree = tree_of(&[2, 1, 3]);
    let one = tree.get_raw(&1).unwrap();
    let two = tree.get_raw(&2).unwrap();
    let three = tree.get_raw(&3).unwrap();

    unsafe {
        tree.swap_positions(one, three);
        assert_eq!(tree.links(two).left(), Some(three));
        assert_eq!(tree.links(two).right(), Some(one));
        tree.swap_positions(three, one);

        tree.swap_positions(two, one);
        assert_eq!(tree.root, Some(one));
        assert_eq!(tree.links(one).left(), Some(two));
        assert_eq!(tree.links(two).parent(), Some(one));
        tree.swap_positions(one, two);
    }

    tree.assert_invariants();
}

#[test]
fn swap_positions_with_itself_is_noop() {
    let mut tree = tree_of(&[2, 1, 3]);
    let before = model::shape(&tree);
    let two = tree.get_raw(&2).unwrap();

    unsafe { tree.swap_positions(two, two) };

    assert_eq!(model::shape(&tree), before);
    tree.assert_invariants();
}

#[test]
fn predecessor_and_successor() {
    let tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);

    for key in 1..=7 {
        let node = tree.get_raw(&key).unwrap();
        let pred = unsafe { tree.predecessor_raw(node) }.map(|p| unsafe { p.as_ref().key });
        let succ = unsafe { tree.successor_raw(node) }.map(|s| unsafe { s.as_ref().key });

        assert_eq!(pred, (key > 1).then(|| key - 1));
        assert_eq!(succ, (key < 7).then(|| key + 1));
    }
}

#[test]
fn iter_both_ends() {
    let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next().map(|n| n.key), Some(1));
    assert_eq!(iter.next_back().map(|n| n.key), Some(9));
    assert_eq!(iter.len(), 5);

    let rest: Vec<_> = iter.map(|n| n.key).collect();
    assert_eq!(rest, [3, 4, 5, 7, 8]);

    let rev: Vec<_> = tree.iter().rev().map(|n| n.key).collect();
    assert_eq!(rev, [9, 8, 7, 5, 4, 3, 1]);
}

#[test]
fn cursor_walks_through_ghost() {
    let tree = tree_of(&[2, 1, 3]);

    let mut curs = tree.cursor_first();
    assert_eq!(curs.get().map(|n| n.key), Some(1));
    assert_eq!(curs.peek_prev().map(|n| n.key), None);

    curs.move_next();
    curs.move_next();
    assert_eq!(curs.get().map(|n| n.key), Some(3));

    curs.move_next();
    assert!(curs.get().is_none());
    assert_eq!(curs.peek_next().map(|n| n.key), Some(1));

    let curs = tree.cursor_last();
    assert_eq!(curs.get().map(|n| n.key), Some(3));
}

#[test]
fn check_invariants_reports_bad_balance() {
    let mut tree = tree_of(&[2, 1, 3]);
    let root = tree.root.unwrap();

    unsafe { tree.links_mut(root).set_balance(1) };
    assert_eq!(
        tree.check_invariants(),
        Err(InvariantViolation::BalanceMismatch {
            stored: 1,
            computed: 0
        })
    );

    unsafe { tree.links_mut(root).set_balance(0) };
    assert_eq!(tree.check_invariants(), Ok(()));
}

#[test]
fn clear_releases_everything() {
    let mut tree = tree_of(&(0..64).collect::<Vec<_>>());
    assert_eq!(tree.len(), 64);

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.first().is_none());
    assert_eq!(tree.check_invariants(), Ok(()));
}

fn assert_height_bound(tree: &AvlTree<TestNode>) {
    // The sparsest AVL tree with `h` levels holds `min(h - 1) + min(h - 2) + 1` nodes.
    let (mut min_nodes, mut prev) = (0usize, 0usize);
    for _ in 0..tree.height() {
        (min_nodes, prev) = (min_nodes + prev + 1, min_nodes);
    }

    assert!(
        tree.len() >= min_nodes,
        "{} levels is too tall for {} nodes",
        tree.height(),
        tree.len()
    );
}

#[test]
fn scattered_insert_then_remove_stays_within_height_bound() {
    // 7919 is coprime with 1000, so this visits every key once in a scattered order.
    let order: Vec<u32> = (0..1000).map(|i| (i * 7919) % 1000).collect();
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in &order {
        assert!(tree.insert(TestNode::new(key, key)).is_none());
        assert_height_bound(&tree);
    }

    tree.assert_invariants();
    assert_eq!(keys(&tree), (0..1000).collect::<Vec<_>>());

    for &key in order.iter().rev().step_by(2) {
        assert_eq!(tree.remove(&key).map(|node| node.key), Some(key));
        assert_height_bound(&tree);
    }

    tree.assert_invariants();
    assert_eq!(tree.len(), 500);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        keys in proptest::collection::vec(any::<u32>(), 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(keys, ops);
    }

    #[test]
    fn insert_then_remove_all_in_any_order(
        (inserted, removed) in proptest::collection::btree_set(0u32..10_000, 0..300)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_flat_map(|keys| {
                (Just(keys.clone()).prop_shuffle(), Just(keys).prop_shuffle())
            }),
    ) {
        let mut tree: AvlTree<TestNode> = AvlTree::new();

        for &key in &inserted {
            tree.insert(TestNode::new(key, key));
            tree.assert_invariants();
            assert_height_bound(&tree);
        }

        for key in &removed {
            prop_assert_eq!(tree.remove(key).map(|node| node.key), Some(*key));
            tree.assert_invariants();
            assert_height_bound(&tree);
        }

        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.height(), 0);
    }
}
