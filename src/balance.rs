//! Rotations and the bottom-up fixups which restore the AVL invariant after a structural change.

use core::ptr::NonNull;

use crate::{AvlTree, Dir, Link, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // Rotates the subtree rooted at `pivot` so that `pivot` moves down on the `dir` side.
    //
    // `rotate(pivot, Dir::Left)` is a left rotation: `pivot`'s right child `up` becomes the
    // subtree root, `up`'s left child moves across to become `pivot`'s right child, and `up`
    // takes over `pivot`'s former parent link. `Dir::Right` is the mirror image.
    //
    // Returns `up`. Balance factors are not updated.
    pub(crate) unsafe fn rotate(&mut self, pivot: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            trace!(pivot = ?self.key_of(pivot), ?dir, "avl: rotate");

            let up = self
                .links(pivot)
                .child(!dir)
                .expect("rotation requires a child on the rising side");

            let across = self.links(up).child(dir);
            self.links_mut(pivot).set_child(!dir, across);
            self.maybe_set_parent(across, Some(pivot));

            self.links_mut(up).set_child(dir, Some(pivot));
            let parent = self.links_mut(pivot).set_parent(Some(up));
            self.links_mut(up).set_parent(parent);

            match parent {
                Some(parent) => self.replace_child(parent, pivot, Some(up)),
                None => self.root = Some(up),
            }

            up
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of a leaf.
    //
    // Invariants:
    // - `node` is a child of `parent`.
    // - The subtree rooted at `parent` has just grown by one level, and `parent`'s balance
    //   factor already reflects this.
    pub(crate) unsafe fn insert_fix(&mut self, parent: NonNull<T>, node: NonNull<T>) {
        trace!(parent = ?unsafe { self.key_of(parent) }, "avl: insert fixup");

        let (mut parent, mut node) = (parent, node);

        unsafe {
            // Climb while the subtree keeps growing. Reaching the root ends the walk.
            while let Some(grandparent) = self.links(parent).parent() {
                let dir = self.which_child(grandparent, parent);
                self.links_mut(grandparent).update_balance(dir.sign());

                let balance = self.links(grandparent).balance();

                if balance == 0 {
                    // The shorter side caught up.
                    return;
                }

                if balance == dir.sign() {
                    node = parent;
                    parent = grandparent;
                    continue;
                }

                debug_assert_eq!(balance, 2 * dir.sign());

                if self.which_child(parent, node) == dir {
                    // Zig-zig: `node` and `parent` lean the same way.
                    self.rotate(grandparent, !dir);
                    self.links_mut(grandparent).set_balance(0);
                    self.links_mut(parent).set_balance(0);
                } else {
                    // Zig-zag: lift `node` above both.
                    let node_balance = self.links(node).balance();
                    self.rotate(parent, dir);
                    self.rotate(grandparent, !dir);
                    self.set_double_rotation_balances(grandparent, parent, node, dir, node_balance);
                }

                // A rotation after an insertion always restores the subtree's prior height.
                return;
            }
        }
    }

    // Performs a bottom-up rebalance of the tree after a node was spliced out.
    //
    // `diff` is the change in balance of `parent` caused by the removal: `1` if its left subtree
    // lost a level, `-1` if its right subtree did.
    pub(crate) unsafe fn remove_fix(&mut self, parent: Link<T>, diff: i8) {
        let mut opt_parent = parent;
        let mut diff = diff;

        unsafe {
            trace!(diff, "avl: remove fixup");

            while let Some(parent) = opt_parent {
                // Capture the next step before any rotation relinks `parent`. If the subtree
                // rooted here ends up shorter, whatever node replaced `parent` occupies the same
                // side of `next_parent`.
                let next_parent = self.links(parent).parent();
                let next_diff = match next_parent {
                    Some(next_parent) => -self.which_child(next_parent, parent).sign(),
                    None => 0,
                };

                let balance = self.links(parent).balance() + diff;

                match balance {
                    -2 | 2 => {
                        let heavy = if balance < 0 { Dir::Left } else { Dir::Right };
                        let sign = heavy.sign();

                        let taller = self
                            .links(parent)
                            .child(heavy)
                            .expect("heavy side must have a child");
                        let taller_balance = self.links(taller).balance();

                        if taller_balance == sign {
                            self.rotate(parent, !heavy);
                            self.links_mut(parent).set_balance(0);
                            self.links_mut(taller).set_balance(0);
                        } else if taller_balance == 0 {
                            // The subtree keeps its height, so the walk ends here.
                            self.rotate(parent, !heavy);
                            self.links_mut(parent).set_balance(sign);
                            self.links_mut(taller).set_balance(-sign);
                            return;
                        } else {
                            let middle = self
                                .links(taller)
                                .child(!heavy)
                                .expect("inner grandchild must exist");
                            let middle_balance = self.links(middle).balance();

                            self.rotate(taller, heavy);
                            self.rotate(parent, !heavy);
                            self.set_double_rotation_balances(
                                parent,
                                taller,
                                middle,
                                heavy,
                                middle_balance,
                            );
                        }
                    }

                    -1 | 1 => {
                        // `parent` was even before the removal, so its height is unchanged.
                        self.links_mut(parent).set_balance(balance);
                        return;
                    }

                    _ => {
                        debug_assert_eq!(balance, 0);
                        self.links_mut(parent).set_balance(0);
                    }
                }

                opt_parent = next_parent;
                diff = next_diff;
            }
        }
    }

    // Assigns balance factors after `middle` was lifted above `child` and `top` by a double
    // rotation, where `child` was the `heavy` child of `top` and `middle` was its inner child.
    unsafe fn set_double_rotation_balances(
        &mut self,
        top: NonNull<T>,
        child: NonNull<T>,
        middle: NonNull<T>,
        heavy: Dir,
        middle_balance: i8,
    ) {
        let sign = heavy.sign();

        // `middle`'s subtree on the `heavy` side goes to `child` and its other subtree to `top`.
        // If one of the two was shorter, the node receiving it leans away from it.
        let (child_balance, top_balance) = if middle_balance == sign {
            (0, -sign)
        } else if middle_balance == -sign {
            (sign, 0)
        } else {
            (0, 0)
        };

        unsafe {
            self.links_mut(child).set_balance(child_balance);
            self.links_mut(top).set_balance(top_balance);
            self.links_mut(middle).set_balance(0);
        }
    }

    // Exchanges the positions of two nodes along with their balance factors, so that each balance
    // factor stays with its position rather than moving with its node.
    pub(crate) unsafe fn swap_nodes(&mut self, a: NonNull<T>, b: NonNull<T>) {
        unsafe {
            trace!(a = ?self.key_of(a), b = ?self.key_of(b), "avl: swap nodes");

            self.swap_positions(a, b);

            let a_balance = self.links(a).balance();
            let b_balance = self.links(b).balance();
            self.links_mut(a).set_balance(b_balance);
            self.links_mut(b).set_balance(a_balance);
        }
    }
}
