//! Binary search tree primitives.
//!
//! Nothing in this module reads or writes balance factors. Keeping the tree balanced is the job of
//! the callers in `balance` and `lib`.

use core::{
    borrow::Borrow,
    cmp::Ordering,
    ptr::{self, NonNull},
};

use crate::{AvlTree, Dir, Link, Links, TreeNode};

/// The outcome of descending the tree in search of a key.
pub(crate) enum Search<T: ?Sized> {
    Found(NonNull<T>),
    Vacant(Slot<T>),
}

/// A vacant position in the tree where a new leaf may be linked.
pub(crate) enum Slot<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Slot<T> {}

// A child pointer of a particular node, or the root pointer if `None`.
type Position<T> = Option<(NonNull<T>, Dir)>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn search<Q>(&self, key: &Q) -> Search<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return Search::Vacant(Slot::Root);
        };

        loop {
            let dir = match key.cmp(unsafe { self.key_of(cur) }.borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Search::Found(cur),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return Search::Vacant(Slot::Child { parent: cur, dir }),
            }
        }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Search::Found(node) => Some(node),
            Search::Vacant(_) => None,
        }
    }

    // Links `ptr` into the tree as a leaf at `slot`.
    //
    // `ptr`'s links must be clear. Balance factors are not updated.
    pub(crate) unsafe fn insert_leaf(&mut self, slot: Slot<T>, ptr: NonNull<T>) {
        unsafe {
            debug_assert!(self.links(ptr).is_leaf());

            match slot {
                Slot::Root => {
                    debug_assert!(self.root.is_none());
                    self.root = Some(ptr);
                }

                Slot::Child { parent, dir } => {
                    let prev = self.links_mut(parent).set_child(dir, Some(ptr));
                    debug_assert!(prev.is_none(), "slot must be vacant");
                    self.links_mut(ptr).set_parent(Some(parent));
                }
            }
        }
    }

    pub(crate) fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Left) })
    }

    pub(crate) fn last_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Right) })
    }

    // Returns the node reached by following `dir` links down from `root`.
    //
    // For `Dir::Left` this is the minimum node in the subtree, for `Dir::Right` the maximum.
    #[inline]
    pub(crate) unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(child) = unsafe { self.links(cur).child(dir) } {
            cur = child;
        }

        cur
    }

    // Returns the in-order neighbor of `node` on the `dir` side: the predecessor for `Dir::Left`,
    // the successor for `Dir::Right`.
    pub(crate) unsafe fn neighbor_raw(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(child) = self.links(node).child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            // Climb until arriving from the opposite side.
            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                if self.which_child(parent, cur) == !dir {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    #[inline]
    pub(crate) unsafe fn predecessor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Left) }
    }

    #[inline]
    pub(crate) unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Right) }
    }

    // Unlinks `node`, which has at most one child, elevating that child into its place.
    //
    // `node`'s links are cleared.
    pub(crate) unsafe fn splice(&mut self, node: NonNull<T>) {
        unsafe {
            let links = self.links(node);
            debug_assert!(
                links.left().is_none() || links.right().is_none(),
                "spliced node must not have two children"
            );

            let parent = links.parent();
            let child = links.left().or(links.right());

            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);

            self.links_mut(node).clear();
        }
    }

    // Exchanges the positions of `a` and `b` in the tree, including the case where one is the
    // parent of the other.
    //
    // Balance factors stay with the nodes, not the positions.
    pub(crate) unsafe fn swap_positions(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if ptr::addr_eq(a.as_ptr(), b.as_ptr()) {
            return;
        }

        unsafe {
            // If the nodes are adjacent, let `a` be the parent.
            let (a, b) = if self.links(a).parent() == Some(b) {
                (b, a)
            } else {
                (a, b)
            };

            let a_parent = self.links(a).parent();
            let a_pos = a_parent.map(|p| (p, self.which_child(p, a)));
            let b_pos = self.links(b).parent().map(|p| (p, self.which_child(p, b)));

            let a_children = [self.links(a).left(), self.links(a).right()];
            let b_children = [self.links(b).left(), self.links(b).right()];

            match b_pos {
                Some((p, dir)) if ptr::addr_eq(p.as_ptr(), a.as_ptr()) => {
                    // `b` is the `dir` child of `a`. `b` moves up, keeping `a`'s other child.
                    self.set_position(a_pos, Some(b));
                    self.links_mut(b).set_parent(a_parent);

                    let across = a_children[(!dir) as usize];
                    self.links_mut(b).set_child(dir, Some(a));
                    self.links_mut(b).set_child(!dir, across);
                    self.maybe_set_parent(across, Some(b));

                    self.links_mut(a).set_parent(Some(b));
                }

                _ => {
                    // `a_pos` and `b_pos` may share a parent, so both are written by direction.
                    self.set_position(a_pos, Some(b));
                    self.set_position(b_pos, Some(a));

                    self.links_mut(a).set_parent(b_pos.map(|(p, _)| p));
                    self.links_mut(b).set_parent(a_parent);

                    for dir in [Dir::Left, Dir::Right] {
                        let child = a_children[dir as usize];
                        self.links_mut(b).set_child(dir, child);
                        self.maybe_set_parent(child, Some(b));
                    }
                }
            }

            for dir in [Dir::Left, Dir::Right] {
                let child = b_children[dir as usize];
                self.links_mut(a).set_child(dir, child);
                self.maybe_set_parent(child, Some(a));
            }
        }
    }

    #[inline]
    unsafe fn set_position(&mut self, pos: Position<T>, node: Link<T>) {
        match pos {
            Some((parent, dir)) => unsafe {
                self.links_mut(parent).set_child(dir, node);
            },
            None => self.root = node,
        }
    }

    #[inline]
    pub(crate) unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`, and points
    // `new_child`'s parent pointer at `parent`.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    pub(crate) unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                self.links(parent).child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );

            if let Some(new_child) = new_child {
                debug_assert_ne!(
                    self.links(parent).child(!dir),
                    Some(new_child),
                    "`new_child` must not be a child of `parent`"
                );
            }

            self.links_mut(parent).set_child(dir, new_child);
            self.maybe_set_parent(new_child, Some(parent));
        }
    }

    #[inline]
    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { self.links(parent).left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}
