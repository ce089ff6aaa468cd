use core::{cmp, ptr::NonNull};

use thiserror::Error;

use crate::{AvlTree, Link, Links, TreeNode};

/// A structural defect found by [`AvlTree::check_invariants`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("the root node has a parent")]
    RootHasParent,

    #[error("a child's parent link does not point at its parent")]
    BrokenParentLink,

    #[error("keys are not strictly increasing in order")]
    OutOfOrder,

    #[error("stored balance factor {stored} differs from the computed balance factor {computed}")]
    BalanceMismatch { stored: i8, computed: i32 },

    #[error("balance factor {balance} is outside of -1..=1")]
    Unbalanced { balance: i8 },

    #[error("the tree reports {len} elements but holds {counted}")]
    LenMismatch { len: usize, counted: usize },
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Verifies the structure of the tree.
    ///
    /// Every balance factor is recomputed from the heights of the subtrees, the in-order key
    /// sequence is checked for strict ordering, and every parent link is followed back. This
    /// completes in _O(n)_ time.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.root else {
            return match self.len {
                0 => Ok(()),
                len => Err(InvariantViolation::LenMismatch { len, counted: 0 }),
            };
        };

        unsafe {
            if self.links(root).parent().is_some() {
                return Err(InvariantViolation::RootHasParent);
            }

            let mut counted = 0;
            let mut prev = None;
            self.check_subtree(root, &mut counted, &mut prev)?;

            if counted != self.len {
                return Err(InvariantViolation::LenMismatch {
                    len: self.len,
                    counted,
                });
            }
        }

        Ok(())
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(violation) = self.check_invariants() {
            panic!("AVL invariant violated: {violation}");
        }
    }

    // Checks the subtree rooted at `node` in order, returning its height.
    unsafe fn check_subtree(
        &self,
        node: NonNull<T>,
        counted: &mut usize,
        prev: &mut Link<T>,
    ) -> Result<i32, InvariantViolation> {
        unsafe {
            let links = self.links(node);

            let left_height = match links.left() {
                Some(left) => {
                    if self.links(left).parent() != Some(node) {
                        return Err(InvariantViolation::BrokenParentLink);
                    }

                    self.check_subtree(left, counted, prev)?
                }
                None => -1,
            };

            if let Some(prev) = *prev {
                if self.key_of(prev) >= self.key_of(node) {
                    return Err(InvariantViolation::OutOfOrder);
                }
            }

            *prev = Some(node);
            *counted += 1;

            let right_height = match links.right() {
                Some(right) => {
                    if self.links(right).parent() != Some(node) {
                        return Err(InvariantViolation::BrokenParentLink);
                    }

                    self.check_subtree(right, counted, prev)?
                }
                None => -1,
            };

            let stored = links.balance();
            let computed = right_height - left_height;

            if i32::from(stored) != computed {
                return Err(InvariantViolation::BalanceMismatch { stored, computed });
            }

            if !(-1..=1).contains(&stored) {
                return Err(InvariantViolation::Unbalanced { balance: stored });
            }

            Ok(1 + cmp::max(left_height, right_height))
        }
    }

    // Returns the number of levels in the subtree rooted at `node`.
    pub(crate) unsafe fn levels(&self, node: Link<T>) -> usize {
        let Some(node) = node else {
            return 0;
        };

        unsafe {
            let links = self.links(node);
            1 + cmp::max(self.levels(links.left()), self.levels(links.right()))
        }
    }
}
