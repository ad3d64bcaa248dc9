//! Fenwick (binary indexed) tree over ranked slots.
//!
//! Supports point update and prefix query in O(log n), O(n) construction
//! from a slice, and O(log n) append at the end.

use std::ops::{Add, Sub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenwickTree<T> {
    /// 1-based; `tree[0]` is an unused sentinel.
    tree: Vec<T>,
}

fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl<T> Default for FenwickTree<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T>,
{
    fn default() -> Self {
        FenwickTree::new()
    }
}

impl<T> FenwickTree<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T>,
{
    pub fn new() -> Self {
        FenwickTree {
            tree: vec![T::default()],
        }
    }

    /// Build from slot values in O(n).
    pub fn from_values(values: &[T]) -> Self {
        let mut tree = Vec::with_capacity(values.len() + 1);
        tree.push(T::default());
        tree.extend_from_slice(values);

        let n = values.len();
        for i in 1..=n {
            let parent = i + lowbit(i);
            if parent <= n {
                tree[parent] = tree[parent] + tree[i];
            }
        }
        FenwickTree { tree }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.tree.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add `delta` to slot `index` (0-based).
    pub fn add(&mut self, index: usize, delta: T) {
        let n = self.len();
        let mut i = index + 1;
        while i <= n {
            self.tree[i] = self.tree[i] + delta;
            i += lowbit(i);
        }
    }

    /// Sum of slots `0..=index`. Indices past the end are clamped.
    pub fn prefix_sum(&self, index: usize) -> T {
        self.sum_first((index + 1).min(self.len()))
    }

    /// Sum of every slot.
    pub fn total(&self) -> T {
        self.sum_first(self.len())
    }

    /// Append a new last slot holding `value`.
    pub fn push(&mut self, value: T) {
        let i = self.tree.len();
        let covered = self.sum_first(i - 1) - self.sum_first(i - lowbit(i));
        self.tree.push(value + covered);
    }

    /// Sum of the first `count` slots.
    fn sum_first(&self, count: usize) -> T {
        let mut sum = T::default();
        let mut i = count;
        while i > 0 {
            sum = sum + self.tree[i];
            i -= lowbit(i);
        }
        sum
    }
}
