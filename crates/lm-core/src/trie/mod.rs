//! N-gram trie keyed by word identifier at each level.
//!
//! Depth decides the node shape: interior `TrieNode`s down to depth
//! `order - 2`, `BeforeLastNode`s at `order - 1` that hold their leaves
//! inline, and `LastNode` leaves at `order`. Children are always sorted by
//! word identifier.

mod iter;
mod node;
#[cfg(test)]
mod tests;

pub use iter::NGramIter;
pub use node::{
    BeforeLastNode, Continuations, CountLayout, KneserNeyLayout, LastNode, NodeLayout, NodeMut,
    NodeRef, NodeStats, Predecessors, RecencyLayout, Timed, TrieNode,
};

use std::mem;

use crate::error::LmError;
use crate::vocab::WordId;
use node::{block_capacity, Children};

/// Counts before and after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountChange {
    pub before: u32,
    pub after: u32,
}

#[derive(Debug)]
pub struct NGramTrie<L: NodeLayout> {
    root: TrieNode<L>,
    order: usize,
    /// Distinct n-grams per level, including zero-count nodes.
    num_ngrams: Vec<usize>,
    /// Sum of counts per level.
    total_ngrams: Vec<u64>,
    /// Event counter for recency layouts.
    current_time: u32,
}

impl<L: NodeLayout> NGramTrie<L> {
    /// Create an empty trie. Orders below 2 are raised to 2.
    pub fn new(order: usize) -> Self {
        let order = order.max(2);
        Self {
            root: TrieNode::new(0, 0, order),
            order,
            num_ngrams: vec![0; order],
            total_ngrams: vec![0; order],
            current_time: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Drop every node and start over with `order`.
    pub fn set_order(&mut self, order: usize) {
        *self = Self::new(order);
    }

    pub fn clear(&mut self) {
        self.set_order(self.order);
    }

    pub fn root(&self) -> NodeRef<'_, L> {
        NodeRef::Inner(&self.root)
    }

    /// Distinct n-grams of length `level + 1`.
    pub fn num_ngrams(&self, level: usize) -> usize {
        self.num_ngrams.get(level).copied().unwrap_or(0)
    }

    /// Total occurrences of n-grams of length `level + 1`.
    pub fn total_ngrams(&self, level: usize) -> u64 {
        self.total_ngrams.get(level).copied().unwrap_or(0)
    }

    pub fn current_time(&self) -> u32 {
        self.current_time
    }

    pub(crate) fn set_current_time(&mut self, time: u32) {
        self.current_time = time;
    }

    /// Node for `wids`, or `None` if the path does not exist. The empty
    /// path is the root.
    pub fn get_node(&self, wids: &[WordId]) -> Option<NodeRef<'_, L>> {
        let mut node = self.root();
        for &wid in wids {
            node = node.child(wid)?;
        }
        Some(node)
    }

    pub fn ngram_count(&self, wids: &[WordId]) -> u32 {
        if wids.is_empty() {
            return 0;
        }
        self.get_node(wids).map_or(0, NodeRef::count)
    }

    /// Word identifiers of the children of `wids`.
    pub fn child_word_ids(&self, wids: &[WordId]) -> Vec<WordId> {
        self.get_node(wids)
            .map(|n| n.children().map(NodeRef::word_id).collect())
            .unwrap_or_default()
    }

    /// Walk to the node for `wids`, creating missing nodes with count zero.
    pub fn add_node(&mut self, wids: &[WordId]) -> Result<NodeMut<'_, L>, LmError> {
        if wids.len() > self.order {
            return Err(LmError::OrderUnsupported {
                requested: wids.len(),
                max: self.order,
            });
        }
        let Self {
            root,
            order,
            num_ngrams,
            ..
        } = self;
        let order = *order;

        let mut node: &mut TrieNode<L> = root;
        let mut depth = 0;
        loop {
            let Some(&wid) = wids.get(depth) else {
                return Ok(NodeMut::Inner(node));
            };
            match &mut node.children {
                Children::Inner(children) => {
                    let index = match children.binary_search_by_key(&wid, |c| c.word_id) {
                        Ok(i) => i,
                        Err(i) => {
                            children.try_reserve(1)?;
                            children.insert(i, Box::new(TrieNode::new(wid, depth + 1, order)));
                            num_ngrams[depth] += 1;
                            i
                        }
                    };
                    node = &mut children[index];
                    depth += 1;
                }
                Children::BeforeLast(children) => {
                    let index = match children.binary_search_by_key(&wid, |c| c.word_id) {
                        Ok(i) => i,
                        Err(i) => {
                            children.try_reserve(1)?;
                            children.insert(i, Box::new(BeforeLastNode::new(wid)));
                            num_ngrams[depth] += 1;
                            i
                        }
                    };
                    let before_last = &mut *children[index];
                    let Some(&last_wid) = wids.get(depth + 1) else {
                        return Ok(NodeMut::BeforeLast(before_last));
                    };
                    let leaves = &mut before_last.children;
                    let index = match leaves.binary_search_by_key(&last_wid, |c| c.word_id) {
                        Ok(i) => i,
                        Err(i) => {
                            if leaves.len() == leaves.capacity() {
                                let target = block_capacity(leaves.len() + 1);
                                leaves.try_reserve_exact(target - leaves.len())?;
                            }
                            leaves.insert(i, LastNode::new(last_wid));
                            num_ngrams[depth + 1] += 1;
                            i
                        }
                    };
                    return Ok(NodeMut::Last(&mut leaves[index]));
                }
            }
        }
    }

    /// Add `increment` to the count of `wids`, creating the path as needed.
    ///
    /// Kneser-Ney layouts also record continuation counts the first time
    /// an n-gram's count leaves zero. Recency layouts advance the event
    /// counter and stamp the node.
    pub fn increment_node_count(
        &mut self,
        wids: &[WordId],
        increment: u32,
    ) -> Result<CountChange, LmError> {
        let n = wids.len();
        if n == 0 {
            return Err(LmError::EmptyNGram);
        }
        let before = self.add_node(wids)?.count();

        if L::TRACKS_CONTINUATIONS && before == 0 && increment > 0 {
            // Distinct predecessors of the n-gram minus its oldest word.
            self.add_node(&wids[1..])?.add_n1pxr();
            // Distinct permutations around the n-gram minus both ends.
            if n >= 2 {
                self.add_node(&wids[1..n - 1])?.add_n1pxrx();
            }
        }

        let time = if L::TRACKS_RECENCY {
            self.current_time = self.current_time.wrapping_add(1);
            Some(self.current_time)
        } else {
            None
        };

        let mut node = self.add_node(wids)?;
        let after = node.add_count(increment);
        if let Some(time) = time {
            node.set_time(time);
        }
        self.total_ngrams[n - 1] += u64::from(increment);
        Ok(CountChange { before, after })
    }

    /// Overwrite the timestamp of an existing or new node.
    pub(crate) fn set_node_time(&mut self, wids: &[WordId], time: u32) -> Result<(), LmError> {
        self.add_node(wids)?.set_time(time);
        Ok(())
    }

    /// Depth-first preorder over all nodes except the root.
    pub fn iter(&self) -> NGramIter<'_, L> {
        NGramIter::new(self)
    }

    /// Approximate memory use in bytes.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>() - mem::size_of::<TrieNode<L>>()
            + subtree_size(self.root())
            + self.num_ngrams.capacity() * mem::size_of::<usize>()
            + self.total_ngrams.capacity() * mem::size_of::<u64>()
    }
}

fn subtree_size<L: NodeLayout>(node: NodeRef<'_, L>) -> usize {
    node.own_size() + node.children().map(subtree_size).sum::<usize>()
}
