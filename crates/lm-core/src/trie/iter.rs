use super::{NGramTrie, NodeLayout, NodeRef};
use crate::vocab::WordId;

/// Depth-first preorder traversal yielding each n-gram with its node.
///
/// The root is not yielded. Siblings come out in word identifier order.
pub struct NGramIter<'a, L: NodeLayout> {
    /// Nodes on the current path with the index of their next child.
    stack: Vec<(NodeRef<'a, L>, usize)>,
    path: Vec<WordId>,
}

impl<'a, L: NodeLayout> NGramIter<'a, L> {
    pub(super) fn new(trie: &'a NGramTrie<L>) -> Self {
        let mut stack = Vec::with_capacity(trie.order() + 1);
        stack.push((trie.root(), 0));
        Self {
            stack,
            path: Vec::with_capacity(trie.order()),
        }
    }
}

impl<'a, L: NodeLayout> Iterator for NGramIter<'a, L> {
    type Item = (Vec<WordId>, NodeRef<'a, L>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, next_child) = self.stack.last_mut()?;
            match node.child_at(*next_child) {
                Some(child) => {
                    *next_child += 1;
                    self.path.push(child.word_id());
                    self.stack.push((child, 0));
                    return Some((self.path.clone(), child));
                }
                None => {
                    self.stack.pop();
                    self.path.pop();
                }
            }
        }
    }
}
