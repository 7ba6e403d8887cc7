use crate::trie::{NGramTrie, NodeLayout};
use crate::vocab::WordId;

use super::{candidate_children, history_at, uniform};

/// Interpolated Witten-Bell.
///
/// `p = (1 - l) * c(w) / cs + l * p_lower` with
/// `l = N1+(h*) / (N1+(h*) + cs)`.
pub(crate) fn witten_bell<L: NodeLayout>(
    trie: &NGramTrie<L>,
    history: &[WordId],
    words: &[WordId],
    num_word_types: usize,
) -> Vec<f64> {
    let mut vp = uniform(num_word_types, words.len());
    for j in 0..=history.len() {
        let Some(node) = trie.get_node(history_at(history, j)) else {
            continue;
        };
        let n1prx = node.n1prx();
        if n1prx == 0 {
            break;
        }
        let cs = node.sum_child_counts() as f64;
        let lambda = n1prx as f64 / (n1prx as f64 + cs);

        for p in vp.iter_mut() {
            *p *= lambda;
        }
        for (i, child) in candidate_children(node, words) {
            vp[i] += (1.0 - lambda) * f64::from(child.count()) / cs;
        }
    }
    vp
}
