use crate::trie::{NGramTrie, NodeLayout};
use crate::vocab::WordId;

use super::{candidate_children, history_at, uniform};

/// Interpolated absolute discounting with one discount per order.
pub(crate) fn abs_disc<L: NodeLayout>(
    trie: &NGramTrie<L>,
    history: &[WordId],
    words: &[WordId],
    num_word_types: usize,
    discounts: &[f64],
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
        let d = discounts[j];
        interpolate(
            &mut vp,
            candidate_children(node, words).map(|(i, c)| (i, f64::from(c.count()))),
            cs,
            d,
            n1prx,
        );
    }
    vp
}

/// `p = max(c - D, 0) / total + (D * types / total) * p_lower`.
pub(super) fn interpolate(
    vp: &mut [f64],
    counts: impl Iterator<Item = (usize, f64)>,
    total: f64,
    d: f64,
    types: usize,
) {
    let lambda = d * types as f64 / total;
    for p in vp.iter_mut() {
        *p *= lambda;
    }
    for (i, c) in counts {
        vp[i] += (c - d).max(0.0) / total;
    }
}
