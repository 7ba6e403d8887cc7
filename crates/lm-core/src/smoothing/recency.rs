use crate::trie::{NGramTrie, NodeLayout, NodeRef};
use crate::vocab::WordId;

use super::{candidate_children, history_at, uniform};

/// Jelinek-Mercer interpolation of exponentially decayed recency weights.
///
/// A child last used `dt` events ago weighs `2^(-dt / halflife)`; order `j`
/// is blended in with the fixed weight `lambdas[j]`.
pub(crate) fn jelinek_mercer_recency<L: NodeLayout>(
    trie: &NGramTrie<L>,
    history: &[WordId],
    words: &[WordId],
    num_word_types: usize,
    halflife: u32,
    lambdas: &[f64],
) -> Vec<f64> {
    let now = trie.current_time();
    let halflife = f64::from(halflife.max(1));
    let weight = |node: NodeRef<'_, L>| (-f64::from(now.wrapping_sub(node.time())) / halflife).exp2();

    let mut vp = uniform(num_word_types, words.len());
    for j in 0..=history.len() {
        let Some(node) = trie.get_node(history_at(history, j)) else {
            continue;
        };
        if node.n1prx() == 0 {
            break;
        }
        let total: f64 = node.children().map(weight).sum();
        if total <= 0.0 {
            continue;
        }
        let lambda = lambdas.get(j).copied().unwrap_or(0.0);
        for p in vp.iter_mut() {
            *p *= 1.0 - lambda;
        }
        for (i, child) in candidate_children(node, words) {
            vp[i] += lambda * weight(child) / total;
        }
    }
    vp
}
