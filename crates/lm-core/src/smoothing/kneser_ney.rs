use crate::trie::{NGramTrie, NodeLayout};
use crate::vocab::WordId;

use super::abs_disc::interpolate;
use super::{candidate_children, history_at, uniform};

/// Interpolated Kneser-Ney.
///
/// Lower orders count distinct predecessors (`N1+(*hw)`) normalized by the
/// distinct permutations around the history (`N1+(*h*)`). Only children with
/// at least one predecessor count as distinct continuations. The highest
/// order uses raw counts like absolute discounting.
pub(crate) fn kneser_ney<L: NodeLayout>(
    trie: &NGramTrie<L>,
    history: &[WordId],
    words: &[WordId],
    num_word_types: usize,
    discounts: &[f64],
) -> Vec<f64> {
    let n = history.len() + 1;
    let mut vp = uniform(num_word_types, words.len());
    for j in 0..n {
        let Some(node) = trie.get_node(history_at(history, j)) else {
            continue;
        };
        let d = discounts[j];
        if j < n - 1 {
            let n1prx = node.continued_children();
            if n1prx == 0 {
                break;
            }
            let n1pxrx = node.n1pxrx();
            if n1pxrx == 0 {
                continue;
            }
            interpolate(
                &mut vp,
                candidate_children(node, words).map(|(i, c)| (i, f64::from(c.n1pxr()))),
                f64::from(n1pxrx),
                d,
                n1prx,
            );
        } else {
            let n1prx = node.n1prx();
            if n1prx == 0 {
                break;
            }
            let cs = node.sum_child_counts() as f64;
            interpolate(
                &mut vp,
                candidate_children(node, words).map(|(i, c)| (i, f64::from(c.count()))),
                cs,
                d,
                n1prx,
            );
        }
    }
    vp
}
