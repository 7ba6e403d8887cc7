//! Interpolated smoothing estimators over an `NGramTrie`.
//!
//! Every estimator takes a history of exactly `order - 1` word identifiers
//! and a sorted, duplicate-free candidate list, and returns one probability
//! per candidate. The recursion starts from the uniform distribution and
//! blends in one order at a time; histories that are not in the trie keep
//! the lower-order estimate.

mod abs_disc;
mod kneser_ney;
mod recency;
#[cfg(test)]
mod tests;
mod witten_bell;

pub(crate) use abs_disc::abs_disc;
pub(crate) use kneser_ney::kneser_ney;
pub(crate) use recency::jelinek_mercer_recency;
pub(crate) use witten_bell::witten_bell;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::trie::{NodeLayout, NodeRef};
use crate::vocab::WordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Smoothing {
    WittenBell,
    AbsDisc,
    KneserNey,
    /// Fixed per-order weights; only used for the recency estimate.
    JelinekMercer,
}

impl Smoothing {
    pub const ALL: [Smoothing; 4] = [
        Smoothing::WittenBell,
        Smoothing::AbsDisc,
        Smoothing::KneserNey,
        Smoothing::JelinekMercer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Smoothing::WittenBell => "witten-bell",
            Smoothing::AbsDisc => "abs-disc",
            Smoothing::KneserNey => "kneser-ney",
            Smoothing::JelinekMercer => "jelinek-mercer",
        }
    }
}

impl fmt::Display for Smoothing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown smoothing: {0}")]
pub struct ParseSmoothingError(String);

impl FromStr for Smoothing {
    type Err = ParseSmoothingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Smoothing::ALL
            .into_iter()
            .find(|sm| sm.name() == s)
            .ok_or_else(|| ParseSmoothingError(s.to_string()))
    }
}

/// Order-0 estimate.
fn uniform(num_word_types: usize, len: usize) -> Vec<f64> {
    vec![1.0 / num_word_types.max(1) as f64; len]
}

/// Children of `node` that are candidates, with their candidate index.
fn candidate_children<'a, L: NodeLayout>(
    node: NodeRef<'a, L>,
    words: &'a [WordId],
) -> impl Iterator<Item = (usize, NodeRef<'a, L>)> + 'a {
    node.children()
        .filter_map(move |c| words.binary_search(&c.word_id()).ok().map(|i| (i, c)))
}

/// History suffix used at order `j` (0 is the empty history).
fn history_at(history: &[WordId], j: usize) -> &[WordId] {
    &history[history.len() - j..]
}
