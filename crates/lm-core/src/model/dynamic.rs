use std::io::{BufRead, Write};

use tracing::warn;

use super::arpa::{self, ArpaSink};
use super::{
    known_word_ids, predict_with, resolve_words, CandidateScorer, DynamicLanguageModel,
    LanguageModel, LevelCounts, NGramEntry, Prediction,
};
use crate::error::LmError;
use crate::settings::settings;
use crate::smoothing::{abs_disc, kneser_ney, witten_bell, Smoothing};
use crate::trie::{CountChange, CountLayout, KneserNeyLayout, NGramTrie, NodeLayout, NodeRef};
use crate::vocab::{PredictOptions, Vocabulary, WordId, CONTROL_WORDS, UNKNOWN_WORD_ID};

/// Trie-backed model of order two or more.
///
/// The node layout decides which statistics are kept and therefore which
/// smoothing estimators are available.
#[derive(Debug)]
pub struct DynamicModel<L: NodeLayout = CountLayout> {
    pub(super) vocabulary: Vocabulary,
    pub(super) trie: NGramTrie<L>,
    smoothing: Smoothing,
    discounts: Discounts,
}

/// Dynamic model with Kneser-Ney continuation counts.
pub type DynamicModelKN = DynamicModel<KneserNeyLayout>;

/// Count-of-counts per order for deleted-estimation discounts.
#[derive(Debug, Clone)]
struct Discounts {
    n1: Vec<u64>,
    n2: Vec<u64>,
    values: Vec<f64>,
    fallback: f64,
}

impl Discounts {
    fn new(order: usize) -> Self {
        let fallback = settings().discount.fallback;
        Self {
            n1: vec![0; order],
            n2: vec![0; order],
            values: vec![fallback; order],
            fallback,
        }
    }

    fn update(&mut self, level: usize, change: CountChange) {
        match change.before {
            1 => self.n1[level] -= 1,
            2 => self.n2[level] -= 1,
            _ => {}
        }
        match change.after {
            1 => self.n1[level] += 1,
            2 => self.n2[level] += 1,
            _ => {}
        }
        for ((d, &n1), &n2) in self.values.iter_mut().zip(&self.n1).zip(&self.n2) {
            *d = if n1 == 0 || n2 == 0 {
                self.fallback
            } else {
                n1 as f64 / (n1 as f64 + 2.0 * n2 as f64)
            };
        }
    }
}

impl<L: NodeLayout> Default for DynamicModel<L> {
    fn default() -> Self {
        Self::new(settings().model.order)
    }
}

impl<L: NodeLayout> DynamicModel<L> {
    /// Create an empty model holding only the control words.
    /// Orders below 2 are raised to 2.
    pub fn new(order: usize) -> Self {
        let order = order.max(2);
        let mut model = Self {
            vocabulary: Vocabulary::new(),
            trie: NGramTrie::new(order),
            smoothing: L::DEFAULT_SMOOTHING,
            discounts: Discounts::new(order),
        };
        model.clear();
        model
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn trie(&self) -> &NGramTrie<L> {
        &self.trie
    }

    /// Current discount per order.
    pub fn discounts(&self) -> &[f64] {
        &self.discounts.values
    }

    pub(super) fn reset(&mut self) {
        self.vocabulary.clear();
        self.trie.clear();
        self.discounts = Discounts::new(self.trie.order());
        for word in CONTROL_WORDS {
            if let Err(e) = self.count_ngram_words(&[word], 1, true) {
                warn!(word, error = %e, "failed to add control word");
            }
        }
    }

    pub(super) fn resize(&mut self, order: usize) {
        self.trie.set_order(order);
        self.reset();
    }

    pub(super) fn count_ngram_words(
        &mut self,
        ngram: &[&str],
        increment: u32,
        allow_new_words: bool,
    ) -> Result<u32, LmError> {
        if ngram.is_empty() {
            return Err(LmError::EmptyNGram);
        }
        if ngram.len() > self.trie.order() {
            return Err(LmError::OrderUnsupported {
                requested: ngram.len(),
                max: self.trie.order(),
            });
        }
        let wids = resolve_words(&mut self.vocabulary, ngram, allow_new_words)?;
        self.count_ngram_ids(&wids, increment)
    }

    pub fn count_ngram_ids(&mut self, wids: &[WordId], increment: u32) -> Result<u32, LmError> {
        let change = self.trie.increment_node_count(wids, increment)?;
        self.discounts.update(wids.len() - 1, change);
        Ok(change.after)
    }

    /// History cut or left-padded with `<unk>` to `order - 1` words.
    pub(super) fn padded_history(&self, history: &[WordId]) -> Vec<WordId> {
        let n = self.trie.order() - 1;
        let keep = history.len().min(n);
        let mut padded = vec![UNKNOWN_WORD_ID; n - keep];
        padded.extend_from_slice(&history[history.len() - keep..]);
        padded
    }

    /// Probabilities from the active estimator for a padded history.
    pub(super) fn estimate(&self, history: &[WordId], words: &[WordId]) -> Vec<f64> {
        let num_word_types = self.vocabulary.len();
        match self.smoothing {
            Smoothing::WittenBell => witten_bell(&self.trie, history, words, num_word_types),
            Smoothing::KneserNey => kneser_ney(
                &self.trie,
                history,
                words,
                num_word_types,
                &self.discounts.values,
            ),
            Smoothing::AbsDisc | Smoothing::JelinekMercer => abs_disc(
                &self.trie,
                history,
                words,
                num_word_types,
                &self.discounts.values,
            ),
        }
    }

    pub(super) fn entries(&self) -> impl Iterator<Item = NGramEntry> + '_ {
        self.trie.iter().map(|(ngram, node)| node_entry::<L>(ngram, node))
    }

    /// Copy of this model keeping only n-grams whose count exceeds the
    /// per-level threshold. A threshold of -1 removes the level.
    pub fn prune(&self, prune_counts: &[i64]) -> Result<Self, LmError> {
        let mut pruned = Self::new(super::learn::pruned_order(self.order(), prune_counts));
        pruned.smoothing = self.smoothing;
        super::prune_into(self, &mut pruned, prune_counts)?;
        Ok(pruned)
    }
}

pub(super) fn node_entry<L: NodeLayout>(ngram: Vec<WordId>, node: NodeRef<'_, L>) -> NGramEntry {
    NGramEntry {
        ngram,
        count: node.count(),
        n1prx: node.n1prx() as u32,
        n1pxr: L::TRACKS_CONTINUATIONS.then(|| node.n1pxr()),
        n1pxrx: L::TRACKS_CONTINUATIONS.then(|| node.n1pxrx()),
        time: L::TRACKS_RECENCY.then(|| node.time()),
    }
}

impl<L: NodeLayout> CandidateScorer for DynamicModel<L> {
    fn words_with_predictions(&self, history: &[WordId]) -> Option<Vec<WordId>> {
        let last = history.len().checked_sub(1)?;
        Some(self.trie.child_word_ids(&history[last..]))
    }

    fn probabilities(&self, history: &[WordId], words: &[WordId]) -> Vec<f64> {
        self.estimate(&self.padded_history(history), words)
    }
}

impl<L: NodeLayout> LanguageModel for DynamicModel<L> {
    fn predict(
        &self,
        context: &[&str],
        limit: Option<usize>,
        options: PredictOptions,
    ) -> Vec<Prediction> {
        predict_with(self, &self.vocabulary, context, limit, options)
    }
}

impl<L: NodeLayout> DynamicLanguageModel for DynamicModel<L> {
    fn clear(&mut self) {
        self.reset();
    }

    fn order(&self) -> usize {
        self.trie.order()
    }

    fn set_order(&mut self, order: usize) -> Result<(), LmError> {
        self.resize(order);
        Ok(())
    }

    fn max_order(&self) -> Option<usize> {
        None
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn smoothing(&self) -> Option<Smoothing> {
        Some(self.smoothing)
    }

    fn set_smoothing(&mut self, smoothing: Smoothing) -> Result<(), LmError> {
        if !L::SMOOTHINGS.contains(&smoothing) {
            return Err(LmError::UnsupportedSmoothing(smoothing));
        }
        self.smoothing = smoothing;
        Ok(())
    }

    fn count_ngram(
        &mut self,
        ngram: &[&str],
        increment: u32,
        allow_new_words: bool,
    ) -> Result<u32, LmError> {
        self.count_ngram_words(ngram, increment, allow_new_words)
    }

    fn ngram_count(&self, ngram: &[&str]) -> u32 {
        known_word_ids(&self.vocabulary, ngram).map_or(0, |wids| self.trie.ngram_count(&wids))
    }

    fn ngrams(&self) -> Box<dyn Iterator<Item = NGramEntry> + '_> {
        Box::new(self.entries())
    }

    fn counts(&self) -> Vec<LevelCounts> {
        (0..self.trie.order())
            .map(|level| LevelCounts {
                ngrams: self.trie.num_ngrams(level),
                occurrences: self.trie.total_ngrams(level),
            })
            .collect()
    }

    fn memory_size(&self) -> usize {
        self.vocabulary.memory_size() + self.trie.memory_size()
    }

    fn load_from(&mut self, reader: &mut dyn BufRead) -> Result<(), LmError> {
        arpa::load(self, reader)
    }

    fn save_to(&self, writer: &mut dyn Write) -> Result<(), LmError> {
        arpa::save(self, writer)
    }
}

impl<L: NodeLayout> ArpaSink for DynamicModel<L> {
    fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocabulary
    }

    fn num_ngrams(&self, level: usize) -> usize {
        self.trie.num_ngrams(level)
    }

    fn load_ngram(&mut self, wids: &[WordId], count: u32, time: Option<u32>) -> Result<(), LmError> {
        let current = self.trie.ngram_count(wids);
        self.count_ngram_ids(wids, count.saturating_sub(current))?;
        if let Some(time) = time {
            self.trie.set_node_time(wids, time)?;
        }
        Ok(())
    }
}
