use std::io::{BufRead, Write};

use super::arpa::{self, ArpaSink};
use super::dynamic::DynamicModel;
use super::{
    predict_with, CandidateScorer, DynamicLanguageModel, LanguageModel, LevelCounts, NGramEntry,
    Prediction,
};
use crate::error::LmError;
use crate::settings::settings;
use crate::smoothing::{jelinek_mercer_recency, Smoothing};
use crate::trie::RecencyLayout;
use crate::vocab::{PredictOptions, Vocabulary, WordId};

/// Dynamic model that boosts recently used n-grams.
///
/// Every increment advances a global event counter and stamps the node.
/// Predictions blend the regular estimate with a Jelinek-Mercer estimate
/// over exponentially decayed recency weights:
/// `p = (1 - ratio) * p_model + ratio * p_recency`.
#[derive(Debug)]
pub struct CachedDynamicModel {
    model: DynamicModel<RecencyLayout>,
    recency_halflife: u32,
    recency_ratio: f64,
    recency_smoothing: Smoothing,
    recency_lambdas: Vec<f64>,
}

impl Default for CachedDynamicModel {
    fn default() -> Self {
        Self::new(settings().model.order)
    }
}

impl CachedDynamicModel {
    pub fn new(order: usize) -> Self {
        let model = DynamicModel::new(order);
        let recency = &settings().recency;
        Self {
            recency_lambdas: vec![recency.lambda; model.trie.order()],
            model,
            recency_halflife: recency.halflife,
            recency_ratio: recency.ratio,
            recency_smoothing: Smoothing::JelinekMercer,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.model.vocabulary()
    }

    /// Events until a recency weight halves.
    pub fn recency_halflife(&self) -> u32 {
        self.recency_halflife
    }

    pub fn set_recency_halflife(&mut self, halflife: u32) {
        self.recency_halflife = halflife.max(1);
    }

    /// Share of the recency estimate in the blend, 0 disables it.
    pub fn recency_ratio(&self) -> f64 {
        self.recency_ratio
    }

    pub fn set_recency_ratio(&mut self, ratio: f64) {
        self.recency_ratio = ratio.clamp(0.0, 1.0);
    }

    pub fn recency_smoothing(&self) -> Smoothing {
        self.recency_smoothing
    }

    pub fn set_recency_smoothing(&mut self, smoothing: Smoothing) -> Result<(), LmError> {
        if smoothing != Smoothing::JelinekMercer {
            return Err(LmError::UnsupportedSmoothing(smoothing));
        }
        self.recency_smoothing = smoothing;
        Ok(())
    }

    /// Per-order Jelinek-Mercer weights.
    pub fn recency_lambdas(&self) -> &[f64] {
        &self.recency_lambdas
    }

    /// Set per-order weights. Missing orders get the configured default,
    /// extra values are dropped.
    pub fn set_recency_lambdas(&mut self, lambdas: &[f64]) {
        self.recency_lambdas = lambdas.iter().map(|l| l.clamp(0.0, 1.0)).collect();
        self.fit_lambdas();
    }

    /// Current value of the global event counter.
    pub fn current_time(&self) -> u32 {
        self.model.trie.current_time()
    }

    fn fit_lambdas(&mut self) {
        self.recency_lambdas
            .resize(self.model.trie.order(), settings().recency.lambda);
    }

    pub fn prune(&self, prune_counts: &[i64]) -> Result<Self, LmError> {
        let mut pruned = Self::new(super::learn::pruned_order(self.order(), prune_counts));
        pruned.model.set_smoothing(self.model.smoothing().unwrap_or(Smoothing::AbsDisc))?;
        pruned.recency_halflife = self.recency_halflife;
        pruned.recency_ratio = self.recency_ratio;
        pruned.set_recency_lambdas(&self.recency_lambdas);
        super::prune_into(self, &mut pruned, prune_counts)?;
        Ok(pruned)
    }
}

impl CandidateScorer for CachedDynamicModel {
    fn words_with_predictions(&self, history: &[WordId]) -> Option<Vec<WordId>> {
        self.model.words_with_predictions(history)
    }

    fn probabilities(&self, history: &[WordId], words: &[WordId]) -> Vec<f64> {
        let history = self.model.padded_history(history);
        let mut vp = self.model.estimate(&history, words);

        let ratio = self.recency_ratio;
        if ratio != 0.0 && self.recency_smoothing == Smoothing::JelinekMercer {
            let recency = jelinek_mercer_recency(
                &self.model.trie,
                &history,
                words,
                self.model.vocabulary.len(),
                self.recency_halflife,
                &self.recency_lambdas,
            );
            for (p, r) in vp.iter_mut().zip(recency) {
                *p = *p * (1.0 - ratio) + r * ratio;
            }
        }
        vp
    }
}

impl LanguageModel for CachedDynamicModel {
    fn predict(
        &self,
        context: &[&str],
        limit: Option<usize>,
        options: PredictOptions,
    ) -> Vec<Prediction> {
        predict_with(self, &self.model.vocabulary, context, limit, options)
    }
}

impl DynamicLanguageModel for CachedDynamicModel {
    fn clear(&mut self) {
        self.model.reset();
    }

    fn order(&self) -> usize {
        self.model.trie.order()
    }

    fn set_order(&mut self, order: usize) -> Result<(), LmError> {
        self.model.resize(order);
        self.fit_lambdas();
        Ok(())
    }

    fn max_order(&self) -> Option<usize> {
        None
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.model.vocabulary
    }

    fn smoothing(&self) -> Option<Smoothing> {
        self.model.smoothing()
    }

    fn set_smoothing(&mut self, smoothing: Smoothing) -> Result<(), LmError> {
        self.model.set_smoothing(smoothing)
    }

    fn count_ngram(
        &mut self,
        ngram: &[&str],
        increment: u32,
        allow_new_words: bool,
    ) -> Result<u32, LmError> {
        self.model.count_ngram_words(ngram, increment, allow_new_words)
    }

    fn ngram_count(&self, ngram: &[&str]) -> u32 {
        self.model.ngram_count(ngram)
    }

    fn ngrams(&self) -> Box<dyn Iterator<Item = NGramEntry> + '_> {
        self.model.ngrams()
    }

    fn counts(&self) -> Vec<LevelCounts> {
        self.model.counts()
    }

    fn memory_size(&self) -> usize {
        self.model.memory_size() + self.recency_lambdas.capacity() * std::mem::size_of::<f64>()
    }

    fn load_from(&mut self, reader: &mut dyn BufRead) -> Result<(), LmError> {
        arpa::load(self, reader)
    }

    fn save_to(&self, writer: &mut dyn Write) -> Result<(), LmError> {
        arpa::save(self, writer)
    }
}

impl ArpaSink for CachedDynamicModel {
    fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        self.model.vocabulary_mut()
    }

    fn num_ngrams(&self, level: usize) -> usize {
        ArpaSink::num_ngrams(&self.model, level)
    }

    fn load_ngram(&mut self, wids: &[WordId], count: u32, time: Option<u32>) -> Result<(), LmError> {
        self.model.load_ngram(wids, count, time)
    }

    /// Resume the event counter after the newest stored n-gram.
    fn finish_load(&mut self) {
        let latest = self
            .model
            .trie
            .iter()
            .map(|(_, node)| node.time())
            .max()
            .unwrap_or(0);
        self.model.trie.set_current_time(latest);
    }
}
