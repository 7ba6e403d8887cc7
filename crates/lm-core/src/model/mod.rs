//! Dynamically updatable n-gram language models.
//!
//! All models predict through the same pipeline: split the context into
//! history and completion prefix, pick candidate words from the vocabulary,
//! score them with the model's estimator, then rank and truncate.

mod arpa;
mod cached;
mod dynamic;
mod learn;
mod unigram;

pub use arpa::read_order;
pub use cached::CachedDynamicModel;
pub use dynamic::{DynamicModel, DynamicModelKN};
pub use learn::{copy_into, extract_ngrams, prune_into};
pub use unigram::UnigramModel;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::LmError;
use crate::smoothing::Smoothing;
use crate::vocab::{
    PredictOptions, Vocabulary, WordId, WordLookup, CONTROL_WORDS, NUM_CONTROL_WORDS,
    UNKNOWN_WORD_ID,
};

/// A ranked prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub word: String,
    pub probability: f64,
}

/// Anything that can rank completions for a context.
pub trait LanguageModel {
    /// Rank completions of the last context element given the elements
    /// before it. `None` returns every candidate.
    fn predict(
        &self,
        context: &[&str],
        limit: Option<usize>,
        options: PredictOptions,
    ) -> Vec<Prediction>;

    /// Probability of the last word of `ngram` after the words before it.
    ///
    /// Runs a normalized prediction over the whole vocabulary; words the
    /// model does not know get the probability of `<unk>`.
    fn probability(&self, ngram: &[&str]) -> f64 {
        normalized_probability(self, ngram)
    }
}

/// Probability from a normalized prediction over the whole vocabulary.
pub(crate) fn normalized_probability<M: LanguageModel + ?Sized>(model: &M, ngram: &[&str]) -> f64 {
    let Some((word, history)) = ngram.split_last() else {
        return 0.0;
    };
    let mut context = history.to_vec();
    context.push("");
    let results = model.predict(
        &context,
        None,
        PredictOptions::NORMALIZE | PredictOptions::INCLUDE_CONTROL_WORDS | PredictOptions::NO_SORT,
    );
    results
        .iter()
        .find(|r| r.word == *word)
        .or_else(|| results.iter().find(|r| r.word == CONTROL_WORDS[0]))
        .map_or(0.0, |r| r.probability)
}

/// One stored n-gram with its bookkeeping, as produced by iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NGramEntry {
    pub ngram: Vec<WordId>,
    pub count: u32,
    /// Distinct words seen after this n-gram.
    pub n1prx: u32,
    /// Kneser-Ney predecessor count, for models that track it.
    pub n1pxr: Option<u32>,
    /// Kneser-Ney permutation count, for models that track it.
    pub n1pxrx: Option<u32>,
    /// Last-use timestamp, for recency models.
    pub time: Option<u32>,
}

/// Distinct n-grams and total occurrences of one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub ngrams: usize,
    pub occurrences: u64,
}

/// Models that are trained incrementally and persisted in the count format.
pub trait DynamicLanguageModel: LanguageModel {
    /// Drop all counts and words, keeping only the control words.
    fn clear(&mut self);

    fn order(&self) -> usize;

    /// Change the order. Clears the model.
    fn set_order(&mut self, order: usize) -> Result<(), LmError>;

    /// Largest supported order, `None` if unbounded.
    fn max_order(&self) -> Option<usize>;

    fn vocabulary(&self) -> &Vocabulary;

    fn smoothing(&self) -> Option<Smoothing>;

    fn set_smoothing(&mut self, smoothing: Smoothing) -> Result<(), LmError>;

    /// Add `increment` to the count of `ngram` and return the new count.
    ///
    /// Unknown words are added to the vocabulary if `allow_new_words`,
    /// otherwise they are counted as `<unk>`.
    fn count_ngram(
        &mut self,
        ngram: &[&str],
        increment: u32,
        allow_new_words: bool,
    ) -> Result<u32, LmError>;

    /// Stored count, zero for unknown n-grams.
    fn ngram_count(&self, ngram: &[&str]) -> u32;

    /// Owned entries for every stored n-gram, depth first.
    fn ngrams(&self) -> Box<dyn Iterator<Item = NGramEntry> + '_>;

    fn counts(&self) -> Vec<LevelCounts>;

    /// Approximate memory use in bytes.
    fn memory_size(&self) -> usize;

    /// Replace the model's contents with a model in the count format.
    /// On error the model is left cleared.
    fn load_from(&mut self, reader: &mut dyn BufRead) -> Result<(), LmError>;

    fn save_to(&self, writer: &mut dyn Write) -> Result<(), LmError>;

    fn load(&mut self, path: &Path) -> Result<(), LmError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                self.clear();
                return Err(e.into());
            }
        };
        self.load_from(&mut BufReader::new(file))
    }

    /// Save atomically: write to a temporary file, then rename.
    fn save(&self, path: &Path) -> Result<(), LmError> {
        arpa::save_atomic(path, |w| self.save_to(w))
    }

    fn lookup_word(&self, word: &str) -> WordLookup {
        self.vocabulary().lookup_word(word)
    }

    /// Count every n-gram of a token stream once.
    fn learn_tokens(&mut self, tokens: &[&str], allow_new_words: bool) -> Result<(), LmError> {
        for ngram in extract_ngrams(tokens, self.order()) {
            self.count_ngram(ngram, 1, allow_new_words)?;
        }
        Ok(())
    }
}

/// Estimator hooks behind the shared predict pipeline.
pub(crate) trait CandidateScorer {
    /// Words seen after the last history word, or `None` if the model keeps
    /// no history and every word is a plausible continuation.
    fn words_with_predictions(&self, history: &[WordId]) -> Option<Vec<WordId>>;

    /// One probability per sorted candidate.
    fn probabilities(&self, history: &[WordId], words: &[WordId]) -> Vec<f64>;
}

pub(crate) fn predict_with<M: CandidateScorer + ?Sized>(
    model: &M,
    vocabulary: &Vocabulary,
    context: &[&str],
    limit: Option<usize>,
    options: PredictOptions,
) -> Vec<Prediction> {
    let Some((prefix, history)) = context.split_last() else {
        return Vec::new();
    };
    let history = vocabulary.words_to_ids(history);
    let words = candidates(model, vocabulary, prefix, &history, options);
    let probabilities = model.probabilities(&history, &words);

    let mut ranked: Vec<(WordId, f64)> = words.into_iter().zip(probabilities).collect();
    if !options.contains(PredictOptions::NO_SORT) {
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    }
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
        .into_iter()
        .filter_map(|(id, probability)| {
            vocabulary.id_to_word(id).map(|word| Prediction {
                word: word.to_string(),
                probability,
            })
        })
        .collect()
}

/// Sorted candidate identifiers for a prediction.
fn candidates<M: CandidateScorer + ?Sized>(
    model: &M,
    vocabulary: &Vocabulary,
    prefix: &str,
    history: &[WordId],
    options: PredictOptions,
) -> Vec<WordId> {
    let has_prefix = !prefix.is_empty();
    // Without a prefix only words that ever followed the history are worth
    // offering; unigram-only words would flood the list.
    let only_predictions = !has_prefix
        && !history.is_empty()
        && !options.contains(PredictOptions::INCLUDE_CONTROL_WORDS);

    if has_prefix || only_predictions || options.intersects(PredictOptions::FILTER_OPTIONS) {
        let restrict = if only_predictions {
            model.words_with_predictions(history)
        } else {
            None
        };
        let mut ids = vocabulary.prefix_search(prefix, restrict.as_deref(), options);
        ids.sort_unstable();
        ids
    } else {
        let min_id = if options.contains(PredictOptions::INCLUDE_CONTROL_WORDS) {
            UNKNOWN_WORD_ID
        } else {
            NUM_CONTROL_WORDS as WordId
        };
        (min_id..vocabulary.len() as WordId).collect()
    }
}

/// Resolve words for counting, adding or mapping unknown ones to `<unk>`.
pub(crate) fn resolve_words(
    vocabulary: &mut Vocabulary,
    ngram: &[&str],
    allow_new_words: bool,
) -> Result<Vec<WordId>, LmError> {
    let mut wids = Vec::with_capacity(ngram.len());
    for word in ngram {
        let id = match vocabulary.word_to_id(word) {
            Some(id) => id,
            None if allow_new_words => vocabulary.add_word(word)?,
            None => UNKNOWN_WORD_ID,
        };
        wids.push(id);
    }
    Ok(wids)
}

/// Resolve words for lookup; `None` if any word is unknown.
pub(crate) fn known_word_ids(vocabulary: &Vocabulary, ngram: &[&str]) -> Option<Vec<WordId>> {
    ngram.iter().map(|w| vocabulary.word_to_id(w)).collect()
}
