use std::io::{BufRead, Write};
use std::mem;

use super::arpa::{self, ArpaSink};
use super::{
    known_word_ids, predict_with, resolve_words, CandidateScorer, DynamicLanguageModel,
    LanguageModel, LevelCounts, NGramEntry, Prediction,
};
use crate::error::LmError;
use crate::smoothing::Smoothing;
use crate::vocab::{PredictOptions, Vocabulary, WordId, CONTROL_WORDS};

/// Order-1 model backed by a flat count array indexed by word identifier.
#[derive(Debug, Clone)]
pub struct UnigramModel {
    vocabulary: Vocabulary,
    counts: Vec<u32>,
    total: u64,
}

impl Default for UnigramModel {
    fn default() -> Self {
        Self::new()
    }
}

impl UnigramModel {
    pub fn new() -> Self {
        let mut model = Self {
            vocabulary: Vocabulary::new(),
            counts: Vec::new(),
            total: 0,
        };
        model.clear();
        model
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn count_id(&mut self, wid: WordId, increment: u32) -> Result<u32, LmError> {
        let index = wid as usize;
        if index >= self.counts.len() {
            self.counts.try_reserve(index + 1 - self.counts.len())?;
            self.counts.resize(index + 1, 0);
        }
        let count = &mut self.counts[index];
        *count = count.saturating_add(increment);
        self.total += u64::from(increment);
        Ok(*count)
    }

    pub fn prune(&self, prune_counts: &[i64]) -> Result<Self, LmError> {
        let mut pruned = Self::new();
        super::prune_into(self, &mut pruned, prune_counts)?;
        Ok(pruned)
    }
}

impl CandidateScorer for UnigramModel {
    fn words_with_predictions(&self, _history: &[WordId]) -> Option<Vec<WordId>> {
        None
    }

    fn probabilities(&self, _history: &[WordId], words: &[WordId]) -> Vec<f64> {
        if self.total == 0 {
            let p = 1.0 / self.vocabulary.len().max(1) as f64;
            return vec![p; words.len()];
        }
        let total = self.total as f64;
        words
            .iter()
            .map(|&w| f64::from(self.counts.get(w as usize).copied().unwrap_or(0)) / total)
            .collect()
    }
}

impl LanguageModel for UnigramModel {
    fn predict(
        &self,
        context: &[&str],
        limit: Option<usize>,
        options: PredictOptions,
    ) -> Vec<Prediction> {
        predict_with(self, &self.vocabulary, context, limit, options)
    }
}

impl DynamicLanguageModel for UnigramModel {
    fn clear(&mut self) {
        self.vocabulary.clear();
        self.counts = Vec::new();
        self.total = 0;
        for (wid, word) in CONTROL_WORDS.into_iter().enumerate() {
            // Fresh vocabulary, so control words land on their fixed ids.
            if self.vocabulary.add_word(word).is_ok() {
                let _ = self.count_id(wid as WordId, 1);
            }
        }
    }

    fn order(&self) -> usize {
        1
    }

    fn set_order(&mut self, order: usize) -> Result<(), LmError> {
        if order > 1 {
            return Err(LmError::OrderUnsupported {
                requested: order,
                max: 1,
            });
        }
        self.clear();
        Ok(())
    }

    fn max_order(&self) -> Option<usize> {
        Some(1)
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn smoothing(&self) -> Option<Smoothing> {
        None
    }

    fn set_smoothing(&mut self, smoothing: Smoothing) -> Result<(), LmError> {
        Err(LmError::UnsupportedSmoothing(smoothing))
    }

    fn count_ngram(
        &mut self,
        ngram: &[&str],
        increment: u32,
        allow_new_words: bool,
    ) -> Result<u32, LmError> {
        match ngram.len() {
            0 => Err(LmError::EmptyNGram),
            1 => {
                let wids = resolve_words(&mut self.vocabulary, ngram, allow_new_words)?;
                self.count_id(wids[0], increment)
            }
            n => Err(LmError::OrderUnsupported {
                requested: n,
                max: 1,
            }),
        }
    }

    fn ngram_count(&self, ngram: &[&str]) -> u32 {
        match known_word_ids(&self.vocabulary, ngram).as_deref() {
            Some(&[wid]) => self.counts.get(wid as usize).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn ngrams(&self) -> Box<dyn Iterator<Item = NGramEntry> + '_> {
        Box::new(self.counts.iter().enumerate().map(|(wid, &count)| NGramEntry {
            ngram: vec![wid as WordId],
            count,
            n1prx: 0,
            n1pxr: None,
            n1pxrx: None,
            time: None,
        }))
    }

    fn counts(&self) -> Vec<LevelCounts> {
        vec![LevelCounts {
            ngrams: self.counts.len(),
            occurrences: self.total,
        }]
    }

    fn memory_size(&self) -> usize {
        mem::size_of::<Self>()
            + self.vocabulary.memory_size()
            + self.counts.capacity() * mem::size_of::<u32>()
    }

    fn load_from(&mut self, reader: &mut dyn BufRead) -> Result<(), LmError> {
        arpa::load(self, reader)
    }

    fn save_to(&self, writer: &mut dyn Write) -> Result<(), LmError> {
        arpa::save(self, writer)
    }
}

impl ArpaSink for UnigramModel {
    fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocabulary
    }

    fn num_ngrams(&self, level: usize) -> usize {
        if level == 0 {
            self.counts.len()
        } else {
            0
        }
    }

    fn load_ngram(&mut self, wids: &[WordId], count: u32, _time: Option<u32>) -> Result<(), LmError> {
        let &[wid] = wids else {
            return Err(LmError::OrderUnsupported {
                requested: wids.len(),
                max: 1,
            });
        };
        let current = self.counts.get(wid as usize).copied().unwrap_or(0);
        self.count_id(wid, count.saturating_sub(current))?;
        Ok(())
    }
}
