//! Vocabulary: bidirectional word <-> identifier mapping.
//!
//! Identifiers are dense and assigned in insertion order. The first four are
//! bound to the control words and never move. Lookup is a binary search,
//! either over an explicit sorted index or, after a bulk `set_words`, over
//! the backing sequence itself, which is then kept physically sorted.

mod options;
mod prefix;

pub use options::PredictOptions;

use std::collections::HashSet;
use std::mem;

use crate::error::LmError;
use prefix::PrefixMatcher;

pub type WordId = u32;

pub const UNKNOWN_WORD_ID: WordId = 0;
pub const BEGIN_OF_SENTENCE_ID: WordId = 1;
pub const END_OF_SENTENCE_ID: WordId = 2;
pub const NUMBER_ID: WordId = 3;
pub const NUM_CONTROL_WORDS: usize = 4;

/// Control words in identifier order.
pub const CONTROL_WORDS: [&str; NUM_CONTROL_WORDS] = ["<unk>", "<s>", "</s>", "<num>"];

/// Result of `Vocabulary::lookup_word`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordLookup {
    NoMatch,
    Exact,
    /// Number of words starting with the looked up text.
    Partial(usize),
}

impl WordLookup {
    /// Signed code: 1 for exact, 0 for none, minus the partial match count.
    pub fn code(self) -> i64 {
        match self {
            WordLookup::NoMatch => 0,
            WordLookup::Exact => 1,
            WordLookup::Partial(n) => -(n as i64),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Vocabulary {
    words: Vec<Box<str>>,
    /// Identifiers ordered by word. Absent after a bulk load until the next
    /// incremental insertion.
    sorted: Option<Vec<WordId>>,
    /// Start of the physically sorted tail of `words` while `sorted` is absent.
    sorted_words_begin: usize,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.words = Vec::new();
        self.sorted = None;
        self.sorted_words_begin = 0;
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word_to_id(&self, word: &str) -> Option<WordId> {
        match &self.sorted {
            Some(sorted) => sorted
                .binary_search_by(|&id| (*self.words[id as usize]).cmp(word))
                .ok()
                .map(|i| sorted[i]),
            None => {
                let begin = self.sorted_words_begin;
                if let Ok(i) = self.words[begin..].binary_search_by(|w| (**w).cmp(word)) {
                    return Some((begin + i) as WordId);
                }
                self.words[..begin]
                    .iter()
                    .position(|w| &**w == word)
                    .map(|i| i as WordId)
            }
        }
    }

    /// Resolve a sequence of words, unknown ones mapping to `<unk>`.
    pub fn words_to_ids(&self, words: &[&str]) -> Vec<WordId> {
        words
            .iter()
            .map(|w| self.word_to_id(w).unwrap_or(UNKNOWN_WORD_ID))
            .collect()
    }

    pub fn id_to_word(&self, id: WordId) -> Option<&str> {
        self.words.get(id as usize).map(|w| &**w)
    }

    /// Iterate `(id, word)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (WordId, &str)> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(|(i, w)| (i as WordId, &**w))
    }

    /// Add a single word, returning its identifier. Adding a known word
    /// returns the existing identifier.
    pub fn add_word(&mut self, word: &str) -> Result<WordId, LmError> {
        if let Some(id) = self.word_to_id(word) {
            return Ok(id);
        }
        let id = WordId::try_from(self.words.len()).map_err(|_| LmError::OutOfMemory)?;
        self.ensure_sorted_index()?;
        self.words.try_reserve(1)?;

        let words = &self.words;
        let Some(sorted) = self.sorted.as_mut() else {
            return Err(LmError::OutOfMemory);
        };
        sorted.try_reserve(1)?;
        let pos = sorted.partition_point(|&i| *words[i as usize] < *word);
        sorted.insert(pos, id);
        self.words.push(word.into());
        Ok(id)
    }

    /// Bulk-append words in sorted order without building the sorted index.
    ///
    /// Words already present are skipped, so loading a file that lists the
    /// control words does not duplicate them.
    pub fn set_words<S: AsRef<str>>(&mut self, new_words: &[S]) -> Result<(), LmError> {
        self.sorted = None;
        let initial = self.words.len();

        let existing: HashSet<&str> = self.words.iter().map(|w| &**w).collect();
        let mut fresh: Vec<Box<str>> = Vec::new();
        fresh.try_reserve_exact(new_words.len())?;
        for w in new_words {
            let w = w.as_ref();
            if !existing.contains(w) {
                fresh.push(w.into());
            }
        }
        drop(existing);
        fresh.sort_unstable();
        fresh.dedup();

        self.words.try_reserve_exact(fresh.len())?;
        self.words.extend(fresh);
        self.sorted_words_begin = initial;
        Ok(())
    }

    /// Materialize the sorted index from the sorted tail plus the
    /// unsorted head.
    fn ensure_sorted_index(&mut self) -> Result<(), LmError> {
        if self.sorted.is_some() {
            return Ok(());
        }
        let mut sorted: Vec<WordId> = Vec::new();
        sorted.try_reserve_exact(self.words.len() + 1)?;
        sorted.extend((self.sorted_words_begin..self.words.len()).map(|i| i as WordId));
        for i in 0..self.sorted_words_begin {
            let word = &*self.words[i];
            let pos = sorted.partition_point(|&j| *self.words[j as usize] < *word);
            sorted.insert(pos, i as WordId);
        }
        self.sorted = Some(sorted);
        Ok(())
    }

    /// Identifiers whose word matches `prefix` under `options`.
    ///
    /// With `candidates`, only those identifiers are considered; otherwise
    /// the whole vocabulary is scanned. Control words are skipped unless
    /// `INCLUDE_CONTROL_WORDS` is set.
    pub fn prefix_search(
        &self,
        prefix: &str,
        candidates: Option<&[WordId]>,
        options: PredictOptions,
    ) -> Vec<WordId> {
        let min_id = if options.contains(PredictOptions::INCLUDE_CONTROL_WORDS) {
            0
        } else {
            NUM_CONTROL_WORDS as WordId
        };
        let matcher = PrefixMatcher::new(prefix, options);
        let accept = |id: WordId| {
            id >= min_id
                && self
                    .id_to_word(id)
                    .is_some_and(|word| matcher.matches(word))
        };
        match candidates {
            Some(ids) => ids.iter().copied().filter(|&id| accept(id)).collect(),
            None => (min_id..self.words.len() as WordId)
                .filter(|&id| accept(id))
                .collect(),
        }
    }

    /// Exact match, or the number of words that start with `word`.
    pub fn lookup_word(&self, word: &str) -> WordLookup {
        if self.word_to_id(word).is_some() {
            return WordLookup::Exact;
        }
        let partial = match &self.sorted {
            Some(sorted) => {
                let start = sorted.partition_point(|&i| *self.words[i as usize] < *word);
                sorted[start..]
                    .iter()
                    .take_while(|&&i| self.words[i as usize].starts_with(word))
                    .count()
            }
            None => {
                let tail = &self.words[self.sorted_words_begin..];
                let start = tail.partition_point(|w| **w < *word);
                let sorted_matches = tail[start..]
                    .iter()
                    .take_while(|w| w.starts_with(word))
                    .count();
                let head_matches = self.words[..self.sorted_words_begin]
                    .iter()
                    .filter(|w| w.starts_with(word))
                    .count();
                sorted_matches + head_matches
            }
        };
        if partial == 0 {
            WordLookup::NoMatch
        } else {
            WordLookup::Partial(partial)
        }
    }

    /// Approximate heap and inline memory use in bytes.
    pub fn memory_size(&self) -> usize {
        let strings: usize = self.words.iter().map(|w| w.len()).sum();
        let index = self
            .sorted
            .as_ref()
            .map_or(0, |s| s.capacity() * mem::size_of::<WordId>());
        mem::size_of::<Self>() + self.words.capacity() * mem::size_of::<Box<str>>() + strings + index
    }
}
