use crate::unicode::{has_accent, is_capitalized, lowercase_char, remove_accent};

use super::PredictOptions;

/// Compiled prefix test applied to every candidate word of a search.
pub(crate) struct PrefixMatcher {
    prefix: Vec<char>,
    options: PredictOptions,
}

impl PrefixMatcher {
    pub(crate) fn new(prefix: &str, options: PredictOptions) -> Self {
        let fold_case = options.contains(PredictOptions::CASE_INSENSITIVE)
            && !options.contains(PredictOptions::CASE_INSENSITIVE_SMART);
        let fold_accents = options.contains(PredictOptions::ACCENT_INSENSITIVE)
            && !options.contains(PredictOptions::ACCENT_INSENSITIVE_SMART);
        let prefix = prefix
            .chars()
            .map(|c| if fold_case { lowercase_char(c) } else { c })
            .map(|c| if fold_accents { remove_accent(c) } else { c })
            .collect();
        Self { prefix, options }
    }

    pub(crate) fn matches(&self, word: &str) -> bool {
        let o = self.options;
        if o.intersects(PredictOptions::IGNORE_CAPITALIZED | PredictOptions::IGNORE_NON_CAPITALIZED)
        {
            let capitalized = is_capitalized(word);
            if capitalized && o.contains(PredictOptions::IGNORE_CAPITALIZED) {
                return false;
            }
            if !capitalized && o.contains(PredictOptions::IGNORE_NON_CAPITALIZED) {
                return false;
            }
        }

        let mut chars = word.chars();
        for &p in &self.prefix {
            let Some(c) = chars.next() else {
                return false;
            };
            if self.fold(c, p) != p {
                return false;
            }
        }
        true
    }

    /// Fold a word character against the prefix character it is compared to.
    fn fold(&self, mut c: char, p: char) -> char {
        let o = self.options;
        if o.contains(PredictOptions::CASE_INSENSITIVE_SMART) {
            if !p.is_uppercase() {
                c = lowercase_char(c);
            }
        } else if o.contains(PredictOptions::CASE_INSENSITIVE) {
            c = lowercase_char(c);
        }

        if o.contains(PredictOptions::ACCENT_INSENSITIVE_SMART) {
            if !has_accent(p) {
                c = remove_accent(c);
            }
        } else if o.contains(PredictOptions::ACCENT_INSENSITIVE) {
            c = remove_accent(c);
        }
        c
    }
}
