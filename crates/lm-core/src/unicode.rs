//! Character-level case and accent folding used by prefix matching.

use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Lowercase a single character.
///
/// Characters whose lowercase form expands to several code points
/// (e.g. `İ`) are passed through unchanged so that folding stays 1:1.
pub fn lowercase_char(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Strip combining accents from a character.
///
/// Folds only when the canonical decomposition is a base character followed
/// exclusively by combining marks, so `é` becomes `e` while Hangul
/// syllables and characters without a decomposition are left alone.
pub fn remove_accent(c: char) -> char {
    if c.is_ascii() {
        return c;
    }
    let mut base = None;
    let mut only_marks = true;
    decompose_canonical(c, |d| match base {
        None => base = Some(d),
        Some(_) => only_marks &= is_combining_mark(d),
    });
    match base {
        Some(b) if b != c && only_marks && !is_combining_mark(b) => b,
        _ => c,
    }
}

pub fn has_accent(c: char) -> bool {
    remove_accent(c) != c
}

/// Whether a word starts with an uppercase letter.
pub fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}
