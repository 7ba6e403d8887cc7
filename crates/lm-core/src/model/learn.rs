use tracing::{debug, debug_span};

use super::DynamicLanguageModel;
use crate::error::LmError;
use crate::vocab::{WordId, BEGIN_OF_SENTENCE_ID, CONTROL_WORDS, UNKNOWN_WORD_ID};

/// All n-grams of length `1..=order` starting at each token position.
///
/// `<unk>` splits the stream and is dropped. `<s>` starts a new section and
/// stays as its first token, so nothing is learned across sentence marks.
pub fn extract_ngrams<'b, 'a>(tokens: &'b [&'a str], order: usize) -> Vec<&'b [&'a str]> {
    let mut ngrams = Vec::new();
    for section in tokens
        .split(|&t| t == CONTROL_WORDS[UNKNOWN_WORD_ID as usize])
        .flat_map(sentences)
    {
        for i in 0..section.len() {
            let longest = order.min(section.len() - i);
            ngrams.extend((1..=longest).map(|n| &section[i..i + n]));
        }
    }
    ngrams
}

/// Split before every `<s>`. A trailing lone `<s>` carries nothing to learn.
fn sentences<'b, 'a>(tokens: &'b [&'a str]) -> Vec<&'b [&'a str]> {
    let begin = CONTROL_WORDS[BEGIN_OF_SENTENCE_ID as usize];
    let mut sections = Vec::new();
    let mut start = 0;
    for (i, &token) in tokens.iter().enumerate() {
        if token == begin && i > start {
            sections.push(&tokens[start..i]);
            start = i;
        }
    }
    let rest = &tokens[start..];
    if !rest.is_empty() && rest != [begin] {
        sections.push(rest);
    }
    sections
}

/// Order left after dropping trailing levels pruned with -1.
pub(super) fn pruned_order(order: usize, prune_counts: &[i64]) -> usize {
    let emptied = prune_counts.iter().rev().take_while(|&&c| c == -1).count();
    order.saturating_sub(emptied).max(2)
}

/// Copy into `dst` every n-gram of `src` whose count exceeds its level's
/// threshold. Levels past the end of `prune_counts` use the last threshold,
/// an empty slice keeps everything.
pub fn prune_into<S, D>(src: &S, dst: &mut D, prune_counts: &[i64]) -> Result<(), LmError>
where
    S: DynamicLanguageModel + ?Sized,
    D: DynamicLanguageModel + ?Sized,
{
    let _span = debug_span!("prune", ?prune_counts, order = dst.order()).entered();
    let mut kept = 0usize;
    let mut dropped = 0usize;
    for entry in src.ngrams() {
        if entry.ngram.len() > dst.order() {
            dropped += 1;
            continue;
        }
        let threshold = match prune_counts {
            [] => 0,
            _ => prune_counts[prune_counts.len().min(entry.ngram.len()) - 1],
        };
        if threshold == -1 || i64::from(entry.count) <= threshold {
            dropped += 1;
            continue;
        }
        transfer(src, dst, &entry.ngram, entry.count)?;
        kept += 1;
    }
    debug!(kept, dropped, "prune done");
    Ok(())
}

/// Copy every n-gram of `src` into `dst`, keeping `dst`'s order.
/// Smoothing is carried over when the destination supports it.
pub fn copy_into<S, D>(src: &S, dst: &mut D) -> Result<(), LmError>
where
    S: DynamicLanguageModel + ?Sized,
    D: DynamicLanguageModel + ?Sized,
{
    let _span = debug_span!("copy", order = dst.order()).entered();
    if let (Some(smoothing), Some(_)) = (src.smoothing(), dst.smoothing()) {
        if let Err(e) = dst.set_smoothing(smoothing) {
            debug!(error = %e, "keeping destination smoothing");
        }
    }
    prune_into(src, dst, &[])
}

/// Bring the destination count up to `count`.
fn transfer<S, D>(src: &S, dst: &mut D, ngram: &[WordId], count: u32) -> Result<(), LmError>
where
    S: DynamicLanguageModel + ?Sized,
    D: DynamicLanguageModel + ?Sized,
{
    let vocabulary = src.vocabulary();
    let words: Vec<&str> = ngram
        .iter()
        .map(|&wid| vocabulary.id_to_word(wid).unwrap_or(CONTROL_WORDS[0]))
        .collect();
    let increment = count.saturating_sub(dst.ngram_count(&words));
    if increment > 0 {
        dst.count_ngram(&words, increment, true)?;
    }
    Ok(())
}
