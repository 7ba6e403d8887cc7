//! Model evaluation over held-out text.

use tracing::{debug, debug_span};

use crate::model::LanguageModel;

/// Cross-entropy and perplexity of a token stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entropy {
    /// Average bits per token.
    pub bits: f64,
    pub perplexity: f64,
}

/// Score every token after the first against the `order - 1` tokens before
/// it. A zero probability makes the result infinite.
pub fn entropy(model: &dyn LanguageModel, tokens: &[&str], order: usize) -> Entropy {
    let _span = debug_span!("entropy", tokens = tokens.len(), order).entered();
    if tokens.is_empty() {
        return Entropy {
            bits: 0.0,
            perplexity: 1.0,
        };
    }
    let history = order.max(1) - 1;
    let mut log_sum = 0.0;
    let mut scored = 0usize;
    for i in 1..tokens.len() {
        let ngram = &tokens[i.saturating_sub(history)..=i];
        if ngram.len() < 2 {
            continue;
        }
        let p = model.probability(ngram);
        log_sum += if p > 0.0 { p.log2() } else { f64::NEG_INFINITY };
        scored += 1;
    }
    let bits = -log_sum / tokens.len() as f64;
    debug!(scored, bits, "entropy done");
    Entropy {
        bits,
        perplexity: bits.exp2(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DynamicLanguageModel, DynamicModel, Prediction};
    use crate::vocab::PredictOptions;

    /// Assigns every word the same probability.
    struct Flat(f64);

    impl LanguageModel for Flat {
        fn predict(&self, _: &[&str], _: Option<usize>, _: PredictOptions) -> Vec<Prediction> {
            Vec::new()
        }

        fn probability(&self, _: &[&str]) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_flat_model() {
        let tokens = ["a", "b", "c", "d", "e"];
        let e = entropy(&Flat(0.5), &tokens, 3);
        // Four scored tokens averaged over five.
        assert!((e.bits - 0.8).abs() < 1e-12);
        assert!((e.perplexity - 0.8f64.exp2()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_probability_is_infinite() {
        let e = entropy(&Flat(0.0), &["a", "b"], 2);
        assert!(e.bits.is_infinite());
    }

    #[test]
    fn test_empty_and_unigram_order() {
        assert_eq!(entropy(&Flat(0.5), &[], 3).bits, 0.0);
        assert_eq!(entropy(&Flat(0.5), &["a", "b"], 1).bits, 0.0);
    }

    #[test]
    fn test_trained_text_scores_better() {
        let mut model = DynamicModel::<crate::trie::CountLayout>::new(3);
        let text = ["<s>", "the", "cat", "sat", "on", "the", "mat"];
        for _ in 0..3 {
            model.learn_tokens(&text, true).unwrap();
        }
        let seen = entropy(&model, &text, 3);
        let unseen = entropy(&model, &["<s>", "mat", "on", "sat", "cat", "the", "the"], 3);
        assert!(seen.bits < unseen.bits);
        assert!(seen.perplexity >= 1.0);
    }
}
