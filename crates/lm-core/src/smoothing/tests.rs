use super::*;
use crate::trie::{CountLayout, KneserNeyLayout, NGramTrie, RecencyLayout};

const ORDER: usize = 3;
const NUM_WORDS: usize = 10;

/// Count every 1..=ORDER window of a few id sequences.
fn train<L: NodeLayout>() -> NGramTrie<L> {
    let corpus: [&[WordId]; 4] = [
        &[1, 4, 5, 6, 2],
        &[1, 4, 5, 7, 2],
        &[1, 8, 5, 6, 9, 2],
        &[1, 4, 4, 4, 2],
    ];
    let mut trie = NGramTrie::new(ORDER);
    for sentence in corpus {
        for i in 0..sentence.len() {
            for n in 1..=ORDER.min(i + 1) {
                trie.increment_node_count(&sentence[i + 1 - n..=i], 1)
                    .unwrap();
            }
        }
    }
    trie
}

fn all_words() -> Vec<WordId> {
    (0..NUM_WORDS as WordId).collect()
}

fn histories() -> Vec<[WordId; 2]> {
    vec![[4, 5], [1, 4], [0, 0], [0, 4], [9, 9], [5, 6], [4, 4]]
}

fn assert_distribution(probs: &[f64], what: &str) {
    assert!(
        probs.iter().all(|p| (0.0..=1.0).contains(p)),
        "{what}: out of range {probs:?}"
    );
    let sum: f64 = probs.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9, "{what}: sum {sum}");
}

#[test]
fn parse_and_display() {
    for s in Smoothing::ALL {
        assert_eq!(s.to_string().parse::<Smoothing>().unwrap(), s);
    }
    assert_eq!("kneser-ney".parse::<Smoothing>().unwrap(), Smoothing::KneserNey);
    assert!("good-turing".parse::<Smoothing>().is_err());
}

#[test]
fn witten_bell_normalizes() {
    let trie = train::<CountLayout>();
    for h in histories() {
        let p = witten_bell(&trie, &h, &all_words(), NUM_WORDS);
        assert_distribution(&p, &format!("witten-bell {h:?}"));
    }
}

#[test]
fn abs_disc_normalizes() {
    let trie = train::<CountLayout>();
    for d in [0.1, 0.5, 1.0] {
        for h in histories() {
            let p = abs_disc(&trie, &h, &all_words(), NUM_WORDS, &[d; ORDER]);
            assert_distribution(&p, &format!("abs-disc d={d} {h:?}"));
        }
    }
}

#[test]
fn kneser_ney_normalizes() {
    let trie = train::<KneserNeyLayout>();
    for h in histories() {
        let p = kneser_ney(&trie, &h, &all_words(), NUM_WORDS, &[0.6; ORDER]);
        assert_distribution(&p, &format!("kneser-ney {h:?}"));
    }
}

#[test]
fn recency_normalizes() {
    let trie = train::<RecencyLayout>();
    for halflife in [1, 10, 1000] {
        for h in histories() {
            let p = jelinek_mercer_recency(&trie, &h, &all_words(), NUM_WORDS, halflife, &[0.3; ORDER]);
            assert_distribution(&p, &format!("recency hl={halflife} {h:?}"));
        }
    }
}

#[test]
fn unknown_history_falls_back_to_lower_orders() {
    let trie = train::<CountLayout>();
    // [9, 9] is not a bigram, but [9] is a known unigram history.
    let p = witten_bell(&trie, &[9, 9], &all_words(), NUM_WORDS);
    let q = witten_bell(&trie, &[0, 9], &all_words(), NUM_WORDS);
    assert_eq!(p, q);
    // Seen continuation of 9 beats an unseen word.
    assert!(p[2] > p[7]);
}

#[test]
fn seen_continuation_ranks_first() {
    let trie = train::<KneserNeyLayout>();
    let words = all_words();
    let p = kneser_ney(&trie, &[4, 5], &words, NUM_WORDS, &[0.6; ORDER]);
    // "4 5" continues with 6 and 7 only.
    for w in [0, 1, 2, 3, 4, 5, 8, 9] {
        assert!(p[6] > p[w]);
        assert!(p[7] > p[w]);
    }
}

#[test]
fn subset_of_candidates() {
    let trie = train::<CountLayout>();
    let all = abs_disc(&trie, &[4, 5], &all_words(), NUM_WORDS, &[0.5; ORDER]);
    let some = abs_disc(&trie, &[4, 5], &[2, 6, 9], NUM_WORDS, &[0.5; ORDER]);
    assert_eq!(some, vec![all[2], all[6], all[9]]);
}

#[test]
fn recent_ngrams_weigh_more() {
    let mut trie: NGramTrie<RecencyLayout> = NGramTrie::new(2);
    trie.increment_node_count(&[4], 1).unwrap();
    trie.increment_node_count(&[5], 1).unwrap();
    let p = jelinek_mercer_recency(&trie, &[0], &[4, 5], 6, 1, &[1.0, 1.0]);
    assert!(p[1] > p[0]);
    assert!((p[1] - 2.0 * p[0]).abs() < 1e-12);
}
