use super::node::block_capacity;
use super::*;

fn count<L: NodeLayout>(trie: &mut NGramTrie<L>, wids: &[WordId]) -> CountChange {
    trie.increment_node_count(wids, 1).unwrap()
}

#[test]
fn order_is_at_least_two() {
    let trie: NGramTrie<CountLayout> = NGramTrie::new(1);
    assert_eq!(trie.order(), 2);
}

#[test]
fn shapes_follow_depth() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    count(&mut trie, &[4, 5, 6]);
    assert!(matches!(trie.get_node(&[]), Some(NodeRef::Inner(_))));
    assert!(matches!(trie.get_node(&[4]), Some(NodeRef::Inner(_))));
    assert!(matches!(trie.get_node(&[4, 5]), Some(NodeRef::BeforeLast(_))));
    assert!(matches!(trie.get_node(&[4, 5, 6]), Some(NodeRef::Last(_))));
    assert!(trie.get_node(&[4, 6]).is_none());

    let mut bigrams: NGramTrie<CountLayout> = NGramTrie::new(2);
    count(&mut bigrams, &[4, 5]);
    assert!(matches!(bigrams.get_node(&[4]), Some(NodeRef::BeforeLast(_))));
    assert!(matches!(bigrams.get_node(&[4, 5]), Some(NodeRef::Last(_))));
}

#[test]
fn add_node_creates_zero_count_path() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    assert_eq!(trie.add_node(&[7, 8, 9]).unwrap().count(), 0);
    assert_eq!(trie.num_ngrams(0), 1);
    assert_eq!(trie.num_ngrams(1), 1);
    assert_eq!(trie.num_ngrams(2), 1);
    assert_eq!(trie.ngram_count(&[7, 8, 9]), 0);
    assert_eq!(trie.total_ngrams(2), 0);
}

#[test]
fn too_long_ngram_is_rejected() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(2);
    let err = trie.increment_node_count(&[1, 2, 3], 1).unwrap_err();
    assert!(matches!(
        err,
        LmError::OrderUnsupported {
            requested: 3,
            max: 2
        }
    ));
    assert!(matches!(
        trie.increment_node_count(&[], 1),
        Err(LmError::EmptyNGram)
    ));
}

#[test]
fn children_stay_sorted() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(2);
    for wid in [9, 4, 7, 5, 8, 6] {
        count(&mut trie, &[wid]);
        count(&mut trie, &[4, wid]);
    }
    assert_eq!(trie.child_word_ids(&[]), vec![4, 5, 6, 7, 8, 9]);
    assert_eq!(trie.child_word_ids(&[4]), vec![4, 5, 6, 7, 8, 9]);
    assert_eq!(trie.child_word_ids(&[5]), Vec::<WordId>::new());
}

#[test]
fn increments_accumulate() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    assert_eq!(
        count(&mut trie, &[4, 5]),
        CountChange {
            before: 0,
            after: 1
        }
    );
    let change = trie.increment_node_count(&[4, 5], 3).unwrap();
    assert_eq!(change, CountChange { before: 1, after: 4 });
    assert_eq!(trie.ngram_count(&[4, 5]), 4);
    assert_eq!(trie.total_ngrams(1), 4);
    assert_eq!(trie.num_ngrams(1), 1);
    // The unigram node exists but was never counted.
    assert_eq!(trie.ngram_count(&[4]), 0);
}

#[test]
fn block_capacity_schedule() {
    assert_eq!(block_capacity(0), 1);
    assert_eq!(block_capacity(1), 1);
    assert_eq!(block_capacity(2), 2);
    assert_eq!(block_capacity(6), 7);
    for n in 1..2000 {
        let cap = block_capacity(n);
        assert!(cap >= n);
        assert!(cap as f64 <= n as f64 * 1.25 + 1.0, "n={n} cap={cap}");
    }
}

#[test]
fn leaf_block_grows() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(2);
    for wid in 0..50 {
        count(&mut trie, &[1, 49 - wid]);
    }
    let Some(NodeRef::BeforeLast(node)) = trie.get_node(&[1]) else {
        panic!("expected a pre-leaf node");
    };
    assert_eq!(node.children.len(), 50);
    assert!(node.children.capacity() >= 50);
    assert!(node.children.windows(2).all(|w| w[0].word_id < w[1].word_id));
    assert_eq!(trie.ngram_count(&[1, 0]), 1);
    assert_eq!(trie.ngram_count(&[1, 49]), 1);
}

#[test]
fn n1prx_ignores_zero_counts() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    count(&mut trie, &[4, 5]);
    trie.add_node(&[4, 6]).unwrap();
    let node = trie.get_node(&[4]).unwrap();
    assert_eq!(node.num_children(), 2);
    assert_eq!(node.n1prx(), 1);
    assert_eq!(node.sum_child_counts(), 1);
}

#[test]
fn kneser_ney_counts_first_occurrence_only() {
    let mut trie: NGramTrie<KneserNeyLayout> = NGramTrie::new(3);
    count(&mut trie, &[4, 5]);
    count(&mut trie, &[4, 5]);
    assert_eq!(trie.get_node(&[5]).unwrap().n1pxr(), 1);
    assert_eq!(trie.root().n1pxrx(), 1);

    count(&mut trie, &[6, 5]);
    assert_eq!(trie.get_node(&[5]).unwrap().n1pxr(), 2);
    assert_eq!(trie.root().n1pxrx(), 2);

    // Trigram: predecessor count on the bigram suffix, permutation count
    // on the middle word.
    count(&mut trie, &[4, 5, 6]);
    assert_eq!(trie.get_node(&[5, 6]).unwrap().n1pxr(), 1);
    assert_eq!(trie.get_node(&[5]).unwrap().n1pxrx(), 1);
    // The suffix bigram was created as a zero-count node.
    assert_eq!(trie.ngram_count(&[5, 6]), 0);

    // Unigrams record their predecessors on the root.
    count(&mut trie, &[4]);
    assert_eq!(trie.root().n1pxr(), 1);
}

#[test]
fn count_layout_has_no_continuations() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    count(&mut trie, &[4, 5]);
    assert!(trie.get_node(&[5]).is_none());
    assert_eq!(trie.root().n1pxrx(), 0);
}

#[test]
fn recency_stamps_nodes() {
    let mut trie: NGramTrie<RecencyLayout> = NGramTrie::new(2);
    count(&mut trie, &[4]);
    count(&mut trie, &[5]);
    count(&mut trie, &[4, 5]);
    assert_eq!(trie.current_time(), 3);
    assert_eq!(trie.get_node(&[4]).unwrap().time(), 1);
    assert_eq!(trie.get_node(&[5]).unwrap().time(), 2);
    assert_eq!(trie.get_node(&[4, 5]).unwrap().time(), 3);
    count(&mut trie, &[4]);
    assert_eq!(trie.get_node(&[4]).unwrap().time(), 4);
}

#[test]
fn preorder_iteration() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    count(&mut trie, &[5]);
    count(&mut trie, &[4]);
    count(&mut trie, &[4, 5]);
    count(&mut trie, &[4, 5, 6]);
    count(&mut trie, &[5, 4]);
    let paths: Vec<Vec<WordId>> = trie.iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        vec![vec![4], vec![4, 5], vec![4, 5, 6], vec![5], vec![5, 4]]
    );
    let counts: Vec<u32> = trie.iter().map(|(_, node)| node.count()).collect();
    assert_eq!(counts, vec![1, 1, 1, 1, 1]);
}

#[test]
fn empty_trie_iterates_nothing() {
    let trie: NGramTrie<KneserNeyLayout> = NGramTrie::new(4);
    assert_eq!(trie.iter().count(), 0);
}

#[test]
fn clear_and_set_order() {
    let mut trie: NGramTrie<CountLayout> = NGramTrie::new(3);
    count(&mut trie, &[4, 5, 6]);
    let populated = trie.memory_size();
    trie.clear();
    assert_eq!(trie.order(), 3);
    assert_eq!(trie.iter().count(), 0);
    assert!(trie.memory_size() < populated);
    trie.set_order(4);
    assert_eq!(trie.order(), 4);
    assert_eq!(trie.num_ngrams(3), 0);
}
