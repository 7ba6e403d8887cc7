use std::fmt;
use std::mem;

use crate::smoothing::Smoothing;
use crate::vocab::WordId;

/// Per-node bookkeeping beyond the occurrence count.
///
/// Every accessor has a no-op default, so a layout only stores the fields
/// its estimators read and the rest compile away.
pub trait NodeStats: Default + Clone + fmt::Debug {
    /// Number of distinct words preceding this node's n-gram.
    fn n1pxr(&self) -> u32 {
        0
    }
    fn add_n1pxr(&mut self) {}
    /// Number of distinct (predecessor, successor) pairs around this node's n-gram.
    fn n1pxrx(&self) -> u32 {
        0
    }
    fn add_n1pxrx(&mut self) {}
    /// Event counter value at the last increment.
    fn time(&self) -> u32 {
        0
    }
    fn set_time(&mut self, _time: u32) {}
}

impl NodeStats for () {}

/// Node field layout of a model variant, chosen per depth.
pub trait NodeLayout: 'static {
    /// Stats of interior nodes, including the root.
    type Inner: NodeStats;
    /// Stats of nodes one level above the leaves.
    type BeforeLast: NodeStats;
    /// Stats of leaves.
    type Last: NodeStats;

    /// Maintain Kneser-Ney continuation counts on first increments.
    const TRACKS_CONTINUATIONS: bool = false;
    /// Stamp nodes with the event counter on every increment.
    const TRACKS_RECENCY: bool = false;

    const SMOOTHINGS: &'static [Smoothing];
    const DEFAULT_SMOOTHING: Smoothing;
}

/// Counts only.
#[derive(Debug)]
pub struct CountLayout;

impl NodeLayout for CountLayout {
    type Inner = ();
    type BeforeLast = ();
    type Last = ();

    const SMOOTHINGS: &'static [Smoothing] = &[Smoothing::WittenBell, Smoothing::AbsDisc];
    const DEFAULT_SMOOTHING: Smoothing = Smoothing::AbsDisc;
}

/// Counts plus Kneser-Ney continuation counts.
#[derive(Debug)]
pub struct KneserNeyLayout;

/// Continuation counts of interior nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Continuations {
    n1pxr: u32,
    n1pxrx: u32,
}

impl NodeStats for Continuations {
    fn n1pxr(&self) -> u32 {
        self.n1pxr
    }
    fn add_n1pxr(&mut self) {
        self.n1pxr += 1;
    }
    fn n1pxrx(&self) -> u32 {
        self.n1pxrx
    }
    fn add_n1pxrx(&mut self) {
        self.n1pxrx += 1;
    }
}

/// Pre-leaf nodes never have grandchildren, so they need no `n1pxrx`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Predecessors {
    n1pxr: u32,
}

impl NodeStats for Predecessors {
    fn n1pxr(&self) -> u32 {
        self.n1pxr
    }
    fn add_n1pxr(&mut self) {
        self.n1pxr += 1;
    }
}

impl NodeLayout for KneserNeyLayout {
    type Inner = Continuations;
    type BeforeLast = Predecessors;
    type Last = ();

    const TRACKS_CONTINUATIONS: bool = true;

    const SMOOTHINGS: &'static [Smoothing] = &[
        Smoothing::WittenBell,
        Smoothing::AbsDisc,
        Smoothing::KneserNey,
    ];
    const DEFAULT_SMOOTHING: Smoothing = Smoothing::KneserNey;
}

/// Kneser-Ney counts plus last-use timestamps.
#[derive(Debug)]
pub struct RecencyLayout;

/// Wraps a stats type with a last-use timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timed<S> {
    time: u32,
    stats: S,
}

impl<S: NodeStats> NodeStats for Timed<S> {
    fn n1pxr(&self) -> u32 {
        self.stats.n1pxr()
    }
    fn add_n1pxr(&mut self) {
        self.stats.add_n1pxr();
    }
    fn n1pxrx(&self) -> u32 {
        self.stats.n1pxrx()
    }
    fn add_n1pxrx(&mut self) {
        self.stats.add_n1pxrx();
    }
    fn time(&self) -> u32 {
        self.time
    }
    fn set_time(&mut self, time: u32) {
        self.time = time;
    }
}

impl NodeLayout for RecencyLayout {
    type Inner = Timed<Continuations>;
    type BeforeLast = Timed<Predecessors>;
    type Last = Timed<()>;

    const TRACKS_CONTINUATIONS: bool = true;
    const TRACKS_RECENCY: bool = true;

    const SMOOTHINGS: &'static [Smoothing] = &[
        Smoothing::WittenBell,
        Smoothing::AbsDisc,
        Smoothing::KneserNey,
    ];
    const DEFAULT_SMOOTHING: Smoothing = Smoothing::AbsDisc;
}

/// Leaf node at depth `order`.
#[derive(Debug)]
pub struct LastNode<L: NodeLayout> {
    pub(crate) word_id: WordId,
    pub(crate) count: u32,
    pub(crate) stats: L::Last,
}

impl<L: NodeLayout> LastNode<L> {
    pub(crate) fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            count: 0,
            stats: L::Last::default(),
        }
    }
}

/// Node at depth `order - 1`, holding its leaves by value.
#[derive(Debug)]
pub struct BeforeLastNode<L: NodeLayout> {
    pub(crate) word_id: WordId,
    pub(crate) count: u32,
    pub(crate) stats: L::BeforeLast,
    pub(crate) children: Vec<LastNode<L>>,
}

impl<L: NodeLayout> BeforeLastNode<L> {
    pub(crate) fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            count: 0,
            stats: L::BeforeLast::default(),
            children: Vec::new(),
        }
    }
}

/// Node above depth `order - 1`, including the root.
#[derive(Debug)]
pub struct TrieNode<L: NodeLayout> {
    pub(crate) word_id: WordId,
    pub(crate) count: u32,
    pub(crate) stats: L::Inner,
    pub(crate) children: Children<L>,
}

#[derive(Debug)]
pub(crate) enum Children<L: NodeLayout> {
    Inner(Vec<Box<TrieNode<L>>>),
    BeforeLast(Vec<Box<BeforeLastNode<L>>>),
}

impl<L: NodeLayout> TrieNode<L> {
    /// A node at `depth` in a trie of `order`; its children are pre-leaves
    /// when they sit at depth `order - 1`.
    pub(crate) fn new(word_id: WordId, depth: usize, order: usize) -> Self {
        let children = if depth + 2 < order {
            Children::Inner(Vec::new())
        } else {
            Children::BeforeLast(Vec::new())
        };
        Self {
            word_id,
            count: 0,
            stats: L::Inner::default(),
            children,
        }
    }
}

/// Capacity step for a pre-leaf's inline leaf block.
///
/// Rounds up to the next power of 1.25 so that at most a quarter of the
/// block is unused while reallocation stays amortized.
pub(crate) fn block_capacity(n: usize) -> usize {
    const GROWTH: f64 = 1.25;
    let n = n.max(1);
    let steps = ((n as f64).ln() / GROWTH.ln()).ceil();
    (GROWTH.powf(steps) as usize).max(n)
}

/// Shared read access to a node of any shape.
pub enum NodeRef<'a, L: NodeLayout> {
    Inner(&'a TrieNode<L>),
    BeforeLast(&'a BeforeLastNode<L>),
    Last(&'a LastNode<L>),
}

impl<L: NodeLayout> Clone for NodeRef<'_, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: NodeLayout> Copy for NodeRef<'_, L> {}

impl<'a, L: NodeLayout> NodeRef<'a, L> {
    pub fn word_id(self) -> WordId {
        match self {
            NodeRef::Inner(n) => n.word_id,
            NodeRef::BeforeLast(n) => n.word_id,
            NodeRef::Last(n) => n.word_id,
        }
    }

    pub fn count(self) -> u32 {
        match self {
            NodeRef::Inner(n) => n.count,
            NodeRef::BeforeLast(n) => n.count,
            NodeRef::Last(n) => n.count,
        }
    }

    pub fn n1pxr(self) -> u32 {
        match self {
            NodeRef::Inner(n) => n.stats.n1pxr(),
            NodeRef::BeforeLast(n) => n.stats.n1pxr(),
            NodeRef::Last(n) => n.stats.n1pxr(),
        }
    }

    pub fn n1pxrx(self) -> u32 {
        match self {
            NodeRef::Inner(n) => n.stats.n1pxrx(),
            NodeRef::BeforeLast(n) => n.stats.n1pxrx(),
            NodeRef::Last(n) => n.stats.n1pxrx(),
        }
    }

    pub fn time(self) -> u32 {
        match self {
            NodeRef::Inner(n) => n.stats.time(),
            NodeRef::BeforeLast(n) => n.stats.time(),
            NodeRef::Last(n) => n.stats.time(),
        }
    }

    pub fn num_children(self) -> usize {
        match self {
            NodeRef::Inner(n) => match &n.children {
                Children::Inner(c) => c.len(),
                Children::BeforeLast(c) => c.len(),
            },
            NodeRef::BeforeLast(n) => n.children.len(),
            NodeRef::Last(_) => 0,
        }
    }

    pub fn child_at(self, index: usize) -> Option<NodeRef<'a, L>> {
        match self {
            NodeRef::Inner(n) => match &n.children {
                Children::Inner(c) => c.get(index).map(|c| NodeRef::Inner(&**c)),
                Children::BeforeLast(c) => c.get(index).map(|c| NodeRef::BeforeLast(&**c)),
            },
            NodeRef::BeforeLast(n) => n.children.get(index).map(NodeRef::Last),
            NodeRef::Last(_) => None,
        }
    }

    /// Binary search for the child reached by `word_id`.
    pub fn child(self, word_id: WordId) -> Option<NodeRef<'a, L>> {
        let index = match self {
            NodeRef::Inner(n) => match &n.children {
                Children::Inner(c) => c.binary_search_by_key(&word_id, |c| c.word_id),
                Children::BeforeLast(c) => c.binary_search_by_key(&word_id, |c| c.word_id),
            },
            NodeRef::BeforeLast(n) => n.children.binary_search_by_key(&word_id, |c| c.word_id),
            NodeRef::Last(_) => return None,
        };
        index.ok().and_then(|i| self.child_at(i))
    }

    pub fn children(self) -> impl Iterator<Item = NodeRef<'a, L>> {
        (0..self.num_children()).filter_map(move |i| self.child_at(i))
    }

    pub fn sum_child_counts(self) -> u64 {
        self.children().map(|c| u64::from(c.count())).sum()
    }

    /// Number of distinct words observed after this node's n-gram.
    pub fn n1prx(self) -> usize {
        self.children().filter(|c| c.count() > 0).count()
    }

    /// Number of children that have at least one recorded predecessor.
    pub(crate) fn continued_children(self) -> usize {
        self.children().filter(|c| c.n1pxr() > 0).count()
    }

    /// Approximate bytes held by this node, excluding its children.
    pub(crate) fn own_size(self) -> usize {
        match self {
            NodeRef::Inner(n) => {
                let slots = match &n.children {
                    Children::Inner(c) => c.capacity(),
                    Children::BeforeLast(c) => c.capacity(),
                };
                mem::size_of::<TrieNode<L>>() + slots * mem::size_of::<usize>()
            }
            NodeRef::BeforeLast(n) => {
                let unused = n.children.capacity() - n.children.len();
                mem::size_of::<BeforeLastNode<L>>() + unused * mem::size_of::<LastNode<L>>()
            }
            NodeRef::Last(_) => mem::size_of::<LastNode<L>>(),
        }
    }
}

/// Mutable access to a node of any shape, returned by `NGramTrie::add_node`.
pub enum NodeMut<'a, L: NodeLayout> {
    Inner(&'a mut TrieNode<L>),
    BeforeLast(&'a mut BeforeLastNode<L>),
    Last(&'a mut LastNode<L>),
}

impl<L: NodeLayout> NodeMut<'_, L> {
    pub fn count(&self) -> u32 {
        match self {
            NodeMut::Inner(n) => n.count,
            NodeMut::BeforeLast(n) => n.count,
            NodeMut::Last(n) => n.count,
        }
    }

    pub(crate) fn add_count(&mut self, increment: u32) -> u32 {
        let count = match self {
            NodeMut::Inner(n) => &mut n.count,
            NodeMut::BeforeLast(n) => &mut n.count,
            NodeMut::Last(n) => &mut n.count,
        };
        *count = count.saturating_add(increment);
        *count
    }

    pub(crate) fn add_n1pxr(&mut self) {
        match self {
            NodeMut::Inner(n) => n.stats.add_n1pxr(),
            NodeMut::BeforeLast(n) => n.stats.add_n1pxr(),
            NodeMut::Last(n) => n.stats.add_n1pxr(),
        }
    }

    pub(crate) fn add_n1pxrx(&mut self) {
        match self {
            NodeMut::Inner(n) => n.stats.add_n1pxrx(),
            NodeMut::BeforeLast(n) => n.stats.add_n1pxrx(),
            NodeMut::Last(n) => n.stats.add_n1pxrx(),
        }
    }

    pub(crate) fn set_time(&mut self, time: u32) {
        match self {
            NodeMut::Inner(n) => n.stats.set_time(time),
            NodeMut::BeforeLast(n) => n.stats.set_time(time),
            NodeMut::Last(n) => n.stats.set_time(time),
        }
    }
}
