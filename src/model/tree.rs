//! Context tree: adaptive symbol counts for every recent context.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. A node at
//! order `k` holds the counts of symbols that followed a particular
//! `k`-symbol context. The trie is keyed newest symbol first, so a node's
//! parent is the same context with its oldest symbol dropped: the trie edge
//! and the escape fallback link are one and the same index.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Node total above which all counts are halved.
///
/// A node with more distinct symbols than half this value rescales only
/// once its total passes twice its distinct count, since halving a run of
/// singletons frees nothing.
pub const RESCALE_THRESHOLD: u32 = 1 << 16;

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The order-0 (empty context) node, present in every tree.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// A symbol and how often it has been seen in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCount {
    pub symbol: u32,
    pub count: u32,
}

/// Statistics for one context.
#[derive(Debug, Clone)]
pub struct ContextNode {
    /// Same context minus its oldest symbol; `None` only for the root.
    parent: Option<NodeId>,
    /// Oldest symbol of this context (the edge from `parent`).
    edge: u32,
    order: usize,
    /// Counts in first-seen order. Encoder and decoder build identical
    /// lists, so cumulative intervals line up.
    stats: Vec<SymbolCount>,
    /// Sum of `stats[..].count`
    total: u32,
    /// Distinct symbols ever added, kept apart from the frequencies.
    distinct: u32,
}

impl ContextNode {
    fn new(parent: Option<NodeId>, edge: u32, order: usize) -> Self {
        Self {
            parent,
            edge,
            order,
            stats: Vec::new(),
            total: 0,
            distinct: 0,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn edge(&self) -> u32 {
        self.edge
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn stats(&self) -> &[SymbolCount] {
        &self.stats
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn distinct(&self) -> u32 {
        self.distinct
    }

    /// Count of `symbol` here, zero if never seen.
    pub fn count_of(&self, symbol: u32) -> u32 {
        self.stats
            .iter()
            .find(|s| s.symbol == symbol)
            .map_or(0, |s| s.count)
    }

    /// Halve every count, rounding up so that no seen symbol drops to zero.
    fn rescale(&mut self) {
        self.total = 0;
        for entry in &mut self.stats {
            entry.count = entry.count.div_ceil(2);
            self.total += entry.count;
        }
    }
}

/// Sliding window over the most recent symbols, newest at the back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    window: VecDeque<u32>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// The symbol `distance` steps back; `1` is the most recent.
    #[inline]
    pub fn back(&self, distance: usize) -> Option<u32> {
        let len = self.window.len();
        if distance == 0 || distance > len {
            return None;
        }
        self.window.get(len - distance).copied()
    }

    /// Oldest first.
    pub fn symbols(&self) -> impl Iterator<Item = u32> + '_ {
        self.window.iter().copied()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl FromIterator<u32> for Context {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            window: iter.into_iter().collect(),
        }
    }
}

/// Arena of context nodes up to a fixed maximum order.
#[derive(Debug, Clone)]
pub struct ContextTree {
    nodes: Vec<ContextNode>,
    children: HashMap<(NodeId, u32), NodeId>,
    max_order: usize,
}

impl ContextTree {
    /// Empty tree holding only the root.
    pub fn new(max_order: usize) -> Self {
        Self {
            nodes: vec![ContextNode::new(None, 0, 0)],
            children: HashMap::new(),
            max_order,
        }
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].stats.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &ContextNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ContextNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    #[inline]
    pub fn child(&self, parent: NodeId, symbol: u32) -> Option<NodeId> {
        self.children.get(&(parent, symbol)).copied()
    }

    /// Node for exactly `context` (truncated to the maximum order), if it
    /// has been created. Never creates nodes.
    pub fn lookup(&self, context: &Context) -> Option<NodeId> {
        let depth = context.len().min(self.max_order);
        let mut node = NodeId::ROOT;
        for distance in 1..=depth {
            node = self.child(node, context.back(distance)?)?;
        }
        Some(node)
    }

    /// Fill `out` with the nodes for orders `0..=L`, where `L` is the
    /// longest suffix of `context` present in the tree.
    pub fn chain_into(&self, context: &Context, out: &mut Vec<NodeId>) {
        out.clear();
        out.push(NodeId::ROOT);
        let depth = context.len().min(self.max_order);
        let mut node = NodeId::ROOT;
        for distance in 1..=depth {
            let Some(next) = context.back(distance).and_then(|s| self.child(node, s)) else {
                break;
            };
            out.push(next);
            node = next;
        }
    }

    /// Child of `parent` along `symbol`, created empty if missing.
    pub fn get_or_create(&mut self, parent: NodeId, symbol: u32) -> NodeId {
        let next_id = NodeId(self.nodes.len() as u32);
        match self.children.entry((parent, symbol)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let order = self.nodes[parent.index()].order + 1;
                debug_assert!(order <= self.max_order);
                e.insert(next_id);
                self.nodes
                    .push(ContextNode::new(Some(parent), symbol, order));
                next_id
            }
        }
    }

    /// Add `amount` to `symbol`'s count at `node`.
    ///
    /// Returns true if the node was rescaled as a result.
    pub fn increment(&mut self, node: NodeId, symbol: u32, amount: u32) -> bool {
        let node = &mut self.nodes[node.index()];
        match node.stats.iter_mut().find(|s| s.symbol == symbol) {
            Some(entry) => entry.count += amount,
            None => {
                node.stats.push(SymbolCount {
                    symbol,
                    count: amount,
                });
                node.distinct += 1;
            }
        }
        node.total += amount;
        if node.total > RESCALE_THRESHOLD.max(node.distinct * 2) {
            node.rescale();
            return true;
        }
        false
    }

    /// Append a new entry as-is, without rescaling. The caller guarantees
    /// `symbol` is not yet present at `node`.
    pub(crate) fn push_entry(&mut self, node: NodeId, symbol: u32, count: u32) {
        let node = &mut self.nodes[node.index()];
        node.stats.push(SymbolCount { symbol, count });
        node.distinct += 1;
        node.total += count;
    }

    /// Append `symbol` to `context`, dropping the oldest symbol once the
    /// window is longer than the maximum order.
    pub fn escalate(&self, context: &mut Context, symbol: u32) {
        if self.max_order == 0 {
            return;
        }
        context.window.push_back(symbol);
        while context.window.len() > self.max_order {
            context.window.pop_front();
        }
    }

    /// Context symbols of `id`, oldest first.
    pub fn path(&self, id: NodeId) -> Vec<u32> {
        let mut path = Vec::with_capacity(self.node(id).order);
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            path.push(self.node(cur).edge);
            cur = parent;
        }
        path
    }

    /// Verify structural and count invariants.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (id, node) in self.nodes() {
            let sum: u64 = node.stats.iter().map(|s| u64::from(s.count)).sum();
            if sum != u64::from(node.total) {
                return Err(format!(
                    "node {} total {} != sum of counts {}",
                    id.index(),
                    node.total,
                    sum
                ));
            }
            if node.stats.iter().any(|s| s.count == 0) {
                return Err(format!("node {} holds a zero count", id.index()));
            }
            if node.distinct as usize != node.stats.len() {
                return Err(format!(
                    "node {} distinct counter {} != {} entries",
                    id.index(),
                    node.distinct,
                    node.stats.len()
                ));
            }
            if node.order > self.max_order {
                return Err(format!("node {} deeper than max order", id.index()));
            }
            match node.parent {
                None if id != NodeId::ROOT => {
                    return Err(format!("node {} has no parent", id.index()));
                }
                Some(parent) if self.node(parent).order + 1 != node.order => {
                    return Err(format!("node {} order mismatch", id.index()));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for ContextTree {
    /// One line per node: context (oldest first), total, then `symbol:count`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.nodes() {
            let path = self.path(id);
            write!(f, "[")?;
            for (i, symbol) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{symbol}")?;
            }
            write!(f, "] order {} total {}:", node.order, node.total)?;
            for entry in &node.stats {
                write!(f, " {}:{}", entry.symbol, entry.count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
