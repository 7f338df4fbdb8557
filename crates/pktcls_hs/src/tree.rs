//! The HyperSplit decision tree.
//!
//! Nodes live in one arena (`Vec<Node>`, index children) and leaves hold
//! ranges into one shared rule-reference vector, so dropping the index
//! releases everything at once. The index owns its copy of the rule set
//! and is self-contained after build.

use pktcls_core::{
    dim::{Dim, DimRange, DIM_NUM},
    engine::{Classifier, EngineError},
    rule::{Packet, RangeRule},
};

/// Build-time knobs.
#[derive(Clone, Copy, Debug)]
pub struct HyperSplitConfig {
    /// Small-leaf threshold: subsets of at most this many rules become
    /// leaves.
    pub binth: usize,
    /// Hard cap on recursion depth; a subset at this depth becomes a leaf
    /// regardless of size.
    pub depth_max: usize,
}

impl Default for HyperSplitConfig {
    fn default() -> Self {
        HyperSplitConfig {
            binth: 8,
            depth_max: 128,
        }
    }
}

/// Build statistics, reported once per build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
    /// Total leaf list length; exceeds the rule count when rules straddle
    /// split thresholds and are duplicated into both children.
    pub rule_refs: usize,
}

#[derive(Clone, Copy, Debug)]
enum Node {
    Split {
        dim: Dim,
        thresh: u32,
        left: u32,
        right: u32,
    },
    Leaf {
        start: u32,
        end: u32,
    },
}

/// The per-node cell: intersection of all ancestor half-ranges.
type Cell = [DimRange; DIM_NUM];

fn full_cell() -> Cell {
    [
        DimRange::full(Dim::Sip),
        DimRange::full(Dim::Dip),
        DimRange::full(Dim::Sport),
        DimRange::full(Dim::Dport),
        DimRange::full(Dim::Proto),
    ]
}

/// A HyperSplit index over a range-form rule set.
#[derive(Debug)]
pub struct HyperSplit {
    nodes: Vec<Node>,
    leaf_refs: Vec<u32>,
    rules: Vec<RangeRule>,
    root: u32,
    stats: TreeStats,
}

impl HyperSplit {
    /// Build with explicit configuration.
    pub fn with_config(rules: &[RangeRule], cfg: HyperSplitConfig) -> Result<Self, EngineError> {
        if rules.is_empty() {
            return Err(EngineError::EmptyRuleSet);
        }
        let mut builder = Builder {
            cfg,
            rules,
            nodes: Vec::new(),
            leaf_refs: Vec::new(),
            stats: TreeStats::default(),
        };
        let subset: Vec<u32> = (0..rules.len() as u32).collect();
        let root = builder.split(subset, full_cell(), 0);
        builder.stats.nodes = builder.nodes.len();

        let stats = builder.stats;
        log::info!(
            "hypersplit index built: {} nodes, {} leaves, depth {}, {} rule refs",
            stats.nodes,
            stats.leaves,
            stats.depth,
            stats.rule_refs
        );
        Ok(HyperSplit {
            nodes: builder.nodes,
            leaf_refs: builder.leaf_refs,
            rules: rules.to_vec(),
            root,
            stats,
        })
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }
}

impl Classifier for HyperSplit {
    type Rule = RangeRule;

    fn build(rules: &[RangeRule]) -> Result<Self, EngineError> {
        Self::with_config(rules, HyperSplitConfig::default())
    }

    fn insert_update(&mut self, _rules: &[RangeRule]) -> Result<(), EngineError> {
        Err(EngineError::UnsupportedUpdate)
    }

    fn lookup(&self, pkt: &Packet) -> Option<u32> {
        let mut idx = self.root;
        loop {
            match self.nodes[idx as usize] {
                Node::Split {
                    dim,
                    thresh,
                    left,
                    right,
                } => {
                    idx = if pkt.val[dim.index()] <= thresh {
                        left
                    } else {
                        right
                    };
                }
                Node::Leaf { start, end } => {
                    return self.leaf_refs[start as usize..end as usize]
                        .iter()
                        .map(|&ri| &self.rules[ri as usize])
                        .find(|r| r.matches(pkt))
                        .map(|r| r.priority);
                }
            }
        }
    }
}

struct Builder<'r> {
    cfg: HyperSplitConfig,
    rules: &'r [RangeRule],
    nodes: Vec<Node>,
    leaf_refs: Vec<u32>,
    stats: TreeStats,
}

impl Builder<'_> {
    /// Recursively decompose `subset` within `cell`; children are emitted
    /// before their parent, so the returned index is always the subtree
    /// root.
    fn split(&mut self, subset: Vec<u32>, cell: Cell, depth: usize) -> u32 {
        self.stats.depth = self.stats.depth.max(depth);
        if subset.len() <= self.cfg.binth || depth >= self.cfg.depth_max {
            return self.leaf(subset);
        }
        let (dim, thresh) = match self.best_split(&subset, &cell) {
            Some(split) => split,
            None => return self.leaf(subset),
        };

        let i = dim.index();
        let left: Vec<u32> = subset
            .iter()
            .copied()
            .filter(|&ri| self.rules[ri as usize].dims[i].low <= thresh)
            .collect();
        let right: Vec<u32> = subset
            .iter()
            .copied()
            .filter(|&ri| self.rules[ri as usize].dims[i].high > thresh)
            .collect();
        drop(subset);

        let mut lcell = cell;
        lcell[i].high = thresh;
        let mut rcell = cell;
        rcell[i].low = thresh + 1;

        let lchild = self.split(left, lcell, depth + 1);
        let rchild = self.split(right, rcell, depth + 1);
        self.nodes.push(Node::Split {
            dim,
            thresh,
            left: lchild,
            right: rchild,
        });
        (self.nodes.len() - 1) as u32
    }

    fn leaf(&mut self, mut subset: Vec<u32>) -> u32 {
        subset.sort_unstable_by_key(|&ri| self.rules[ri as usize].priority);
        let start = self.leaf_refs.len() as u32;
        self.leaf_refs.extend_from_slice(&subset);
        let end = self.leaf_refs.len() as u32;
        self.stats.leaves += 1;
        self.stats.rule_refs += subset.len();
        self.nodes.push(Node::Leaf { start, end });
        (self.nodes.len() - 1) as u32
    }

    /// Choose the (dimension, threshold) pair minimizing the combined rule
    /// count of the two children. Candidates are the distinct range
    /// endpoints of the subset projected onto each dimension, clipped to
    /// the cell; ties break toward the lower dimension, then the lower
    /// threshold. Returns `None` when no candidate separates the subset.
    fn best_split(&self, subset: &[u32], cell: &Cell) -> Option<(Dim, u32)> {
        let n = subset.len();
        let mut best: Option<(usize, Dim, u32)> = None;

        for dim in Dim::ALL {
            let i = dim.index();
            let cr = cell[i];
            if cr.low == cr.high {
                continue;
            }

            let mut lows: Vec<u32> = Vec::with_capacity(n);
            let mut highs: Vec<u32> = Vec::with_capacity(n);
            for &ri in subset {
                let r = &self.rules[ri as usize].dims[i];
                lows.push(r.low.clamp(cr.low, cr.high));
                highs.push(r.high.clamp(cr.low, cr.high));
            }
            lows.sort_unstable();
            highs.sort_unstable();

            let mut cands: Vec<u32> = lows
                .iter()
                .chain(highs.iter())
                .copied()
                .filter(|&t| t < cr.high)
                .collect();
            cands.sort_unstable();
            cands.dedup();

            for &t in &cands {
                // #rules on each side; a straddling rule counts in both
                let n_left = lows.partition_point(|&v| v <= t);
                let n_right = n - highs.partition_point(|&v| v <= t);
                if n_left == 0 || n_right == 0 {
                    continue;
                }
                if n_left == n && n_right == n {
                    continue;
                }
                let cost = n_left + n_right;
                if best.map_or(true, |(c, _, _)| cost < c) {
                    best = Some((cost, dim, t));
                }
            }
        }
        best.map(|(_, dim, t)| (dim, t))
    }
}
