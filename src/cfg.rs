//! The per-function control-flow graph the annotator and smoother operate
//! on.
//!
//! A real compiler's CFG and its traversal primitives are out of scope for
//! this crate (spec §1); what's in scope is the shape the smoother needs —
//! blocks with a count, outgoing edges with a static probability and a
//! count, and the two pseudo-blocks (`ENTRY`/`EXIT`) spec §4.5 bridges
//! against. `Function` below is the minimal structure that provides that
//! shape, in the same spirit as `cranelift-codegen`'s own `flowgraph.rs`
//! building a `ControlFlowGraph` directly over a `Function`'s blocks.

use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;

use crate::entities::{Block, FuncId};
use crate::ir::{ScopeTree, Statement};

/// The base probabilities are expressed against; an edge's `probability` is
/// a value in `0..=PROB_BASE`.
pub const PROB_BASE: u32 = 10_000;

/// An outgoing CFG edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Destination block.
    pub to: Block,
    /// Static branch probability out of [`PROB_BASE`], as produced by the
    /// (out-of-scope) static edge-probability estimator.
    pub probability: u32,
    /// This edge's smoothed sample count, filled in by
    /// [`crate::smoother`].
    pub count: i64,
}

/// One basic block: its statements (consulted by the annotator) and its
/// outgoing edges and count (consulted and updated by the smoother).
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    /// IR statements in traversal order.
    pub statements: Vec<Statement>,
    /// Outgoing edges, in successor order.
    pub successors: Vec<Edge>,
    /// This block's execution count. Set by [`crate::annotate`], refined by
    /// [`crate::smoother`].
    pub count: i64,
}

/// A function's control-flow graph, plus the lexical-scope tree its
/// statements' inline stacks are resolved against.
pub struct Function {
    /// The function's assembler (mangled) name, used as part of every
    /// sample-index lookup key (spec §4.4's "current compilation's function
    /// name" invariant).
    pub name: FuncId,
    /// Lexical-scope tree backing every statement's `scope` field.
    pub scopes: ScopeTree,
    blocks: PrimaryMap<Block, BasicBlock>,
    order: Vec<Block>,
    entry: Block,
    exit: Block,
    /// `ENTRY`'s count, set by the smoother's entry/exit bridging step.
    pub entry_count: i64,
    /// `EXIT`'s count, set by the smoother's entry/exit bridging step.
    pub exit_count: i64,
    /// Set once [`crate::session::annotate`] has run the static
    /// edge-probability estimator and the annotation/smoothing pipeline for
    /// this function (spec §6.2's "mark the function as post-profile so the
    /// pass is idempotent"). A second call skips re-estimating
    /// probabilities that a prior call (or an explicit estimate) already
    /// produced.
    pub profiled: bool,
}

impl Function {
    /// Create an empty function with just the `ENTRY`/`EXIT` pseudo-blocks.
    pub fn new(name: FuncId) -> Self {
        let mut blocks = PrimaryMap::new();
        let entry = blocks.push(BasicBlock::default());
        let exit = blocks.push(BasicBlock::default());
        Self {
            name,
            scopes: ScopeTree::new(),
            blocks,
            order: Vec::new(),
            entry,
            exit,
            entry_count: 0,
            exit_count: 0,
            profiled: false,
        }
    }

    /// The pseudo-block preceding every real entry point.
    pub fn entry(&self) -> Block {
        self.entry
    }

    /// The pseudo-block following every real exit point.
    pub fn exit(&self) -> Block {
        self.exit
    }

    /// Append a new, empty real basic block in layout order.
    pub fn create_block(&mut self) -> Block {
        let b = self.blocks.push(BasicBlock::default());
        self.order.push(b);
        b
    }

    /// Real basic blocks, in layout order (excludes `ENTRY`/`EXIT`).
    pub fn order(&self) -> &[Block] {
        &self.order
    }

    /// Number of real basic blocks (spec's `n_basic_blocks`, excluding
    /// `ENTRY`/`EXIT`).
    pub fn n_basic_blocks(&self) -> usize {
        self.order.len()
    }

    /// Borrow a block.
    pub fn block(&self, b: Block) -> &BasicBlock {
        &self.blocks[b]
    }

    /// Mutably borrow a block.
    pub fn block_mut(&mut self, b: Block) -> &mut BasicBlock {
        &mut self.blocks[b]
    }

    /// Add a normal CFG edge between two real blocks, or from `ENTRY`, or to
    /// `EXIT`.
    pub fn add_edge(&mut self, from: Block, to: Block, probability: u32) {
        self.blocks[from].successors.push(Edge {
            to,
            probability,
            count: 0,
        });
    }

    /// Connect `ENTRY` to a function's real entry block.
    pub fn connect_entry(&mut self, to: Block, probability: u32) {
        let entry = self.entry;
        self.add_edge(entry, to, probability);
    }

    /// Connect a real block with no successors to `EXIT`.
    pub fn connect_exit(&mut self, from: Block) {
        let exit = self.exit;
        self.add_edge(from, exit, PROB_BASE);
    }

    /// Sum of edge counts flowing into `exit` from real blocks — spec
    /// §4.5 step 3's "sum of its predecessor-edge counts".
    pub fn exit_predecessor_sum(&self) -> i64 {
        let exit = self.exit;
        self.order
            .iter()
            .flat_map(|&b| self.blocks[b].successors.iter())
            .filter(|e| e.to == exit)
            .map(|e| e.count)
            .sum()
    }

    /// Sum of incoming edge counts for every block reached by at least one
    /// edge from another real block. A block with no such entry (e.g. a
    /// function's entry block, whose only predecessor is the pseudo
    /// `ENTRY` node bridged separately) has no entry in the returned map —
    /// callers must leave that block's count as-is rather than treating a
    /// missing key as zero.
    ///
    /// This is the predecessor-side counterpart to `exit_predecessor_sum`,
    /// generalized to every real block instead of just `EXIT`; the
    /// smoother uses it to reconcile a block's count from its *incoming*
    /// flow instead of re-deriving it from its own outgoing edges.
    pub fn incoming_edge_sums(&self) -> FxHashMap<Block, i64> {
        let mut sums: FxHashMap<Block, i64> = FxHashMap::default();
        for &b in &self.order {
            for edge in &self.blocks[b].successors {
                *sums.entry(edge.to).or_insert(0) += edge.count;
            }
        }
        sums
    }
}
