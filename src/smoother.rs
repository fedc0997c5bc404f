//! The CFG smoother: reconciles raw per-block counts with edge-probability
//! flow, per spec §4.5.

use crate::cfg::{Block, Function};
use crate::flow;

/// Whether a function's smoothed profile was adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// The smoothed counts were adopted; downstream passes may treat them
    /// like instrumented-profile data.
    Read,
    /// The attempt was discarded; all block counts were zeroed and the
    /// pre-existing static probability estimate should be used instead.
    Absent,
}

/// Maximum number of min-cost-flow relaxation rounds (spec's external
/// `mcf_smooth_cfg` is unbounded; this crate's stand-in bounds it so a
/// pathological cyclic CFG can't loop indefinitely).
const MAX_MCF_ITERATIONS: usize = 16;

/// Smooth `func`'s CFG, given that `annotated_blocks` real blocks received a
/// nonzero count directly from [`crate::annotate::annotate_function`]
/// (before any seeding or smoothing ran).
///
/// Returns the adopted (or discarded) status, and the per-block relative
/// frequencies computed from the final counts (empty if discarded).
pub fn smooth_cfg(func: &mut Function, annotated_blocks: usize) -> (ProfileStatus, Vec<(Block, u32)>) {
    // Step 1, "compact blocks": a no-op here since this crate's `Function`
    // never leaves gaps in its block numbering (`create_block` always
    // appends), unlike a real compiler's CFG after block deletion.

    // Step 2: seed edge counts from block counts and static probabilities,
    // twice in succession (spec's own source runs this seeding pass twice;
    // §9 notes that either one pass or two may be kept — this crate keeps
    // both, matching the existing numerical convergence behavior rather
    // than assuming the second pass is redundant). Each `reseed_once` sets
    // every block's count from the sum of its *incoming* edges, so two
    // passes propagate an annotated count two CFG levels deep (e.g. through
    // a diamond's branch blocks and into its join block).
    let order: Vec<Block> = func.order().to_vec();
    for _ in 0..2 {
        flow::reseed_once(func);
    }
    // Refresh edges once more so every edge — including a real block's edge
    // into `EXIT` — reflects the count that just settled on its source
    // block; `reseed_once`'s own edge refresh runs *before* that pass's
    // block-count update, so without this the edge into `EXIT` would still
    // carry the prior (typically stale) count by the time bridging reads it
    // below.
    flow::seed_edges_from_counts(func);

    // Step 3: entry/exit bridging.
    bridge_entry_exit(func);

    // Step 4, "add fake exit edges for no-return paths": out of scope here
    // (external utility per spec §1); this crate's `Function` only models
    // blocks that already reach `EXIT` through a real edge.

    // Step 5: invoke (a stand-in for) minimum-cost-flow smoothing.
    flow::mcf_smooth_cfg(func, MAX_MCF_ITERATIONS);

    // Step 6: remove fake edges (none were added) and convert counts to
    // relative frequencies.
    let freqs = flow::counts_to_freqs(func);

    // Adoption criterion (spec §4.5): adopt if more than one block was
    // annotated, or exactly one in a small function; otherwise discard by
    // zeroing every block's count.
    let n_bb = func.n_basic_blocks();
    if annotated_blocks > 1 || (annotated_blocks == 1 && n_bb < 5) {
        (ProfileStatus::Read, freqs)
    } else {
        for &block in &order {
            func.block_mut(block).count = 0;
            for edge in &mut func.block_mut(block).successors {
                edge.count = 0;
            }
        }
        func.entry_count = 0;
        func.exit_count = 0;
        (ProfileStatus::Absent, Vec::new())
    }
}

fn bridge_entry_exit(func: &mut Function) {
    let entry = func.entry();
    let dests: Vec<Block> = func.block(entry).successors.iter().map(|e| e.to).collect();
    let dest_counts: Vec<i64> = dests.iter().map(|&d| func.block(d).count).collect();

    {
        let bb = func.block_mut(entry);
        for (edge, &count) in bb.successors.iter_mut().zip(dest_counts.iter()) {
            edge.count = count;
        }
    }

    func.entry_count = dest_counts.iter().sum();
    func.exit_count = func.exit_predecessor_sum();
}
