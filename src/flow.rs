//! Stand-ins for the three external collaborators spec §1 names as
//! out-of-scope: the static edge-probability estimator
//! (`estimate_probability`), the min-cost-flow solver
//! (`mcf_smooth_cfg`), and the count-to-frequency translator
//! (`counts_to_freqs`).
//!
//! A real compiler supplies its own, much more sophisticated, versions of
//! all three; these are simplified, self-contained substitutes so this
//! crate is usable end-to-end on its own minimal [`crate::cfg::Function`].
//! They implement the same contracts spec §4.5 describes for each step,
//! not a literal port of any existing solver.

use crate::cfg::{Function, PROB_BASE};

/// Assign a uniform static probability to every successor of blocks whose
/// edges haven't already been given one (all-zero probabilities), mirroring
/// what a real profile-less probability estimator would produce for a block
/// with no other information: each of its `n` successors gets `1/n`.
///
/// Blocks whose edges already carry nonzero probabilities (the common case
/// in tests, where the caller sets them explicitly) are left untouched.
pub fn estimate_probability(func: &mut Function) {
    let blocks: Vec<_> = func.order().to_vec();
    for block in blocks {
        let bb = func.block_mut(block);
        let already_estimated = bb.successors.iter().any(|e| e.probability != 0);
        if already_estimated || bb.successors.is_empty() {
            continue;
        }
        let n = bb.successors.len() as u32;
        let share = PROB_BASE / n;
        let mut remainder = PROB_BASE % n;
        for edge in &mut bb.successors {
            let bump = if remainder > 0 {
                remainder -= 1;
                1
            } else {
                0
            };
            edge.probability = share + bump;
        }
    }
}

/// Adjust edge counts to restore flow consistency (spec §4.5 step 5):
/// for every non-terminal block, the sum of incoming edge counts should
/// equal the block's own count, which should equal the sum of outgoing
/// edge counts.
///
/// This is a fixed-point relaxation rather than a true min-cost-flow
/// solve: it repeatedly calls [`reseed_once`], iterated until it stops
/// changing or a bound is hit. For the acyclic CFGs this annotator smooths
/// (the common case after straight-line/diamond control flow), this
/// converges to an exact solution in a small constant number of
/// iterations; cyclic (loop-carrying) CFGs converge to an approximation
/// rather than the exact minimum-cost adjustment a real solver would find.
pub fn mcf_smooth_cfg(func: &mut Function, max_iterations: usize) {
    let order = func.order().to_vec();
    let mut previous: Vec<i64> = order.iter().map(|&b| func.block(b).count).collect();

    for _ in 0..max_iterations {
        reseed_once(func);
        let current: Vec<i64> = order.iter().map(|&b| func.block(b).count).collect();
        if current == previous {
            break;
        }
        previous = current;
    }
}

/// Refresh every real block's outgoing edges from that block's *current*
/// count and static probability: `edge.count = block.count *
/// edge.probability / PROB_BASE`. Does not touch any block's own count —
/// callers that need edges to reflect a just-settled count (e.g. before
/// reading a predecessor sum) call this alone, without the block-count
/// update [`reseed_once`] also performs.
pub(crate) fn seed_edges_from_counts(func: &mut Function) {
    let order = func.order().to_vec();
    let counts: Vec<i64> = order.iter().map(|&b| func.block(b).count).collect();
    for (&block, &count) in order.iter().zip(counts.iter()) {
        let bb = func.block_mut(block);
        for edge in &mut bb.successors {
            edge.count = count * edge.probability as i64 / PROB_BASE as i64;
        }
    }
}

/// One full reconciliation pass: refresh every edge from its source
/// block's current count ([`seed_edges_from_counts`]), then set every
/// block's count to the sum of its *incoming* edges
/// (`Function::incoming_edge_sums`) — not, as a point fix once assumed, a
/// re-sum of the same block's own outgoing edges, which only reconciles a
/// block against itself and never propagates a count to its successors.
/// A block with no incoming edge from another real block (the function's
/// entry block, whose only predecessor is the pseudo `ENTRY` node bridged
/// separately) keeps its existing count.
pub(crate) fn reseed_once(func: &mut Function) {
    seed_edges_from_counts(func);
    let incoming = func.incoming_edge_sums();
    let order = func.order().to_vec();
    for block in order {
        if let Some(&sum) = incoming.get(&block) {
            func.block_mut(block).count = sum;
        }
    }
}

/// Translate absolute counts into relative frequencies, scaled against
/// `entry_count` so that `ENTRY` itself has frequency [`PROB_BASE`]. Blocks
/// unreachable from `ENTRY` (or when `entry_count == 0`) get frequency 0.
pub fn counts_to_freqs(func: &Function) -> Vec<(crate::cfg::Block, u32)> {
    let entry_count = func.entry_count.max(0);
    func.order()
        .iter()
        .map(|&b| {
            let count = func.block(b).count.max(0);
            let freq = if entry_count == 0 {
                0
            } else {
                ((count as i128 * PROB_BASE as i128) / entry_count as i128) as u32
            };
            (b, freq)
        })
        .collect()
}
