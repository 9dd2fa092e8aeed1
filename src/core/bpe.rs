//! Rank-ordered pair merging over a linked list of symbols.
//!
//! Symbols are held in a slot array linked through `prev`/`next` indices, so
//! a merge is O(1): the left slot takes the merged id and the right slot is
//! unlinked. Candidate pairs sit in a min-heap keyed by `(rank, position)`.
//!
//! Merging proceeds in rounds. A round pops every candidate of the lowest
//! rank in left-to-right order and applies the still-valid ones, so all
//! non-overlapping occurrences of the winning pair merge before any pair the
//! round itself creates is considered. This is the same result as rescanning
//! the whole sequence for the best pair each time.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::vocab::Vocabulary;

const NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Symbol {
    id: u32,
    prev: usize,
    next: usize,
    alive: bool,
}

/// A pair that was mergeable when it was pushed. Field order gives the heap
/// ordering: rank first, then leftmost position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    rank: u32,
    position: usize,
    left: u32,
    right: u32,
    merged: u32,
}

/// Apply the merge table to a sequence of base-unit ids.
///
/// Every id in `symbols` must be a vocabulary id; the result holds the ids of
/// the final symbols in order.
pub fn byte_pair_merge(symbols: &[u32], vocab: &Vocabulary) -> Vec<u32> {
    if symbols.len() < 2 {
        return symbols.to_vec();
    }

    let last = symbols.len() - 1;
    let mut slots: Vec<Symbol> = symbols
        .iter()
        .enumerate()
        .map(|(i, &id)| Symbol {
            id,
            prev: if i == 0 { NONE } else { i - 1 },
            next: if i == last { NONE } else { i + 1 },
            alive: true,
        })
        .collect();

    let mut heap = BinaryHeap::new();
    for position in 0..last {
        if let Some(candidate) = candidate_at(&slots, position, vocab) {
            heap.push(Reverse(candidate));
        }
    }

    let mut round = Vec::new();
    let mut fresh = Vec::new();

    while let Some(Reverse(first)) = heap.pop() {
        round.clear();
        round.push(first);
        while let Some(Reverse(next)) = heap.peek() {
            if next.rank != first.rank {
                break;
            }
            round.push(*next);
            heap.pop();
        }

        fresh.clear();
        for candidate in &round {
            let Some(right) = live_pair(&slots, candidate) else {
                continue;
            };

            let left = candidate.position;
            let after = slots[right].next;
            slots[left].id = candidate.merged;
            slots[left].next = after;
            slots[right].alive = false;
            if after != NONE {
                slots[after].prev = left;
            }

            let before = slots[left].prev;
            if before != NONE {
                fresh.push(before);
            }
            fresh.push(left);
        }

        for &position in &fresh {
            if let Some(candidate) = candidate_at(&slots, position, vocab) {
                heap.push(Reverse(candidate));
            }
        }
    }

    slots
        .iter()
        .filter(|symbol| symbol.alive)
        .map(|symbol| symbol.id)
        .collect()
}

/// Candidate for the pair starting at `position`, if that pair can merge.
#[inline]
fn candidate_at(slots: &[Symbol], position: usize, vocab: &Vocabulary) -> Option<Candidate> {
    let symbol = slots[position];
    if !symbol.alive || symbol.next == NONE {
        return None;
    }
    let right = slots[symbol.next].id;
    vocab.merge_rule(symbol.id, right).map(|rule| Candidate {
        rank: rule.rank,
        position,
        left: symbol.id,
        right,
        merged: rule.merged,
    })
}

/// Index of the right slot if `candidate` still describes a live pair.
#[inline]
fn live_pair(slots: &[Symbol], candidate: &Candidate) -> Option<usize> {
    let left = slots[candidate.position];
    if !left.alive || left.id != candidate.left || left.next == NONE {
        return None;
    }
    let right = left.next;
    (slots[right].id == candidate.right).then_some(right)
}
