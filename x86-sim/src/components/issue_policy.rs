//! Issue policies: how the ROB orders a micro-op's candidate ports before
//! trying each in turn (spec.md §4.6 "Issue policy").
//!
//! Both variants only ever reorder a list of candidate port indices; they
//! never decide *whether* a micro-op issues, which stays the ROB's job
//! (`SendUopsForExecution` tries each port of the returned order until one
//! accepts the push).

use std::collections::HashMap;

/// Decides, for a micro-op with several possible ports, which one to try
/// first.
pub trait IssuePolicy {
    /// Returns `candidates` reordered by preference, most-preferred first.
    fn compute_best_order(&mut self, candidates: &[usize]) -> Vec<usize>;

    /// Called once a micro-op actually issues on `port`, so load-tracking
    /// policies can update their bookkeeping.
    fn signal_issued(&mut self, port: usize);
}

/// Always tries ports in the order the caller presented them. `signal_issued`
/// is a no-op: greedy has no state to update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Greedy;

impl IssuePolicy for Greedy {
    fn compute_best_order(&mut self, candidates: &[usize]) -> Vec<usize> {
        candidates.to_vec()
    }

    fn signal_issued(&mut self, _port: usize) {}
}

/// Tracks cumulative issued-uop counts per port and orders candidates by
/// ascending load, so that a micro-op with a choice of ports prefers
/// whichever one has done the least work so far — balancing pressure
/// across a group like Haswell's Port23 rather than always favouring the
/// lowest-numbered port.
#[derive(Debug, Default, Clone)]
pub struct LeastLoaded {
    load: HashMap<usize, u64>,
}

impl LeastLoaded {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative issued count for `port`, for tests/analyses that want to
    /// inspect balance without going through the event log.
    pub fn load_of(&self, port: usize) -> u64 {
        self.load.get(&port).copied().unwrap_or(0)
    }
}

impl IssuePolicy for LeastLoaded {
    fn compute_best_order(&mut self, candidates: &[usize]) -> Vec<usize> {
        let mut ordered = candidates.to_vec();
        // `sort_by_key` is stable, so ports tied on load keep their
        // original relative order rather than being shuffled arbitrarily.
        ordered.sort_by_key(|port| self.load_of(*port));
        ordered
    }

    fn signal_issued(&mut self, port: usize) {
        *self.load.entry(port).or_insert(0) += 1;
    }
}
