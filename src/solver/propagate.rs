/// Implementation of the unit propagation algorithm for two watched literals.
use tracing::trace;

use super::{clause::ClauseIdx, trail::TrailReason, watch::Watch, Solver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropagationResult {
    Contradiction(ClauseIdx),
    Done,
}

impl Solver {
    /// Propagate all pending trail literals to fixpoint or until the first
    /// conflicting clause is found. On a contradiction the queue head is
    /// left in place; backtracking resets it.
    pub(crate) fn propagate(&mut self) -> PropagationResult {
        while let Some(&trail_elem) = self.trail.get(self.unpropagated_lit_pos) {
            self.unpropagated_lit_pos += 1;
            self.stats.propagations += 1;

            let lit = trail_elem.lit;
            debug_assert!(self.trail.is_lit_satisfied(lit));

            // Clauses that may have turned unit or conflicting watch -lit.
            let false_lit = -lit;

            // The list is detached while we scan it. Watch relocations only
            // target literals that are currently not unsatisfied, so no new
            // entry can arrive for `false_lit` during the scan.
            let mut watch_list = std::mem::take(&mut self.watches[false_lit]);
            let mut contradiction_found = None;

            let mut i = 0;
            while i < watch_list.len() {
                let cls_idx = watch_list[i].clause;
                let cls = self.clause_db.get_mut(cls_idx);

                let watch_pos = if cls[0] == false_lit {
                    0
                } else {
                    debug_assert!(cls[1] == false_lit);
                    1
                };
                let other = cls[watch_pos ^ 1];

                if self.trail.is_lit_satisfied(other) {
                    // Clause is already satisfied, keep the watch.
                    i += 1;
                    continue;
                }

                // Search for a new unassigned or satisfied literal to watch.
                let replacement =
                    (2..cls.len()).find(|&k| !self.trail.is_lit_unsatisfied(cls[k]));

                if let Some(k) = replacement {
                    let new_watch = cls[k];
                    cls.swap(watch_pos, k);
                    self.watches[new_watch].push(Watch { clause: cls_idx });

                    // The swap places an unexamined entry at position `i`,
                    // so the cursor stays put.
                    watch_list.swap_remove(i);
                    continue;
                }

                // All non-watched literals are unsatisfied, so the clause is
                // unit or conflicting, depending on the other watched
                // literal (which can not be satisfied at this point).
                if self.trail.is_lit_unassigned(other) {
                    // Keep the implied literal in the first slot, so reason
                    // clauses always lead with the literal they forced.
                    if watch_pos == 0 {
                        cls.swap(0, 1);
                    }
                    self.trail
                        .assign_lit(other, TrailReason::Propagated { cls: cls_idx });
                    // Lock the clause; antecedents must survive reduction.
                    self.clause_db.set_reason(cls_idx, true);
                    i += 1;
                } else {
                    debug_assert!(self.trail.is_lit_unsatisfied(other));
                    contradiction_found = Some(cls_idx);
                    break;
                }
            }

            self.watches[false_lit] = watch_list;

            if let Some(conflicting_clause) = contradiction_found {
                trace!(
                    "contradiction in clause {:?}",
                    self.clause_db.get(conflicting_clause)
                );
                return PropagationResult::Contradiction(conflicting_clause);
            }
        }

        debug_assert_eq!(self.unpropagated_lit_pos, self.trail.assigned_vars());
        PropagationResult::Done
    }
}
