use std::num::NonZeroU32;

use tracing::debug;

use super::{
    clause::ClauseIdx,
    data::VarVec,
    trail::{Trail, TrailReason},
    decision::Vsids,
    watch::Watch,
    Lit, Solver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnalyzeResult {
    Unsat,
    Done,
}

/// Scratch state for conflict analysis. Reset at the start of every
/// analysis, so a single instance is reused for the whole solve.
#[derive(Default)]
pub(crate) struct AnalyzeState {
    seen: VarVec<bool>,

    /// New learned 1UIP clause which is under construction. Holds the
    /// literals below the conflicting decision level; the asserting literal
    /// is added last.
    new_clause: Vec<Lit>,

    /// Seen literals at the conflicting decision level whose reason clauses
    /// haven't been processed yet.
    open: u32,

    /// Have we seen this decision level during conflict analysis.
    levels_seen: Vec<bool>,

    /// Distinct levels among the analyzed literals. Their count is the glue
    /// (LBD) value of the new clause.
    levels_in_clause: Vec<u32>,
}

impl AnalyzeState {
    fn reset(&mut self, num_vars: usize, decision_levels: usize) {
        self.seen.fill(false);
        self.seen.resize(num_vars, false);
        self.new_clause.clear();
        self.levels_in_clause.clear();
        self.levels_seen.clear();
        self.levels_seen.resize(decision_levels + 1, false);
        self.open = 0;
    }

    /// Process all literals of a reason clause, skipping the implied
    /// literal itself.
    fn analyze_reason(
        &mut self,
        implied: Option<Lit>,
        reason: &[Lit],
        trail: &Trail,
        vsids: &mut Vsids,
    ) {
        debug!("analyzing reason clause {reason:?}");
        for &other_lit in reason {
            if implied == Some(other_lit) {
                continue;
            }
            self.analyze_literal(other_lit, trail, vsids);
        }
    }

    fn analyze_literal(&mut self, lit: Lit, trail: &Trail, vsids: &mut Vsids) {
        if self.seen[lit.var()] {
            return;
        }

        let lit_level = trail
            .get_decision_level(lit.var())
            .expect("conflict analysis reached an unassigned literal");
        let current_level = trail.current_decision_level();

        debug_assert!(trail.is_lit_unsatisfied(lit));
        debug_assert!(lit_level <= current_level, "{lit_level} <= {current_level}");

        // Literals assigned at level 0 are settled for good and never make
        // it into a learned clause.
        if lit_level == 0 {
            return;
        }

        self.seen[lit.var()] = true;
        vsids.bump(lit.var());

        if lit_level < current_level {
            self.new_clause.push(lit);
        } else {
            self.open += 1;
        }

        if !self.levels_seen[lit_level as usize] {
            self.levels_seen[lit_level as usize] = true;
            self.levels_in_clause.push(lit_level);
        }
    }
}

impl Solver {
    fn everything_before_last_decision_has_been_propagated(&self) -> bool {
        match self.trail.last_decision_pos() {
            Some(pos) => pos <= self.unpropagated_lit_pos,
            None => true,
        }
    }

    /// Derive a 1UIP clause from `clause`, backjump, and assert the learned
    /// clause's implied literal. Returns [`AnalyzeResult::Unsat`] for a
    /// conflict at decision level 0.
    pub(crate) fn analyze_contradiction(&mut self, clause: ClauseIdx) -> AnalyzeResult {
        debug!("analyzing contradiction. Trail: {}", self.trail.fmt_trail());
        debug_assert!(self.everything_before_last_decision_has_been_propagated());
        debug_assert!(self.unpropagated_lit_pos <= self.trail.assigned_vars());
        debug_assert!(self
            .clause_db
            .get(clause)
            .iter()
            .all(|&lit| self.trail.is_lit_unsatisfied(lit)));

        let current_level = self.trail.current_decision_level();

        if current_level == 0 {
            return AnalyzeResult::Unsat;
        }

        self.analyze_state
            .reset(self.trail.total_vars(), current_level as usize);

        // Walk the trail backwards with a scratch index, resolving reason
        // clauses until only one literal of the current level remains open.
        // The trail itself is never modified here.
        let mut trail_pos = self.trail.assigned_vars();
        let mut reason_idx = clause;
        let mut implied: Option<Lit> = None;

        let uip = loop {
            self.clause_db.bump_activity(reason_idx);
            let reason = self.clause_db.get(reason_idx);
            self.analyze_state
                .analyze_reason(implied, reason, &self.trail, &mut self.vsids);

            let pivot = loop {
                debug_assert!(trail_pos > 0, "conflict analysis ran off the trail");
                trail_pos -= 1;

                let lit = self
                    .trail
                    .get(trail_pos)
                    .expect("conflict analysis ran off the trail")
                    .lit;

                if !self.analyze_state.seen[lit.var()] {
                    continue;
                }
                if self.trail.get_decision_level(lit.var()) == Some(current_level) {
                    break lit;
                }
            };
            implied = Some(pivot);

            if self.analyze_state.open == 1 {
                break pivot;
            }
            self.analyze_state.open -= 1;

            reason_idx = match self.trail.get_reason(pivot.var()) {
                Some(TrailReason::Propagated { cls }) => cls,
                reason => unreachable!(
                    "resolution reached literal {pivot} which has no antecedent clause (reason {reason:?})"
                ),
            };
            debug!(
                "resolving against the reason of {pivot} (open = {})",
                self.analyze_state.open
            );
        };

        let state = &mut self.analyze_state;

        // The asserting literal goes to the first slot, where the watches
        // expect it; a literal of the backjump level goes second.
        state.new_clause.push(-uip);
        let last = state.new_clause.len() - 1;
        state.new_clause.swap(0, last);

        let mut backjump_level = 0;
        if state.new_clause.len() >= 2 {
            let mut deepest = 1;
            for i in 1..state.new_clause.len() {
                let level = self
                    .trail
                    .get_decision_level(state.new_clause[i].var())
                    .expect("learned clause literal must be assigned");
                if level > backjump_level {
                    backjump_level = level;
                    deepest = i;
                }
            }
            state.new_clause.swap(1, deepest);
        }
        debug_assert!(backjump_level < current_level);
        debug!(
            "learned 1UIP clause {:?}, backjumping to level {backjump_level}",
            state.new_clause
        );

        self.backjump(backjump_level);

        let state = &self.analyze_state;
        debug_assert!(self.trail.is_lit_unassigned(-uip));
        debug_assert!(state.new_clause[1..]
            .iter()
            .all(|&lit| self.trail.is_lit_unsatisfied(lit)));

        if state.new_clause.len() == 1 {
            debug_assert_eq!(backjump_level, 0);
            self.trail.assign_lit(-uip, TrailReason::Axiom);
        } else {
            let glue = NonZeroU32::new(state.levels_in_clause.len() as u32)
                .expect("a non-unit learned clause spans at least one level");
            let cls_idx = self.clause_db.insert_clause(&state.new_clause, Some(glue));
            for &lit in &self.analyze_state.new_clause[0..2] {
                self.watches[lit].push(Watch { clause: cls_idx });
            }
            debug!(
                "asserting flipped uip {} because of learned driving clause (glue {glue})",
                -uip
            );
            self.trail
                .assign_lit(-uip, TrailReason::Propagated { cls: cls_idx });
            self.clause_db.set_reason(cls_idx, true);
            self.clause_db.bump_activity(cls_idx);
            self.stats.learned_clauses += 1;
        }

        AnalyzeResult::Done
    }
}
