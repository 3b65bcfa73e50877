use super::{
    assignment::Assignment,
    clause::ClauseIdx,
    Lit, Var,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrailReason {
    /// Literal was decided.
    Decision,

    /// Literal was propagated during unit propagation [`Solver::propagate`]
    Propagated { cls: ClauseIdx },

    /// Axiomatic literal. These come from input unit clauses and from
    /// learned unit clauses, which are never stored in the clause database.
    Axiom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrailElement {
    pub(crate) lit: Lit,
    pub(crate) reason: TrailReason,
}

/// Chronological stack of assigned literals.
///
/// `level_starts[d]` holds the trail index at which decision level `d + 1`
/// began; the current decision level is `level_starts.len()`. Level 0 holds
/// the axioms and their propagations only.
#[derive(Default)]
pub(crate) struct Trail {
    trail: Vec<TrailElement>,
    level_starts: Vec<u32>,
    assignment: Assignment,
}

impl Trail {
    pub fn assigned_vars(&self) -> usize {
        self.trail.len()
    }

    pub fn total_vars(&self) -> usize {
        self.assignment.len()
    }

    pub fn get(&self, idx: usize) -> Option<&TrailElement> {
        self.trail.get(idx)
    }

    pub fn trail(&self) -> &[TrailElement] {
        &self.trail
    }

    pub fn get_lit_assignment(&self, lit: Lit) -> Option<bool> {
        self.assignment.get(lit)
    }

    /// Expands internal assignment for new max variable.
    pub fn expand(&mut self, var: Var) {
        self.assignment.expand(var)
    }

    pub fn current_decision_level(&self) -> u32 {
        self.level_starts.len() as u32
    }

    /// Trail position of the most recent decision.
    pub fn last_decision_pos(&self) -> Option<usize> {
        self.level_starts.last().map(|&pos| pos as usize)
    }

    pub fn get_decision_level(&self, var: Var) -> Option<u32> {
        self.assignment.data(var).map(|data| data.decision_level)
    }

    pub fn get_trail_pos(&self, var: Var) -> Option<usize> {
        self.assignment.data(var).map(|data| data.trail_pos as usize)
    }

    pub fn get_reason(&self, var: Var) -> Option<TrailReason> {
        let pos = self.get_trail_pos(var)?;
        Some(self.trail[pos].reason)
    }

    pub fn assignment_complete(&self) -> bool {
        self.trail.len() == self.assignment.len()
    }

    pub fn is_lit_assigned(&self, lit: Lit) -> bool {
        self.assignment.is_lit_assigned(lit)
    }

    pub fn is_lit_unassigned(&self, lit: Lit) -> bool {
        self.assignment.is_lit_unassigned(lit)
    }

    pub fn is_lit_satisfied(&self, lit: Lit) -> bool {
        self.assignment.is_lit_satisfied(lit)
    }

    pub fn is_lit_unsatisfied(&self, lit: Lit) -> bool {
        self.assignment.is_lit_unsatisfied(lit)
    }

    pub fn assign_lit(&mut self, lit: Lit, reason: TrailReason) {
        if reason == TrailReason::Decision {
            self.level_starts.push(self.trail.len() as u32);
        }
        let trail_pos = self.trail.len() as u32;
        self.trail.push(TrailElement { lit, reason });
        self.assignment
            .assign_lit(lit, self.current_decision_level(), trail_pos);
    }

    /// Undo all assignments made above `level`. Every popped element is
    /// handed to `on_unassign` after its variable has been unassigned.
    /// Returns the new trail length, which is where propagation resumes.
    pub fn backtrack(
        &mut self,
        level: u32,
        mut on_unassign: impl FnMut(&TrailElement),
    ) -> usize {
        debug_assert!(level < self.current_decision_level());

        let keep = self.level_starts[level as usize] as usize;
        while self.trail.len() > keep {
            let elem = self.trail.pop().expect("trail shorter than its level marker");
            self.assignment.unassign_lit(elem.lit);
            on_unassign(&elem);
        }
        self.level_starts.truncate(level as usize);

        keep
    }

    /// Rewrite the clause indices held as propagation reasons, e.g. after
    /// the clause database has been compacted.
    pub fn update_clause_indices(&mut self, mut f: impl FnMut(&mut ClauseIdx)) {
        for elem in &mut self.trail {
            if let TrailReason::Propagated { cls } = &mut elem.reason {
                f(cls);
            }
        }
    }

    pub fn is_clause_satisfied(&self, clause: &[Lit]) -> bool {
        clause.iter().any(|&lit| self.is_lit_satisfied(lit))
    }
}
