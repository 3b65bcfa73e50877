use super::{data::VarVec, Lit, Var};

#[derive(Clone, Copy, Debug)]
pub(crate) struct AssignData {
    pub status: bool,
    pub decision_level: u32,
    pub trail_pos: u32,
}

/// Per-variable assignment store. Decision levels and antecedents of
/// assigned variables are resolved through their trail position.
#[derive(Default)]
pub(crate) struct Assignment {
    assignment: VarVec<Option<AssignData>>,
}

impl Assignment {
    pub fn expand(&mut self, v: Var) {
        self.assignment.expand(v, None);
    }

    pub fn get(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.var()].map(|var_val| var_val.status == lit.is_pos())
    }

    pub fn data(&self, var: Var) -> Option<AssignData> {
        self.assignment[var]
    }

    pub fn is_lit_satisfied(&self, lit: Lit) -> bool {
        matches!(self.assignment[lit.var()], Some(var_val) if var_val.status == lit.is_pos())
    }

    pub fn is_lit_unsatisfied(&self, lit: Lit) -> bool {
        matches!(self.assignment[lit.var()], Some(var_val) if var_val.status != lit.is_pos())
    }

    pub fn is_lit_assigned(&self, lit: Lit) -> bool {
        self.assignment[lit.var()].is_some()
    }

    pub fn is_lit_unassigned(&self, lit: Lit) -> bool {
        self.assignment[lit.var()].is_none()
    }

    pub fn assign_lit(&mut self, lit: Lit, decision_level: u32, trail_pos: u32) {
        debug_assert!(self.is_lit_unassigned(lit));

        self.assignment[lit.var()] = Some(AssignData {
            status: lit.is_pos(),
            decision_level,
            trail_pos,
        });
    }

    pub fn unassign_lit(&mut self, lit: Lit) {
        debug_assert!(self.is_lit_assigned(lit));

        self.assignment[lit.var()] = None;
    }

    pub fn len(&self) -> usize {
        self.assignment.len()
    }
}
