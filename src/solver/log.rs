use std::collections::VecDeque;

use tracing::{debug, instrument};

use super::{
    data::VarVec,
    trail::{Trail, TrailReason},
    Lit, Solver, Var,
};

const RED: &str = "\u{1b}[31m";
const GREEN: &str = "\u{1b}[32m";
const END: &str = "\u{1b}[0m";

impl Solver {
    #[instrument(skip_all)]
    pub(crate) fn log_state(&self) {
        #[cfg(debug_assertions)]
        if tracing::enabled!(tracing::Level::DEBUG) {
            for cls in self.clause_db.iter() {
                let cls_str = self.trail.fmt_clause(cls);
                debug!("{cls_str}");
            }
        }
    }

    /// Explain how `var` got its value: walk the antecedents backwards,
    /// reporting every forcing clause once and stopping at decisions,
    /// axioms, and unassigned variables.
    pub fn implication_chain(&self, var: i32) -> String {
        if var < 1 || var as usize > self.trail.total_vars() {
            return format!("variable {var} is unknown to the solver");
        }
        let var = Var::new(var);

        let mut lines = Vec::new();
        let mut queue = VecDeque::from([var]);
        let mut enqueued: VarVec<bool> = VarVec::new();
        enqueued.resize(self.trail.total_vars(), false);
        enqueued[var] = true;

        while let Some(var) = queue.pop_front() {
            match self.trail.get_reason(var) {
                Some(TrailReason::Propagated { cls }) => {
                    let clause = self.clause_db.get(cls);
                    lines.push(format!(
                        "variable {var} was forced by clause ({})",
                        fmt_lits(clause)
                    ));
                    for &lit in clause {
                        if lit.var() == var || enqueued[lit.var()] {
                            continue;
                        }
                        if self.trail.is_lit_assigned(lit) {
                            enqueued[lit.var()] = true;
                            queue.push_back(lit.var());
                        }
                    }
                }
                Some(TrailReason::Decision) => {
                    lines.push(format!("variable {var} is a decision"));
                }
                Some(TrailReason::Axiom) => {
                    lines.push(format!("variable {var} is a top-level fact"));
                }
                None => {
                    lines.push(format!("variable {var} is unassigned"));
                }
            }
        }

        lines.join("\n")
    }

    #[allow(unused)]
    pub(crate) fn implication_graph_to_dot(
        &self,
        conflict: Option<&[Lit]>,
        mut out: impl std::io::Write,
    ) -> Result<(), std::io::Error> {
        writeln!(out, "digraph {{")?;
        for elem in self.trail.trail() {
            let annotation = match elem.reason {
                TrailReason::Decision => "D",
                TrailReason::Propagated { .. } => "P",
                TrailReason::Axiom => "A",
            };

            writeln!(
                out,
                "{} [label = \"{}{annotation}\"];",
                elem.lit.var(),
                elem.lit
            )?;

            if let TrailReason::Propagated { cls } = elem.reason {
                for &l in self.clause_db.get(cls) {
                    if l == elem.lit {
                        continue;
                    }
                    writeln!(out, "{} -> {};", l.var(), elem.lit.var())?;
                }
            }
        }

        if let Some(conflict) = conflict {
            writeln!(out, "X;")?;
            for l in conflict {
                writeln!(out, "{} -> X;", l.var())?;
            }
        }

        writeln!(out, "}}")
    }
}

fn fmt_lits(clause: &[Lit]) -> String {
    clause
        .iter()
        .map(|lit| lit.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Trail {
    pub(crate) fn fmt_lit(&self, lit: Lit) -> String {
        match self.get_lit_assignment(lit) {
            Some(true) => format!("{GREEN}{lit}{END}"),
            Some(false) => format!("{RED}{lit}{END}"),
            None => format!("{lit}"),
        }
    }

    pub(crate) fn fmt_clause(&self, clause: &[Lit]) -> String {
        clause
            .iter()
            .map(|&lit| self.fmt_lit(lit))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn fmt_trail(&self) -> String {
        let elems: Vec<_> = self
            .trail()
            .iter()
            .map(|trail_elem| {
                let lit = trail_elem.lit;
                match trail_elem.reason {
                    TrailReason::Decision => format!("{lit}D"),
                    TrailReason::Propagated { .. } => format!("{lit}P"),
                    TrailReason::Axiom => format!("{lit}A"),
                }
            })
            .collect();

        format!("[{}]", elems.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use crate::solver::Solver;

    #[test]
    fn chain_walks_back_to_the_decision() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2]);
        solver.add_clause([-1, 3]);
        solver.add_clause([-2, -3]);

        assert!(solver.solve().is_sat());

        // Deciding 1 forces 3 which in turn forces -2.
        let chain = solver.implication_chain(2);
        assert!(chain.contains("variable 2 was forced by clause (-2 -3)"));
        // The implied literal leads its reason clause.
        assert!(chain.contains("variable 3 was forced by clause (3 -1)"));
        assert!(chain.contains("variable 1 is a decision"));

        assert_eq!(solver.implication_chain(1), "variable 1 is a decision");
    }

    #[test]
    fn chain_rejects_unknown_variables() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2]);

        for bogus in [0, -3, 7] {
            assert_eq!(
                solver.implication_chain(bogus),
                format!("variable {bogus} is unknown to the solver")
            );
        }
    }

    #[test]
    fn chain_reports_top_level_facts() {
        let mut solver = Solver::new();
        solver.add_clause([2]);
        solver.add_clause([-2, 1]);

        assert!(solver.solve().is_sat());

        let chain = solver.implication_chain(1);
        assert!(chain.contains("variable 1 was forced by clause (1 -2)"));
        assert!(chain.contains("variable 2 is a top-level fact"));
    }
}
