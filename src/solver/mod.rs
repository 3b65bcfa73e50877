mod analyze;
mod assignment;
mod clause;
mod data;
mod decision;
mod garbage;
mod log;
mod propagate;
mod restart;
mod trail;
mod watch;

use tracing::debug;

use analyze::{AnalyzeResult, AnalyzeState};
use clause::ClauseDB;
use data::LitVec;
pub use data::{Lit, Var};
use decision::Vsids;
use propagate::PropagationResult;
use restart::RestartSchedule;
use trail::{Trail, TrailReason};
use watch::Watch;

/// Various stats that might be of interest
#[derive(Default, Debug, Clone)]
pub struct Stats {
    pub decisions: u64,
    pub contradictions: u64,
    pub propagations: u64,
    pub restarts: u64,
    pub learned_clauses: u64,
    pub deleted_clauses: u64,
    pub reductions: u64,
    pub(crate) contradictions_since_last_reduction: u64,
}

/// Tuning knobs of the search. The defaults are the usual ones.
#[derive(Debug, Clone)]
pub struct Config {
    /// Variable activity decay factor, in (0, 1).
    pub var_decay: f64,

    /// Clause activity decay factor, in (0, 1).
    pub clause_decay: f64,

    /// Base number of conflicts between restarts; scaled by the Luby
    /// sequence.
    pub restart_interval: u64,

    /// After how many conflicts do we reduce the learned clause database.
    pub reduce_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            var_decay: 0.95,
            clause_decay: 0.999,
            restart_interval: 100,
            reduce_interval: 2000,
        }
    }
}

pub struct Solver {
    clause_db: ClauseDB,

    watches: LitVec<Vec<Watch>>,

    trail: Trail,

    // Where on the trail, should the unit propagation continue.
    unpropagated_lit_pos: usize,

    // The input cnf formula is trivially unsat.
    // This might be because an empty clause was added or contradictory unit clauses.
    trivially_unsat: bool,

    /// Activity-ordered decision candidates.
    vsids: Vsids,

    /// Conflict counting restart schedule.
    restarts: RestartSchedule,

    /// Various data, for analyzing conflicts. This field is mainly used in analyze.rs
    /// and reset for each new conflict analysis.
    analyze_state: AnalyzeState,

    /// Various stats that might be of interest
    stats: Stats,

    config: Config,
}

pub struct Model<'a> {
    assignment: &'a Trail,
}

impl<'a> Model<'a> {
    /// Get truth assignment of literal.
    pub fn lit(&self, l: i32) -> bool {
        self.assignment.is_lit_satisfied(Lit::new(l))
    }

    pub fn as_vec(&self) -> Vec<i32> {
        (1..=self.assignment.total_vars())
            .map(|i| {
                let i = i as i32;
                i * if self.assignment.is_lit_satisfied(Lit::new(i)) {
                    1
                } else {
                    -1
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for Model<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Model").field(&self.as_vec()).finish()
    }
}

#[derive(Debug)]
pub struct Proof;

#[derive(Debug)]
pub enum Result<'a> {
    Sat(Model<'a>),
    Unsat(Proof),
}

impl<'a> Result<'a> {
    pub fn is_sat(&self) -> bool {
        matches!(self, Result::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, Result::Unsat(_))
    }

    pub fn unwrap_sat(self) -> Model<'a> {
        match self {
            Result::Sat(model) => model,
            Result::Unsat(_) => panic!("Result is not SAT."),
        }
    }

    pub fn unwrap_unsat(self) -> Proof {
        match self {
            Result::Unsat(proof) => proof,
            Result::Sat(_) => panic!("Result is SAT."),
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        let mut clause_db = ClauseDB::default();
        clause_db.set_clause_decay(config.clause_decay);
        let mut vsids = Vsids::default();
        vsids.set_var_decay(config.var_decay);

        Self {
            clause_db,
            watches: LitVec::new(),
            trail: Trail::default(),
            unpropagated_lit_pos: 0,
            trivially_unsat: false,
            vsids,
            restarts: RestartSchedule::new(config.restart_interval),
            analyze_state: AnalyzeState::default(),
            stats: Stats::default(),
            config,
        }
    }

    pub fn from_dimacs(input: &str) -> std::result::Result<Solver, crate::dimacs::DimacsError> {
        Self::from_dimacs_with_config(input, Config::default())
    }

    pub fn from_dimacs_with_config(
        input: &str,
        config: Config,
    ) -> std::result::Result<Solver, crate::dimacs::DimacsError> {
        let dimacs = crate::dimacs::Dimacs::parse(input)?;

        let mut solver = Solver::with_config(config);
        // The header may declare more variables than the clauses mention;
        // they still belong to the model.
        if dimacs.num_vars > 0 {
            solver.expand(Var::new(dimacs.num_vars as i32));
        }
        for clause in dimacs.clauses {
            solver.add_clause(clause);
        }

        Ok(solver)
    }

    /// Remove duplicated literals
    /// Returns true if the clause is trivially satisfied (i.e. contains positive and negative literal of the same variable)
    fn normalise_clause(cls: &mut Vec<Lit>) -> bool {
        cls.sort_by_key(|lit| lit.code());
        cls.dedup();

        cls.windows(2).any(|w| w[0].var() == w[1].var())
    }

    pub fn add_clause<I>(&mut self, cls: I)
    where
        I: IntoIterator<Item = i32>,
    {
        let mut cls: Vec<Lit> = cls.into_iter().map(Lit::new).collect();

        if Self::normalise_clause(&mut cls) {
            return;
        };

        if let Some(max_var) = cls.iter().map(|l| l.var()).max() {
            self.expand(max_var);
        }

        match cls.len() {
            0 => {
                self.trivially_unsat = true;
            }
            1 => {
                if self.trail.is_lit_unsatisfied(cls[0]) {
                    self.trivially_unsat = true;
                } else if self.trail.is_lit_unassigned(cls[0]) {
                    self.trail.assign_lit(cls[0], TrailReason::Axiom);
                }
            }
            _ => {
                let cls_idx = self.clause_db.insert_clause(&cls, None);
                for &lit in &cls[0..2] {
                    self.watches[lit].push(Watch { clause: cls_idx });
                }
            }
        }
    }

    fn expand(&mut self, var: Var) {
        self.trail.expand(var);
        self.watches.expand(-Lit::from(var), Vec::new());
        self.vsids.expand(var);
    }

    pub fn num_vars(&self) -> usize {
        self.trail.total_vars()
    }

    pub fn num_clauses(&self) -> usize {
        self.clause_db.len()
    }

    fn all_vars_assigned(&self) -> bool {
        self.trail.assignment_complete()
    }

    fn extract_model(&self) -> Model {
        Model {
            assignment: &self.trail,
        }
    }

    /// Pick the next decision literal: the unassigned variable with the
    /// highest activity, in its saved phase. Variables popped from the heap
    /// that have been assigned in the meantime are skipped.
    fn decide(&mut self) -> Option<Lit> {
        while let Some(var) = self.vsids.pop() {
            if self.trail.is_lit_unassigned(Lit::from(var)) {
                return Some(self.vsids.decision_lit(var));
            }
        }
        None
    }

    /// Undo all assignments above `level` and resume propagation at the new
    /// end of the trail. Unassigned variables become decision candidates
    /// again and keep their phase; antecedents are unlocked.
    pub(crate) fn backjump(&mut self, level: u32) {
        let vsids = &mut self.vsids;
        let clause_db = &mut self.clause_db;

        self.unpropagated_lit_pos = self.trail.backtrack(level, |trail_elem| {
            if let TrailReason::Propagated { cls } = trail_elem.reason {
                debug_assert!(clause_db.is_reason(cls));
                clause_db.set_reason(cls, false);
            }
            vsids.save_phase(trail_elem.lit);
            vsids.insert(trail_elem.lit.var());
        });
    }

    fn restart(&mut self) {
        self.stats.restarts += 1;
        self.restarts.on_restart();
        if self.trail.current_decision_level() > 0 {
            self.backjump(0);
        }
        debug!("restarting search");
    }

    pub fn solve(&mut self) -> Result {
        if self.trivially_unsat {
            debug!("Problem is trivially unsat");
            return Result::Unsat(Proof);
        }

        loop {
            self.log_state();
            let result = self.propagate();

            if let PropagationResult::Contradiction(conflicting_clause) = result {
                self.stats.contradictions += 1;
                self.stats.contradictions_since_last_reduction += 1;
                self.restarts.on_conflict();

                if self.analyze_contradiction(conflicting_clause) == AnalyzeResult::Unsat {
                    debug!("Problem is Unsat");
                    return Result::Unsat(Proof);
                }

                self.vsids.decay();
                self.clause_db.decay_activities();
                self.maybe_reduce_learned_db();

                if self.restarts.should_restart() {
                    self.restart();
                }
            } else if self.all_vars_assigned() {
                // When all variables are assigned we have to have a satisfying assignment, otherwise the
                // propagation result would have been `Contradiction`
                let model = self.extract_model();
                debug!("Satisfying assignment found! {:?}", model.as_vec());
                assert!(
                    self.check_assignment(),
                    "Generated assignment doesn't satisfy the input formula"
                );
                return Result::Sat(self.extract_model());
            } else {
                match self.decide() {
                    Some(lit) => {
                        self.stats.decisions += 1;
                        debug!("new decision literal {lit}");
                        self.trail.assign_lit(lit, TrailReason::Decision)
                    }
                    None => {
                        unreachable!(
                            "Every unassigned variable is a decision candidate, but none was found \
                             even though the assignment is incomplete."
                        );
                    }
                }
            }
        }
    }

    /// check if the current assignment, satisfies the entire input formula.
    fn check_assignment(&self) -> bool {
        self.clause_db
            .iter()
            .all(|clause| self.trail.is_clause_satisfied(clause))
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Watch list membership must mirror the first two slots of every
    /// stored clause.
    #[cfg(test)]
    pub(crate) fn check_watchlists_consistent(&self) {
        use std::collections::HashMap;

        let mut watched: HashMap<(usize, Lit), usize> = HashMap::new();
        for i in 1..=self.trail.total_vars() {
            for lit in [Lit::new(i as i32), Lit::new(-(i as i32))] {
                for watch in &self.watches[lit] {
                    let cls = self.clause_db.get(watch.clause);
                    assert!(
                        cls[0] == lit || cls[1] == lit,
                        "clause {cls:?} is watched by {lit} but does not watch it"
                    );
                    *watched.entry((watch.clause.index(), lit)).or_default() += 1;
                }
            }
        }

        for (idx, cls) in self.clause_db.iter().enumerate() {
            for &lit in &cls[0..2] {
                assert_eq!(
                    watched.get(&(idx, lit)),
                    Some(&1),
                    "clause {cls:?} watches {lit} but is not in its watch list exactly once"
                );
            }
        }
        assert_eq!(watched.len(), 2 * self.clause_db.len());
    }

    /// Levels never decrease along the trail, every level is opened by its
    /// decision, and every propagated literal is implied by its antecedent
    /// at its position.
    #[cfg(test)]
    pub(crate) fn check_trail_invariants(&self) {
        let mut last_level = 0;
        for (pos, elem) in self.trail.trail().iter().enumerate() {
            let var = elem.lit.var();
            let level = self
                .trail
                .get_decision_level(var)
                .expect("trail literal must be assigned");
            assert_eq!(self.trail.get_trail_pos(var), Some(pos));
            assert!(level >= last_level, "levels may not decrease along the trail");

            match elem.reason {
                TrailReason::Decision => assert_eq!(level, last_level + 1),
                TrailReason::Axiom => assert_eq!(level, 0),
                TrailReason::Propagated { cls } => {
                    let clause = self.clause_db.get(cls);
                    assert!(clause.contains(&elem.lit));
                    for &other in clause {
                        if other == elem.lit {
                            continue;
                        }
                        assert!(self.trail.is_lit_unsatisfied(other));
                        let other_pos = self
                            .trail
                            .get_trail_pos(other.var())
                            .expect("antecedent literal must be assigned");
                        assert!(other_pos < pos, "antecedents must precede their implication");
                    }
                }
            }
            last_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagation_completes_the_model_after_one_decision() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2]);
        solver.add_clause([-1, 3]);
        solver.add_clause([-2, -3]);

        let result = solver.solve();
        assert_eq!(result.unwrap_sat().as_vec(), vec![1, -2, 3]);
    }

    #[test]
    fn trivially_unsat_empty_clause() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2]);
        solver.add_clause([]);

        assert!(solver.solve().is_unsat());
    }

    #[test]
    fn trivially_unsat_contradicting_units() {
        let mut solver = Solver::new();
        solver.add_clause([1]);
        solver.add_clause([-1]);

        assert!(solver.solve().is_unsat());
    }

    #[test]
    fn tautologies_are_dropped() {
        let mut solver = Solver::new();
        solver.add_clause([1, -1]);
        solver.add_clause([2, 2, -3]);

        assert_eq!(solver.num_clauses(), 1);
        assert!(solver.solve().is_sat());
    }

    #[test]
    fn empty_formula_is_sat() {
        let mut solver = Solver::new();
        let model = solver.solve().unwrap_sat();
        assert_eq!(model.as_vec(), Vec::<i32>::new());
    }

    #[test]
    fn level_zero_conflict_after_learning_is_unsat() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2]);
        solver.add_clause([1, -2]);
        solver.add_clause([-1, 3]);
        solver.add_clause([-1, -3]);

        assert!(solver.solve().is_unsat());
    }

    #[test]
    fn learned_clause_has_a_single_literal_of_the_conflict_level() {
        let mut solver = Solver::new();
        solver.add_clause([-4, 2]);
        solver.add_clause([-4, 3]);
        solver.add_clause([-2, -3, -1]);

        solver.trail.assign_lit(Lit::new(1), TrailReason::Decision);
        assert_eq!(solver.propagate(), PropagationResult::Done);
        solver.trail.assign_lit(Lit::new(4), TrailReason::Decision);

        let conflicting = match solver.propagate() {
            PropagationResult::Contradiction(cls) => cls,
            PropagationResult::Done => panic!("expected a contradiction"),
        };

        let learned_before = solver.clause_db.len();
        assert_eq!(
            solver.analyze_contradiction(conflicting),
            AnalyzeResult::Done
        );

        // The learned clause is (-4 -1): asserting literal first, backjump
        // below the conflict level, and the asserting literal is implied
        // by it right away.
        assert_eq!(solver.clause_db.len(), learned_before + 1);
        let learned = solver.clause_db.get(clause::ClauseIdx::new(learned_before as u32));
        assert_eq!(learned[0], Lit::new(-4));
        assert_eq!(learned[1], Lit::new(-1));

        assert_eq!(solver.trail.current_decision_level(), 1);
        assert!(solver.trail.is_lit_satisfied(Lit::new(-4)));
        assert!(matches!(
            solver.trail.get_reason(Var::new(4)),
            Some(TrailReason::Propagated { .. })
        ));
        solver.check_watchlists_consistent();
        solver.check_trail_invariants();
    }

    #[test]
    fn restarts_keep_the_verdict_on_both_outcomes() {
        let config = Config {
            restart_interval: 1,
            ..Config::default()
        };

        let mut unsat = Solver::with_config(config.clone());
        unsat.add_clause([1, 2]);
        unsat.add_clause([3, 4]);
        unsat.add_clause([5, 6]);
        for pair in [[-1, -3], [-1, -5], [-3, -5], [-2, -4], [-2, -6], [-4, -6]] {
            unsat.add_clause(pair);
        }
        assert!(unsat.solve().is_unsat());
        assert!(unsat.stats().restarts > 0);

        let mut sat = Solver::with_config(config);
        sat.add_clause([1, 2]);
        sat.add_clause([-1, 2, 3]);
        sat.add_clause([-3, -2, 1]);
        sat.add_clause([-2, -1]);
        let model = sat.solve().unwrap_sat().as_vec();
        let clauses: [&[i32]; 4] = [&[1, 2], &[-1, 2, 3], &[-3, -2, 1], &[-2, -1]];
        for cls in clauses {
            assert!(cls.iter().any(|&l| model.contains(&l)));
        }
    }
}
