use std::cmp::Ordering;

use tracing::debug;

use super::{
    clause::{ClauseFlags, ClauseIdx, ClauseMeta},
    Solver,
};

impl Solver {
    pub(crate) fn maybe_reduce_learned_db(&mut self) {
        if self.stats.contradictions_since_last_reduction < self.config.reduce_interval {
            return;
        }
        self.stats.contradictions_since_last_reduction = 0;
        self.reduce_learned_db();
    }

    fn mark_garbage(&mut self) {
        let mut removal_candidates: Vec<&mut ClauseMeta> = self
            .clause_db
            .iter_meta_mut()
            .filter(|meta| meta.flags.contains(ClauseFlags::LEARNED))
            // Antecedents of trail literals must survive.
            .filter(|meta| !meta.flags.contains(ClauseFlags::REASON))
            // We always keep clauses with a glue of two.
            .filter(|meta| matches!(meta.glue, Some(glue) if glue.get() > 2))
            .collect();

        // Least useful clauses first: lowest activity, ties towards longer
        // clauses.
        removal_candidates.sort_by(|l, r| {
            l.activity
                .partial_cmp(&r.activity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| r.range.len().cmp(&l.range.len()))
        });

        let target = removal_candidates.len() / 2;
        for meta in removal_candidates.into_iter().take(target) {
            meta.flags.insert(ClauseFlags::GARBAGE);
        }
    }

    /// Halve the learned clause population. Marks the less useful half as
    /// garbage, compacts the clause database and rewrites all clause
    /// indices held outside of it (watches and trail antecedents) in one
    /// pass.
    pub(crate) fn reduce_learned_db(&mut self) {
        let learned_before = self.clause_db.num_learned();
        self.mark_garbage();

        let remap = self.clause_db.collect_garbage();

        for watches in self.watches.iter_mut() {
            watches.retain_mut(|watch| update_clause_index(&mut watch.clause, &remap));
        }

        self.trail.update_clause_indices(|cls_idx| {
            let live = update_clause_index(cls_idx, &remap);
            debug_assert!(live, "an antecedent clause was removed during reduction");
        });

        let deleted = learned_before - self.clause_db.num_learned();
        self.stats.deleted_clauses += deleted as u64;
        self.stats.reductions += 1;
        debug!(
            "reduced learned clause database, deleted {deleted} of {learned_before} clauses"
        );
    }
}

fn update_clause_index(clause_idx: &mut ClauseIdx, remap: &[u32]) -> bool {
    let new_idx = remap[clause_idx.index()];

    if new_idx == u32::MAX {
        false
    } else {
        *clause_idx = ClauseIdx::new(new_idx);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use crate::solver::{watch::Watch, Config, Lit, Solver};

    #[test]
    fn aggressive_reduction_keeps_the_verdict() {
        let mut solver = Solver::with_config(Config {
            reduce_interval: 1,
            ..Config::default()
        });
        // Three pigeons, two holes.
        solver.add_clause([1, 2]);
        solver.add_clause([3, 4]);
        solver.add_clause([5, 6]);
        for pair in [[-1, -3], [-1, -5], [-3, -5], [-2, -4], [-2, -6], [-4, -6]] {
            solver.add_clause(pair);
        }

        assert!(solver.solve().is_unsat());
    }

    #[test]
    fn reduction_rewrites_watches_consistently() {
        let mut solver = Solver::new();
        solver.add_clause([1, 2, 3]);
        solver.add_clause([-1, -2, -3]);

        for (i, raw) in [[-1, 2], [1, -3], [2, 3]].into_iter().enumerate() {
            let cls: Vec<Lit> = raw.iter().map(|&l| Lit::new(l)).collect();
            let idx = solver.clause_db.insert_clause(&cls, NonZeroU32::new(3));
            for &lit in &cls[0..2] {
                solver.watches[lit].push(Watch { clause: idx });
            }
            // Later clauses get higher activity.
            for _ in 0..i {
                solver.clause_db.bump_activity(idx);
            }
        }
        assert_eq!(solver.clause_db.num_learned(), 3);

        solver.reduce_learned_db();

        // Half of the candidates is gone, lowest activity first.
        assert_eq!(solver.clause_db.num_learned(), 2);
        assert_eq!(solver.clause_db.len(), 4);
        solver.check_watchlists_consistent();

        let stored: Vec<Vec<i32>> = solver
            .clause_db
            .iter()
            .map(|cls| cls.iter().map(|l| l.get()).collect())
            .collect();
        assert_eq!(
            stored,
            vec![vec![1, 2, 3], vec![-1, -2, -3], vec![1, -3], vec![2, 3]]
        );
    }
}
