/// Clauses are stored continuously in one arena.
/// Each stored clause has at least two literals and the first two literals
/// are the watched ones. A variable can only appear once in a clause.
use std::num::NonZeroU32;
use std::ops::Range;

use bitflags::bitflags;

use super::Lit;

bitflags! {
    pub(crate) struct ClauseFlags: u8 {
        /// Clause was derived by conflict analysis.
        const LEARNED = 0b001;
        /// Clause is the antecedent of a literal currently on the trail.
        const REASON  = 0b010;
        /// Clause is scheduled for removal by the next compaction.
        const GARBAGE = 0b100;
    }
}

/// Stable handle into the clause database. Handles of original clauses stay
/// valid for the lifetime of the solver; handles of learned clauses are
/// rewritten via the remap table of [`ClauseDB::collect_garbage`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub(crate) struct ClauseIdx(u32);

impl ClauseIdx {
    pub fn new(idx: u32) -> Self {
        ClauseIdx(idx)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) struct ClauseMeta {
    pub range: Range<u32>,
    pub flags: ClauseFlags,
    pub activity: f64,
    /// Number of distinct decision levels in the clause when it was learned.
    pub glue: Option<NonZeroU32>,
}

pub(crate) struct ClauseDB {
    arena: Vec<Lit>,
    meta: Vec<ClauseMeta>,
    num_learned: usize,
    cla_inc: f64,
    clause_decay: f64,
}

/// Rescale clause activities before they overflow.
const CLAUSE_ACTIVITY_LIMIT: f64 = 1e20;

impl Default for ClauseDB {
    fn default() -> Self {
        ClauseDB {
            arena: Vec::new(),
            meta: Vec::new(),
            num_learned: 0,
            cla_inc: 1.0,
            clause_decay: 0.999,
        }
    }
}

impl ClauseDB {
    pub fn set_clause_decay(&mut self, decay: f64) {
        assert!(0.0 < decay && decay < 1.0);
        self.clause_decay = decay;
    }

    /// Insert a clause of size >= 2. `glue` is present for learned clauses
    /// and absent for original ones.
    pub fn insert_clause(&mut self, cls: &[Lit], glue: Option<NonZeroU32>) -> ClauseIdx {
        debug_assert!(cls.len() >= 2, "unit and empty clauses are not stored");

        let start = self.arena.len();
        self.arena.extend_from_slice(cls);
        let end = self.arena.len();

        debug_assert!(end <= u32::MAX as usize);

        let flags = if glue.is_some() {
            self.num_learned += 1;
            ClauseFlags::LEARNED
        } else {
            ClauseFlags::empty()
        };

        self.meta.push(ClauseMeta {
            range: start as u32..end as u32,
            flags,
            activity: 0.0,
            glue,
        });

        ClauseIdx((self.meta.len() - 1) as u32)
    }

    pub fn get(&self, idx: ClauseIdx) -> &[Lit] {
        let range = &self.meta[idx.index()].range;
        &self.arena[range.start as usize..range.end as usize]
    }

    pub fn get_mut(&mut self, idx: ClauseIdx) -> &mut [Lit] {
        let range = &self.meta[idx.index()].range;
        &mut self.arena[range.start as usize..range.end as usize]
    }

    pub fn is_reason(&self, idx: ClauseIdx) -> bool {
        self.meta[idx.index()].flags.contains(ClauseFlags::REASON)
    }

    pub fn set_reason(&mut self, idx: ClauseIdx, is_reason: bool) {
        self.meta[idx.index()]
            .flags
            .set(ClauseFlags::REASON, is_reason);
    }

    pub fn bump_activity(&mut self, idx: ClauseIdx) {
        let meta = &mut self.meta[idx.index()];
        if !meta.flags.contains(ClauseFlags::LEARNED) {
            return;
        }
        meta.activity += self.cla_inc;
        if meta.activity > CLAUSE_ACTIVITY_LIMIT {
            let rescale = 1.0 / CLAUSE_ACTIVITY_LIMIT;
            for meta in &mut self.meta {
                meta.activity *= rescale;
            }
            self.cla_inc *= rescale;
        }
    }

    pub fn decay_activities(&mut self) {
        self.cla_inc /= self.clause_decay;
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn num_learned(&self) -> usize {
        self.num_learned
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Lit]> + '_ {
        self.meta.iter().map(move |meta| {
            &self.arena[meta.range.start as usize..meta.range.end as usize]
        })
    }

    pub fn iter_meta_mut(&mut self) -> impl Iterator<Item = &mut ClauseMeta> + '_ {
        self.meta.iter_mut()
    }

    /// Remove all clauses marked GARBAGE, compacting the arena. Returns a
    /// remap table from old clause index to new one; removed clauses map to
    /// `u32::MAX`. Original clauses are never marked and therefore keep
    /// their indices (they precede all learned clauses in the database).
    pub fn collect_garbage(&mut self) -> Vec<u32> {
        let mut remap = vec![u32::MAX; self.meta.len()];
        let mut new_arena = Vec::with_capacity(self.arena.len());
        let mut new_meta = Vec::with_capacity(self.meta.len());

        for (old_idx, meta) in self.meta.drain(..).enumerate() {
            if meta.flags.contains(ClauseFlags::GARBAGE) {
                debug_assert!(meta.flags.contains(ClauseFlags::LEARNED));
                debug_assert!(!meta.flags.contains(ClauseFlags::REASON));
                self.num_learned -= 1;
                continue;
            }

            let start = new_arena.len() as u32;
            new_arena
                .extend_from_slice(&self.arena[meta.range.start as usize..meta.range.end as usize]);
            let end = new_arena.len() as u32;

            remap[old_idx] = new_meta.len() as u32;
            new_meta.push(ClauseMeta {
                range: start..end,
                ..meta
            });
        }

        self.arena = new_arena;
        self.meta = new_meta;

        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cls(lits: &[i32]) -> Vec<Lit> {
        lits.iter().map(|&l| Lit::new(l)).collect()
    }

    #[test]
    fn insert_and_get() {
        let mut db = ClauseDB::default();
        let a = db.insert_clause(&cls(&[1, -2]), None);
        let b = db.insert_clause(&cls(&[2, 3, -4]), NonZeroU32::new(2));

        assert_eq!(db.get(a), &cls(&[1, -2])[..]);
        assert_eq!(db.get(b), &cls(&[2, 3, -4])[..]);
        assert_eq!(db.len(), 2);
        assert_eq!(db.num_learned(), 1);
    }

    #[test]
    fn reason_flag() {
        let mut db = ClauseDB::default();
        let a = db.insert_clause(&cls(&[1, 2]), None);
        assert!(!db.is_reason(a));
        db.set_reason(a, true);
        assert!(db.is_reason(a));
        db.set_reason(a, false);
        assert!(!db.is_reason(a));
    }

    #[test]
    fn collect_garbage_remaps_survivors() {
        let mut db = ClauseDB::default();
        let orig = db.insert_clause(&cls(&[1, 2]), None);
        let l0 = db.insert_clause(&cls(&[3, 4]), NonZeroU32::new(2));
        let l1 = db.insert_clause(&cls(&[-1, -3]), NonZeroU32::new(2));
        let l2 = db.insert_clause(&cls(&[2, -4]), NonZeroU32::new(2));

        db.iter_meta_mut().nth(l1.index()).unwrap().flags |= ClauseFlags::GARBAGE;

        let remap = db.collect_garbage();

        assert_eq!(remap[orig.index()], 0);
        assert_eq!(remap[l0.index()], 1);
        assert_eq!(remap[l1.index()], u32::MAX);
        assert_eq!(remap[l2.index()], 2);

        assert_eq!(db.len(), 3);
        assert_eq!(db.num_learned(), 2);
        assert_eq!(db.get(ClauseIdx::new(0)), &cls(&[1, 2])[..]);
        assert_eq!(db.get(ClauseIdx::new(1)), &cls(&[3, 4])[..]);
        assert_eq!(db.get(ClauseIdx::new(2)), &cls(&[2, -4])[..]);
    }
}
