//! VSIDS branching.
//!
//! Every variable carries an activity. Variables involved in conflict
//! analysis are bumped by `var_inc`; instead of decaying all activities
//! after a conflict, `var_inc` itself grows by `1 / var_decay`, which is
//! equivalent up to a shared scaling factor. Unassigned variables live in an
//! indexed binary max-heap; assignment removes them lazily (a popped
//! variable that is already assigned is simply skipped by the caller) and
//! backtracking reinserts them.

use super::{data::VarVec, Lit, Var};

/// Rescale all activities when one exceeds this value.
const ACTIVITY_LIMIT: f64 = 1e100;

pub(crate) struct Vsids {
    activity: VarVec<f64>,
    heap: Vec<Var>,
    position: VarVec<Option<u32>>,
    /// Last assigned polarity, used as the decision phase.
    phase: VarVec<bool>,
    var_inc: f64,
    var_decay: f64,
}

impl Default for Vsids {
    fn default() -> Self {
        Vsids {
            activity: VarVec::new(),
            heap: Vec::new(),
            position: VarVec::new(),
            phase: VarVec::new(),
            var_inc: 1.0,
            var_decay: 0.95,
        }
    }
}

impl Vsids {
    pub fn set_var_decay(&mut self, decay: f64) {
        assert!(0.0 < decay && decay < 1.0);
        self.var_decay = decay;
    }

    /// Make room for `var` and enqueue all new variables as decision
    /// candidates.
    pub fn expand(&mut self, var: Var) {
        let old_count = self.activity.len();
        self.activity.expand(var, 0.0);
        self.position.expand(var, None);
        self.phase.expand(var, true);

        for i in old_count + 1..=self.activity.len() {
            self.insert(Var::new(i as i32));
        }
    }

    pub fn bump(&mut self, var: Var) {
        self.activity[var] += self.var_inc;
        if self.activity[var] > ACTIVITY_LIMIT {
            self.rescale();
        }
        if let Some(pos) = self.position[var] {
            self.sift_up(pos as usize);
        }
    }

    pub fn decay(&mut self) {
        self.var_inc /= self.var_decay;
        if self.var_inc > ACTIVITY_LIMIT {
            self.rescale();
        }
    }

    fn rescale(&mut self) {
        let rescale = 1.0 / ACTIVITY_LIMIT;
        for activity in self.activity.iter_mut() {
            *activity *= rescale;
        }
        self.var_inc *= rescale;
    }

    pub fn save_phase(&mut self, lit: Lit) {
        self.phase[lit.var()] = lit.is_pos();
    }

    /// The decision literal for `var` under the saved phase.
    pub fn decision_lit(&self, var: Var) -> Lit {
        if self.phase[var] {
            Lit::from(var)
        } else {
            -Lit::from(var)
        }
    }

    /// Insert a variable into the heap if not already present.
    pub fn insert(&mut self, var: Var) {
        if self.position[var].is_none() {
            let pos = self.heap.len();
            self.position[var] = Some(pos as u32);
            self.heap.push(var);
            self.sift_up(pos);
        }
    }

    /// Remove and return the variable with the highest activity; ties break
    /// towards the lowest variable number.
    pub fn pop(&mut self) -> Option<Var> {
        if self.heap.is_empty() {
            return None;
        }
        let var = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            let top = self.heap[0];
            self.position[top] = Some(0);
            self.sift_down(0);
        }
        self.position[var] = None;
        Some(var)
    }

    fn outranks(&self, a: Var, b: Var) -> bool {
        self.activity[a] > self.activity[b] || (self.activity[a] == self.activity[b] && a < b)
    }

    fn sift_up(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        while pos > 0 {
            let parent_pos = (pos - 1) / 2;
            let parent = self.heap[parent_pos];
            if !self.outranks(var, parent) {
                break;
            }
            self.heap[pos] = parent;
            self.position[parent] = Some(pos as u32);
            pos = parent_pos;
        }
        self.heap[pos] = var;
        self.position[var] = Some(pos as u32);
    }

    fn sift_down(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            let mut best_pos = pos;
            let mut best = var;

            for child_pos in [pos * 2 + 1, pos * 2 + 2] {
                if let Some(&child) = self.heap.get(child_pos) {
                    if self.outranks(child, best) {
                        best_pos = child_pos;
                        best = child;
                    }
                }
            }

            if best_pos == pos {
                break;
            }
            self.heap[pos] = best;
            self.position[best] = Some(pos as u32);
            pos = best_pos;
        }
        self.heap[pos] = var;
        self.position[var] = Some(pos as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(i: i32) -> Var {
        Var::new(i)
    }

    #[test]
    fn pops_highest_activity_first() {
        let mut vsids = Vsids::default();
        vsids.expand(var(4));

        vsids.bump(var(3));
        vsids.bump(var(3));
        vsids.bump(var(2));

        assert_eq!(vsids.pop(), Some(var(3)));
        assert_eq!(vsids.pop(), Some(var(2)));
    }

    #[test]
    fn ties_break_towards_lowest_variable() {
        let mut vsids = Vsids::default();
        vsids.expand(var(4));

        let order: Vec<_> = std::iter::from_fn(|| vsids.pop()).collect();
        assert_eq!(order, vec![var(1), var(2), var(3), var(4)]);
        assert_eq!(vsids.pop(), None);
    }

    #[test]
    fn reinsert_after_pop() {
        let mut vsids = Vsids::default();
        vsids.expand(var(3));

        vsids.bump(var(2));
        assert_eq!(vsids.pop(), Some(var(2)));
        assert_eq!(vsids.pop(), Some(var(1)));

        vsids.insert(var(2));
        assert_eq!(vsids.pop(), Some(var(2)));
        assert_eq!(vsids.pop(), Some(var(3)));
        assert_eq!(vsids.pop(), None);
    }

    #[test]
    fn bump_reorders_heap_in_place() {
        let mut vsids = Vsids::default();
        vsids.expand(var(4));

        vsids.bump(var(4));
        vsids.bump(var(4));
        vsids.bump(var(3));

        assert_eq!(vsids.pop(), Some(var(4)));
        assert_eq!(vsids.pop(), Some(var(3)));
        assert_eq!(vsids.pop(), Some(var(1)));
        assert_eq!(vsids.pop(), Some(var(2)));
    }

    #[test]
    fn rescaling_preserves_order() {
        let mut vsids = Vsids::default();
        vsids.expand(var(3));

        // Drive var_inc towards the rescale limit.
        for _ in 0..5000 {
            vsids.decay();
        }
        vsids.bump(var(2));
        vsids.bump(var(1));
        vsids.bump(var(1));

        assert_eq!(vsids.pop(), Some(var(1)));
        assert_eq!(vsids.pop(), Some(var(2)));
        assert_eq!(vsids.pop(), Some(var(3)));
    }

    #[test]
    fn phase_saving() {
        let mut vsids = Vsids::default();
        vsids.expand(var(2));

        // Initial phase is positive.
        assert_eq!(vsids.decision_lit(var(1)), Lit::new(1));

        vsids.save_phase(Lit::new(-1));
        assert_eq!(vsids.decision_lit(var(1)), Lit::new(-1));
        assert_eq!(vsids.decision_lit(var(2)), Lit::new(2));
    }
}
