use super::Lit;

/// Wrapper over Vec which is indexed by [`Lit`]
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct LitVec<T>(Vec<T>);

impl<T> LitVec<T> {
    pub fn new() -> Self {
        Self(Default::default())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.0.iter_mut()
    }
}

impl<T: Clone> LitVec<T> {
    /// Resize so that `l` is a valid index.
    pub fn expand(&mut self, l: Lit, val: T) {
        let len = lit_to_idx(l) + 1;

        if len > self.0.len() {
            self.0.resize(len, val)
        }
    }
}

impl<T> Default for LitVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Positive and negative literal of a variable are placed next to each other.
// We subtract two, because there are no literals for variable 0.
fn lit_to_idx(lit: Lit) -> usize {
    lit.code() as usize - 2
}

impl<T> std::ops::Index<Lit> for LitVec<T> {
    type Output = T;

    fn index(&self, index: Lit) -> &Self::Output {
        &self.0[lit_to_idx(index)]
    }
}

impl<T> std::ops::IndexMut<Lit> for LitVec<T> {
    fn index_mut(&mut self, index: Lit) -> &mut Self::Output {
        &mut self.0[lit_to_idx(index)]
    }
}
