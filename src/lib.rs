//! A CDCL SAT solver.
//!
//! The solver decides satisfiability of CNF formulas with conflict-driven
//! clause learning: two-watched-literal unit propagation, 1UIP conflict
//! analysis with non-chronological backtracking, VSIDS branching with phase
//! saving, Luby restarts and periodic reduction of the learned clause
//! database.
//!
//! ```
//! use cindersat::Solver;
//!
//! let mut solver = Solver::from_dimacs("p cnf 2 2\n1 2 0\n-1 0\n").unwrap();
//! let model = solver.solve().unwrap_sat();
//! assert!(model.lit(2));
//! ```

mod dimacs;
mod solver;

pub use dimacs::{Dimacs, DimacsError};
pub use solver::{Config, Lit, Model, Proof, Result, Solver, Stats, Var};
