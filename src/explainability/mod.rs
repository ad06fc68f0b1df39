//! Local explainability
//!
//! Decomposes a single prediction into additive per-feature contributions
//! against a caller-supplied reference background, using sampled
//! permutations rather than exhaustive subset enumeration.

mod shapley;

pub use shapley::{Attribution, Explanation, ShapleyExplainer};
