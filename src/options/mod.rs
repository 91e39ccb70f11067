//! Option registry & driver (C2/C3).
//!
//! Generalizes `srt/src/options.rs`'s hard-coded nine-option apply into the
//! full static table spec.md's §4.2 demands, plus an `OptionSet` staging area
//! and the `apply_pre`/`apply_post` drivers.

mod registry;
mod set;

pub use registry::{OptionSpec, OptionType, Phase};
pub use set::OptionSet;
