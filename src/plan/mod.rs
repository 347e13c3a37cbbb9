// Pipeline plan arithmetic
// Pure functions over validated stage lists; no I/O, no stored state.

pub mod calculator;
pub mod requirements;

pub use calculator::*;
pub use requirements::*;
