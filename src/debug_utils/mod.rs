//! Utility functions and types for debugging pools.
//!
//! These are not needed for normal use, but are useful in tests and fuzzing
//! of both the pools themselves and code built on top of them.

mod display;
mod validate_alloc;
mod validate_sparse;

pub use display::*;
pub use validate_alloc::*;
pub use validate_sparse::*;
