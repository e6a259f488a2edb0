//! Invariant tests module
//!
//! Guarantees that must hold for every completed operation.

pub mod result_invariant;
