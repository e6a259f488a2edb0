//! Fuzz tests module
//!
//! Property-based tests for identities, routing and digest preprocessing.

pub mod digest_fuzz;
pub mod identity_fuzz;
