//! Integration tests module
//!
//! End-to-end flows through the orchestrator:
//! - Key generation, signing and verification
//! - Failure handling

pub mod failure_test;
pub mod full_flow_test;
