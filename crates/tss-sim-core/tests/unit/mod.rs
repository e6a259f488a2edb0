//! Unit tests module
//!
//! This module contains unit tests for individual components:
//! - Mailboxes and routers
//! - Participant runtime

pub mod routing_test;
pub mod runtime_test;
