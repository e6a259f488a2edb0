//! # TSS Simulator Core
//!
//! Same-process simulated network for threshold ECDSA over secp256k1.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Party identities**: 1-based indices with a sort key defining the
//!   canonical participant order
//! - **Mailboxes and routers**: bounded per-participant queues with broadcast
//!   and directed delivery
//! - **Participant runtime**: drives one protocol engine to completion and
//!   persists its result
//! - **Orchestrator**: runs key generation and signing across all parties
//! - **Result store and verifier**: JSON result files and ECDSA verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tss_sim_core::{Orchestrator, SimulationConfig};
//!
//! let orchestrator = Orchestrator::new(SimulationConfig::default().with_output_dir("./out"))?;
//!
//! // 3 parties, any 2 can sign
//! orchestrator.generate(3, 1).await?;
//! orchestrator.sign(3, 1, "hello").await?;
//! assert!(orchestrator.verify("hello").await?);
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod keygen;
pub mod mpc;
pub mod orchestrator;
pub mod party;
pub mod sign;
pub mod storage;
pub mod verifier;

pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use keygen::{KeyShare, KeygenEngine};
pub use orchestrator::Orchestrator;
pub use party::{PartyId, PeerContext, SortKey, build_party_ids};
pub use sign::{SignatureData, SigningEngine, message_digest};
pub use storage::{OperationKind, ResultStore};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Mailbox and outbound queue capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = 2000;

/// File name prefix of key generation results
pub const KEYGEN_PREFIX: &str = "keygen-";

/// File name prefix of signing results
pub const SIGNATURE_PREFIX: &str = "sig-";
