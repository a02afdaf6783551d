//! Reference decryption oracle for the confidential advisor.
//!
//! An [`OracleNode`] couples a [`Coprocessor`] (the ciphertext store the
//! advisor encrypts results into) with a seed-derived [`SignerSet`] that
//! signs every plaintext it releases. Two transports sit on top:
//! [`LocalOracle`] queues requests until the host fulfils them, and
//! [`ChannelOracle`]/[`OracleWorker`] answer them on a tokio task.
//!
//! # Quickstart
//! ```
//! use std::sync::Arc;
//!
//! use advisor_core::{AdvisorConfig, ClientId, ConfidentialAdvisor, ConfidentialBackend, Subject};
//! use advisor_oracle::{LocalOracle, OracleConfig, OracleNode};
//!
//! let node = Arc::new(OracleNode::from_config(&OracleConfig::sample("doc-node")).unwrap());
//! let config = AdvisorConfig {
//!     oracle: node.trust_config(),
//!     ..AdvisorConfig::default()
//! };
//! let backend = node.coprocessor();
//! let mut advisor =
//!     ConfidentialAdvisor::new(&config, LocalOracle::new(Arc::clone(&node)), node.coprocessor())
//!         .unwrap();
//!
//! let [income, assets, risk, goals] =
//!     [150_000, 10_000, 10, 2].map(|v| backend.encrypt_u32(v).unwrap());
//! let profile = advisor.submit(income, assets, risk, goals, 0).unwrap();
//! advisor
//!     .request_decrypt(&ClientId::new("doc"), Subject::Profile(profile), 1)
//!     .unwrap();
//! let callback = advisor.oracle_mut().deliver_next().unwrap().unwrap();
//! advisor.on_callback(&callback, 2).unwrap();
//! assert_eq!(advisor.recommendation_count(), 1);
//! ```

pub mod channel;
pub mod config;
pub mod coprocessor;
pub mod error;
pub mod local;
pub mod node;
pub mod signer;

pub use channel::{channel, ChannelOracle, OracleJob, OracleWorker, WorkerStats};
pub use config::OracleConfig;
pub use coprocessor::Coprocessor;
pub use error::CoprocessorError;
pub use local::LocalOracle;
pub use node::OracleNode;
pub use signer::SignerSet;
