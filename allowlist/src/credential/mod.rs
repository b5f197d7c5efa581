//! Per-participant credential components.
//!
//! This module holds the leaf components of the pipeline, in the order they
//! are applied to a participant address:
//!
//! - commitment construction ([`commitment::CommitmentBuilder`]),
//! - authority signing ([`signer::sign_commitment`]),
//! - access policy encoding ([`policy::encode_policy`]),
//! - sealing ([`sealer::CredentialSealer`]),
//!
//! plus the run-wide identity ([`identity::AuthContext`]) they share.

pub mod commitment;
pub mod error;
pub mod identity;
pub mod policy;
pub mod sealer;
pub mod signer;

pub use commitment::{CommitmentBuilder, ContractDomain};
pub use error::CredentialError;
pub use identity::{
    AuthContext, ChainClient, IdentityConfig, NetworkIdentity, NetworkInfo, NetworkTable,
    SiweMessage,
};
pub use policy::encode_policy;
pub use sealer::{CredentialSealer, KeyNetwork, KeyNetworkError, SaveKeyRequest, SymmetricKey};
pub use signer::{AuthoritySigner, SignerError, decompose_signature, sign_commitment};
