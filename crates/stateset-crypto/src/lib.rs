//! Cryptographic primitives for Stateset payment channels.
//!
//! Provides domain-separated BLAKE3 hashing and the [`Signer`]/[`Verifier`]
//! capability traits, with an Ed25519 implementation of both.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::DomainHasher;
pub use signer::{Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey};
