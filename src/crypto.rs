//! Cryptographic capabilities: randomness, PKCE derivation, and authenticated encryption.

pub mod aead;
pub mod pkce;
pub mod random;

pub use aead::*;
pub use pkce::*;
pub use random::*;
