//! Key derivation, address encoding and password-gated secret storage for a
//! blockchain wallet command line.
//!
//! - [`keys`]: key pairs, addresses and mnemonic backups. Pure.
//! - [`secret_store`]: namespaced persistence on the native secret service
//!   with a file fallback.
//! - [`session`]: master password, encryption of stored secrets, session
//!   timeout and audit log.
//! - [`wallet`]: the operations commands call.

// lets unit tests share the integration test fixtures
#[cfg(test)]
extern crate self as wallet_core;

pub mod config_models;
pub mod error;
pub mod keys;
pub mod secret_store;
pub mod session;
pub mod wallet;

pub use error::Result;
pub use error::WalletError;
