//! Configuration fingerprints
//!
//! A fingerprint is a SHA-256 digest over a canonical, length-prefixed
//! encoding of configuration. It is the key of the compilation cache, the
//! processor registry and (over bound parameters) the result cache.
//!
//! # Invariants
//!
//! - Identical configuration produces identical fingerprints
//! - Fingerprints never depend on timestamps, connection state or call order
//! - Cosmetic settings (descriptions, timeouts) are not hashed

mod command;
mod hasher;
mod parameters;

pub use command::{CommandDefinition, CommandKind, NullMode};
pub use hasher::{Fingerprint, FingerprintBuilder};
pub use parameters::ParameterSet;
