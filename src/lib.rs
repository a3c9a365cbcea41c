//! Parsing, serialization, protection and structural validation of
//! OpenPGP transferable keys (RFC 4880 §11.1/§11.2).
//!
//! The crate is organized bottom-up: [`packet`] holds the wire-level
//! codecs, [`composed`] the transferable key model with its merge
//! algebra, stream parser and self-signature generator, and [`key`]
//! the derived key facade (key id, fingerprint, grip, validity) that
//! external keyrings build on.

#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::correctness,
    clippy::unwrap_used,
    rust_2018_idioms
)]
#![allow(clippy::missing_const_for_fn, clippy::use_self, clippy::type_complexity)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
pub mod errors;
pub mod armor;
pub mod composed;
pub mod crypto;
pub mod key;
pub mod packet;
pub mod parsing_reader;
pub mod ser;
pub mod types;
pub mod util;

// reexports for easier use
pub use self::composed::{
    bind_subkey, certify_userid, parse_keys, parse_subkey, write_keys, BindingOptions,
    CertificationOptions, ParsedKeys, TransferableKey, TransferableSubkey, TransferableUserId,
    UserPreferences, Warning,
};
pub use self::key::{Key, KeySearch, KeyStore};
pub use self::packet::Signature;

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
