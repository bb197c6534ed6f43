//! # Cryptographic Primitives
//!
//! The pool only needs hashing: deterministic deposit addresses and
//! content-derived table keys. Everything here is a thin wrapper around the
//! `sha2` and `blake3` crates.

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, sha256_array, sha256_multi};
