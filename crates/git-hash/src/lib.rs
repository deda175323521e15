//! Object identity for the git-height object store.
//!
//! This crate provides the 20-byte `ObjectId` type, hex encoding/decoding,
//! the pack index fan-out table and the OID-keyed
//! collections used by the height resolver.

mod error;
pub mod hex;
mod oid;
pub mod collections;
pub mod fanout;

pub use error::HashError;
pub use oid::ObjectId;
