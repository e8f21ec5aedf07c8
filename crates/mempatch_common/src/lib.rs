//! Shared foundational types used across the mempatch workspace.
//!
//! This crate provides the packed LSB-first bit vector used for memory words
//! and feature rows.

#![warn(missing_docs)]

pub mod bits;

pub use bits::{BitVec, BitsParseError};
