//! An internal crate containing the bit, byte and 2D buffer primitives reused across the
//! different crates in the rawdec project.
//!
//! This crate is not meant for external consumption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod array2d;
pub mod bit;
pub mod byte;
