//! NAND circuit construction and transformation.
//!
//! The pipeline is: a word model (built by [`sha256`] or parsed from
//! `functions.txt`) is lowered by [`synth`] into a [`graph::NandGraph`],
//! reduced to a fixed point by [`opt`], and evaluated under three-valued
//! logic by [`eval`]. [`verify`] closes the loop against a reference
//! SHA-256 implementation.

pub mod error;
pub mod eval;
pub mod graph;
pub mod message;
pub mod opt;
pub mod sha256;
pub mod stat;
pub mod synth;
pub mod verify;

pub use error::Error;
pub use graph::{NandGraph, Signal};
