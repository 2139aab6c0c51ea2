//! Three-valued circuit evaluation.
//!
//! A sweep walks signals in definition order, so every gate sees both of
//! its operands already computed. The rewrite engine reuses the same sweep
//! for constant propagation; the digest view on top of it is what the CLI
//! prints.

use std::collections::HashMap;
use std::fmt;

use cranelift_entity::SecondaryMap;
use nandgraph_core::{label, TriBit, Word32};

use crate::{
	error::Error,
	graph::{NandGraph, Signal, SignalKind},
};

/// Computes a value for every live signal. Leaves missing from `bindings`
/// evaluate to `X`.
pub fn sweep(graph: &NandGraph, bindings: &HashMap<String, TriBit>) -> SecondaryMap<Signal, TriBit> {
	let mut values: SecondaryMap<Signal, TriBit> = SecondaryMap::new();
	for &signal in graph.order() {
		values[signal] = match graph.kind(signal) {
			SignalKind::Const(value) => TriBit::from(value),
			SignalKind::Input | SignalKind::ExpandedConst => bindings
				.get(graph.name(signal))
				.copied()
				.unwrap_or(TriBit::Unknown),
			SignalKind::Gate { a, b } => values[a].nand(values[b]),
		};
	}
	values
}

/// Evaluates a complete circuit to its 256-bit digest.
pub fn evaluate(graph: &NandGraph, bindings: &HashMap<String, TriBit>) -> Result<Digest, Error> {
	graph.require_complete_outputs()?;
	let values = sweep(graph, bindings);
	let mut bits = [[TriBit::Unknown; 32]; 8];
	for ((w, b), target) in graph.outputs() {
		bits[w as usize][b as usize] = values[target];
	}
	Ok(Digest { bits })
}

/// The 256-bit result, word-major with bit 0 the LSB of each word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Digest {
	pub bits: [[TriBit; 32]; 8],
}

impl Digest {
	pub fn from_words(words: [Word32; 8]) -> Digest {
		let mut bits = [[TriBit::Unknown; 32]; 8];
		for (w, word) in words.iter().enumerate() {
			for b in 0..32 {
				bits[w][b as usize] = TriBit::from(word.bit(b));
			}
		}
		Digest { bits }
	}

	pub fn is_fully_known(&self) -> bool {
		self.bits.iter().flatten().all(|bit| bit.is_known())
	}

	pub fn is_fully_unknown(&self) -> bool {
		self.bits.iter().flatten().all(|bit| !bit.is_known())
	}
}

impl fmt::Display for Digest {
	/// Big-endian concatenation of the eight words, each MSB first. A
	/// nibble containing any unknown bit prints as `x`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for word in &self.bits {
			for nibble in 0..8 {
				let hi = 31 - nibble * 4;
				let mut value = 0u32;
				let mut known = true;
				for i in 0..4 {
					match word[hi - i].known() {
						Some(bit) => value |= u32::from(bit) << (3 - i),
						None => known = false,
					}
				}
				let c = if known {
					char::from_digit(value, 16).expect("nibble in range")
				} else {
					'x'
				};
				write!(f, "{c}")?;
			}
		}
		Ok(())
	}
}

/// Convenience used by tests and the verifier: bindings for a fully
/// concrete 16-word input block.
pub fn input_bindings(words: &[Word32; 16]) -> HashMap<String, TriBit> {
	let mut bindings = HashMap::with_capacity(16 * 32);
	for (i, word) in words.iter().enumerate() {
		for j in 0..32 {
			bindings.insert(
				label::bit_label(&label::input_word(i as u32), j),
				TriBit::from(word.bit(j)),
			);
		}
	}
	bindings
}
