//! Randomized differential verification against a reference SHA-256.
//!
//! The property checked is a property of the circuit, not of padding:
//! arbitrary 16-word blocks are drawn from a seeded generator, pushed
//! through the DAG under fully bound inputs, and compared against the
//! reference compression function bit for bit.

use log::debug;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use sha2::compress256;
use sha2::digest::generic_array::GenericArray;

use nandgraph_core::{binding, Word32};

use crate::{
	error::Error,
	eval::{self, Digest},
	graph::NandGraph,
	sha256,
};

/// The reference compression function over one block, starting from the
/// standard initial state and including the feed-forward addition.
pub fn reference_compress(block: &[Word32; 16]) -> [Word32; 8] {
	let mut state = sha256::H_INIT;
	let mut bytes = [0u8; 64];
	for (i, word) in block.iter().enumerate() {
		bytes[i * 4..i * 4 + 4].copy_from_slice(&word.0.to_be_bytes());
	}
	let block_bytes: GenericArray<u8, _> = GenericArray::clone_from_slice(&bytes);
	compress256(&mut state, &[block_bytes]);
	state.map(Word32)
}

/// Runs `trials` random blocks through the circuit and the reference and
/// fails on the first disagreement.
pub fn verify(graph: &NandGraph, trials: u64, seed: u64) -> Result<(), Error> {
	graph.require_complete_outputs()?;
	let constants = binding::binding_map(&binding::expand_words(&sha256::constant_bindings(), true));
	let mut rng = StdRng::seed_from_u64(seed);

	for trial in 0..trials {
		let block: [Word32; 16] = std::array::from_fn(|_| Word32(rng.next_u32()));
		let mut bindings = constants.clone();
		bindings.extend(eval::input_bindings(&block));

		let circuit = eval::evaluate(graph, &bindings)?;
		let reference = Digest::from_words(reference_compress(&block));
		if circuit != reference {
			return Err(Error::DigestMismatch {
				trial,
				circuit: circuit.to_string(),
				reference: reference.to_string(),
			});
		}
		debug!("trial {trial}: digest {circuit}");
	}
	Ok(())
}
