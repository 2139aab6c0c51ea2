//! The SHA-256 compression function as a word program.
//!
//! This is the one-time generator for the word model: message schedule,
//! 64 rounds and the final feed-forward addition, expressed over the leaf
//! labels `INPUT-W*`, `K-*` and `H-INIT-*`. Round constants and the
//! initial state are not inlined; they stay symbolic so the rewrite engine
//! is the one to exploit their known values.

use std::collections::HashMap;

use nandgraph_core::{
	binding::WordBinding,
	label,
	wordmodel::{WordOp, WordProgram},
	Word32,
};

pub const K: [u32; 64] = [
	0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
	0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
	0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
	0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
	0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
	0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
	0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
	0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

pub const H_INIT: [u32; 8] = [
	0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Builds the full compression-function word program.
pub fn compression_program() -> WordProgram {
	let mut builder = Builder {
		program: WordProgram::new(),
	};

	// ---- message schedule ----
	// W[0..15] are the input words; for t in 16..64:
	//     W[t] = W[t-16] + σ0(W[t-15]) + W[t-7] + σ1(W[t-2])
	let mut w: Vec<String> = (0..16).map(label::input_word).collect();
	for t in 16..64 {
		let prefix = format!("W{t}");
		let s0 = builder.op(format!("{prefix}-s0"), WordOp::SmallSigma0 { a: w[t - 15].clone() });
		let s1 = builder.op(format!("{prefix}-s1"), WordOp::SmallSigma1 { a: w[t - 2].clone() });
		let p = builder.op(format!("{prefix}-A1"), WordOp::Add { a: w[t - 16].clone(), b: s0 });
		let q = builder.op(format!("{prefix}-A2"), WordOp::Add { a: p, b: w[t - 7].clone() });
		let r = builder.op(format!("{prefix}-A3"), WordOp::Add { a: q, b: s1 });
		w.push(builder.op(format!("MSG-W{t}"), WordOp::Copy { a: r }));
	}

	// ---- rounds ----
	let mut state: [String; 8] = std::array::from_fn(|i| label::init_hash(i as u32));
	for t in 0..64 {
		let [a, b, c, d, e, f, g, h] = state;
		let prefix = format!("R{t}");

		// T1 = h + Σ1(e) + Ch(e, f, g) + K[t] + W[t]
		let s1 = builder.op(format!("{prefix}-S1"), WordOp::BigSigma1 { a: e.clone() });
		let ch = builder.op(
			format!("{prefix}-CH"),
			WordOp::Ch {
				e: e.clone(),
				f: f.clone(),
				g: g.clone(),
			},
		);
		let t1a = builder.op(format!("{prefix}-T1A"), WordOp::Add { a: h, b: s1 });
		let t1b = builder.op(format!("{prefix}-T1B"), WordOp::Add { a: t1a, b: ch });
		let t1c = builder.op(
			format!("{prefix}-T1C"),
			WordOp::Add {
				a: t1b,
				b: label::round_const(t),
			},
		);
		let t1 = builder.op(
			format!("{prefix}-T1"),
			WordOp::Add {
				a: t1c,
				b: w[t as usize].clone(),
			},
		);

		// T2 = Σ0(a) + Maj(a, b, c)
		let s0 = builder.op(format!("{prefix}-S0"), WordOp::BigSigma0 { a: a.clone() });
		let maj = builder.op(
			format!("{prefix}-MAJ"),
			WordOp::Maj {
				a: a.clone(),
				b: b.clone(),
				c: c.clone(),
			},
		);
		let t2 = builder.op(format!("{prefix}-T2"), WordOp::Add { a: s0, b: maj });

		let e_new = builder.op(format!("{prefix}-E"), WordOp::Add { a: d, b: t1.clone() });
		let a_new = builder.op(format!("{prefix}-A"), WordOp::Add { a: t1, b: t2 });

		state = [a_new, a, b, c, e_new, e, f, g];
	}

	// ---- feed-forward and output binding ----
	for (i, var) in state.into_iter().enumerate() {
		let sum = builder.op(
			format!("FINAL-H{i}"),
			WordOp::Add {
				a: label::init_hash(i as u32),
				b: var,
			},
		);
		builder.op(label::output_word(i as u32), WordOp::Copy { a: sum });
	}

	builder.program
}

struct Builder {
	program: WordProgram,
}

impl Builder {
	fn op(&mut self, name: String, op: WordOp) -> String {
		self.program
			.push(name.clone(), op)
			.expect("generator emits unique labels over defined operands");
		name
	}
}

/// The `constants.txt` content: round constants then the initial state.
pub fn constant_bindings() -> Vec<WordBinding> {
	let mut out = Vec::with_capacity(K.len() + H_INIT.len());
	for (i, &k) in K.iter().enumerate() {
		out.push(WordBinding::new(label::round_const(i as u32), Word32(k)));
	}
	for (i, &h) in H_INIT.iter().enumerate() {
		out.push(WordBinding::new(label::init_hash(i as u32), Word32(h)));
	}
	out
}

/// Word-level bindings for one input block plus all constants, as consumed
/// by [`WordProgram::evaluate`].
pub fn word_bindings(block: &[Word32; 16]) -> HashMap<String, Word32> {
	let mut bindings = HashMap::with_capacity(16 + K.len() + H_INIT.len());
	for (i, &word) in block.iter().enumerate() {
		bindings.insert(label::input_word(i as u32), word);
	}
	for (i, &k) in K.iter().enumerate() {
		bindings.insert(label::round_const(i as u32), Word32(k));
	}
	for (i, &h) in H_INIT.iter().enumerate() {
		bindings.insert(label::init_hash(i as u32), Word32(h));
	}
	bindings
}

/// Reads the eight output words out of a word-evaluation result.
pub fn output_words(values: &HashMap<String, Word32>) -> Option<[Word32; 8]> {
	let mut out = [Word32::ZERO; 8];
	for (i, slot) in out.iter_mut().enumerate() {
		*slot = *values.get(&label::output_word(i as u32))?;
	}
	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::verify::reference_compress;

	#[test]
	fn word_model_matches_reference_compression() {
		let program = compression_program();
		let block: [Word32; 16] = std::array::from_fn(|i| Word32(0x0101_0101u32.wrapping_mul(i as u32 + 3)));
		let values = program.evaluate(&word_bindings(&block)).unwrap();
		let got = output_words(&values).unwrap();
		assert_eq!(got, reference_compress(&block));
	}

	#[test]
	fn program_round_trips_through_functions_txt() {
		let program = compression_program();
		let text = program.write();
		let reparsed = WordProgram::parse(&text).unwrap();

		let block: [Word32; 16] = std::array::from_fn(|i| Word32(0x9e37_79b9u32.wrapping_mul(i as u32 + 1)));
		let bindings = word_bindings(&block);
		let direct = output_words(&program.evaluate(&bindings).unwrap()).unwrap();
		let lowered = output_words(&reparsed.evaluate(&bindings).unwrap()).unwrap();
		assert_eq!(direct, lowered);
	}
}
