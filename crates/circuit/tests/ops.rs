//! Differential tests of every word-operator decomposition: synthesize a
//! one-operation program, evaluate the NAND expansion under random fully
//! bound inputs, and compare against the 32-bit reference semantics.

use std::collections::HashMap;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use nandgraph_circuit::{eval, synth};
use nandgraph_core::{
	label,
	wordmodel::{WordOp, WordProgram},
	TriBit, Word32,
};

fn eval_op(op: WordOp, inputs: &[Word32]) -> Word32 {
	let mut program = WordProgram::new();
	program.push("RESULT", op).unwrap();
	let graph = synth::synthesize(&program).unwrap();

	let mut bindings = HashMap::new();
	for (i, word) in inputs.iter().enumerate() {
		for j in 0..32 {
			bindings.insert(
				label::bit_label(&label::input_word(i as u32), j),
				TriBit::from(word.bit(j)),
			);
		}
	}
	let values = eval::sweep(&graph, &bindings);

	let mut out = 0u32;
	for j in 0..32 {
		// Result bits may alias inputs or constants after rewiring ops, so
		// resolve through the synthesizer's word registry: the final bits
		// were registered under RESULT-B{j} only when they are fresh gates.
		let signal = graph
			.lookup(&format!("RESULT-B{j}"))
			.unwrap_or_else(|| panic!("RESULT-B{j} not defined"));
		match values[signal] {
			TriBit::One => out |= 1 << j,
			TriBit::Zero => {}
			TriBit::Unknown => panic!("bit {j} unknown under full binding"),
		}
	}
	Word32(out)
}

fn random_words(rng: &mut StdRng, n: usize) -> Vec<Word32> {
	(0..n).map(|_| Word32(rng.next_u32())).collect()
}

#[test]
fn nand_expansions_match_word_semantics() {
	let mut rng = StdRng::seed_from_u64(7);
	let w = |i: u32| label::input_word(i);

	for trial in 0..32 {
		let v = random_words(&mut rng, 3);
		let (x, y, z) = (v[0], v[1], v[2]);

		let cases: Vec<(WordOp, Word32)> = vec![
			(WordOp::Not { a: w(0) }, !x),
			(WordOp::And { a: w(0), b: w(1) }, x & y),
			(WordOp::Or { a: w(0), b: w(1) }, x | y),
			(WordOp::Xor { a: w(0), b: w(1) }, x ^ y),
			(WordOp::Add { a: w(0), b: w(1) }, x.wrapping_add(y)),
			(WordOp::Ch { e: w(0), f: w(1), g: w(2) }, Word32::ch(x, y, z)),
			(WordOp::Maj { a: w(0), b: w(1), c: w(2) }, Word32::maj(x, y, z)),
			(WordOp::BigSigma0 { a: w(0) }, x.big_sigma_0()),
			(WordOp::BigSigma1 { a: w(0) }, x.big_sigma_1()),
			(WordOp::SmallSigma0 { a: w(0) }, x.small_sigma_0()),
			(WordOp::SmallSigma1 { a: w(0) }, x.small_sigma_1()),
		];
		for (op, expect) in cases {
			let got = eval_op(op.clone(), &v);
			assert_eq!(got, expect, "trial {trial}, op {op:?}");
		}
	}
}

#[test]
fn adder_carries_ripple_across_all_bits() {
	// Directed cases that stress the carry chain end to end.
	let cases = [
		(0xffff_ffffu32, 1u32),
		(0xffff_ffff, 0xffff_ffff),
		(0x8000_0000, 0x8000_0000),
		(0x7fff_ffff, 1),
		(0, 0),
	];
	for (a, b) in cases {
		let got = eval_op(
			WordOp::Add {
				a: label::input_word(0),
				b: label::input_word(1),
			},
			&[Word32(a), Word32(b)],
		);
		assert_eq!(got, Word32(a.wrapping_add(b)), "{a:#x} + {b:#x}");
	}
}

#[test]
fn rewiring_ops_copy_bits_exactly() {
	let mut rng = StdRng::seed_from_u64(8);
	for _ in 0..8 {
		let x = Word32(rng.next_u32());
		for n in [1u32, 3, 7, 13, 31] {
			let mut program = WordProgram::new();
			program
				.push("ROT", WordOp::Rotr { n, a: label::input_word(0) })
				.unwrap();
			program
				.push(
					"RESULT",
					WordOp::Xor {
						a: "ROT".into(),
						b: label::input_word(1),
					},
				)
				.unwrap();
			// XOR against zero reads the rotation out through real gates.
			let got = eval_op2(&program, &[x, Word32::ZERO]);
			assert_eq!(got, x.rotr(n), "rotr {n}");
		}
	}
}

/// Like `eval_op` but for a prebuilt program ending in `RESULT`.
fn eval_op2(program: &WordProgram, inputs: &[Word32]) -> Word32 {
	let graph = synth::synthesize(program).unwrap();
	let mut bindings = HashMap::new();
	for (i, word) in inputs.iter().enumerate() {
		for j in 0..32 {
			bindings.insert(
				label::bit_label(&label::input_word(i as u32), j),
				TriBit::from(word.bit(j)),
			);
		}
	}
	let values = eval::sweep(&graph, &bindings);
	let mut out = 0u32;
	for j in 0..32 {
		let signal = graph.lookup(&format!("RESULT-B{j}")).unwrap();
		if values[signal] == TriBit::One {
			out |= 1 << j;
		}
	}
	Word32(out)
}
