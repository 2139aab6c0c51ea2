//! Word-model to NAND-DAG synthesis.
//!
//! Every word operation expands to 32 bit-level definitions using a fixed
//! per-operator decomposition. All emission goes through a commutative CSE
//! table, so a structurally duplicate NAND is never emitted twice. `ROTR`,
//! `SHR` and `COPY` are pure rewirings and carry no gates.

use std::collections::HashMap;

use nandgraph_core::{
	label::{self, WordClass},
	wordmodel::{WordFn, WordOp, WordProgram},
	Error as FormatError,
};

use crate::{
	error::Error,
	graph::{NandGraph, Signal},
};

/// Lowers a validated word program into a NAND DAG.
///
/// Word operations labeled `OUTPUT-Wi` bind the circuit outputs; a program
/// must bind either none or all eight of them.
pub fn synthesize(program: &WordProgram) -> Result<NandGraph, Error> {
	let mut synth = Synth {
		graph: NandGraph::new(),
		cse: HashMap::new(),
		words: HashMap::new(),
		tmp: 0,
	};
	for WordFn { label, op } in program.fns() {
		synth.convert(label, op)?;
	}

	let bound = synth.graph.outputs().count();
	if bound > 0 && bound != 8 * 32 {
		return Err(Error::IncompleteOutputs {
			found: bound / 32,
			expected: 8,
		});
	}
	synth.graph.validate()?;
	Ok(synth.graph)
}

struct Synth {
	graph: NandGraph,
	cse: HashMap<(Signal, Signal), Signal>,
	/// Bit signals of every word-level label seen so far, LSB first.
	words: HashMap<String, [Signal; 32]>,
	tmp: usize,
}

impl Synth {
	fn word_bits(&mut self, word: &str) -> Result<[Signal; 32], Error> {
		if let Some(bits) = self.words.get(word) {
			return Ok(*bits);
		}
		match label::classify_word(word) {
			WordClass::Input { .. } | WordClass::RoundConst { .. } | WordClass::InitHash { .. } => {
				let mut bits = [self.graph.const0(); 32];
				for (j, bit) in bits.iter_mut().enumerate() {
					*bit = self.graph.ensure_leaf(&label::bit_label(word, j as u32))?;
				}
				self.words.insert(word.to_string(), bits);
				Ok(bits)
			}
			_ => Err(FormatError::UndefinedReference {
				line: 0,
				label: word.to_string(),
			}
			.into()),
		}
	}

	/// Emits `NAND(a, b)` under a fresh temporary label, or returns the
	/// interned equivalent.
	fn nand(&mut self, prefix: &str, a: Signal, b: Signal) -> Result<Signal, Error> {
		let key = NandGraph::canonical(a, b);
		if let Some(&existing) = self.cse.get(&key) {
			return Ok(existing);
		}
		self.tmp += 1;
		let name = format!("{prefix}-T{}", self.tmp);
		let gate = self.graph.add_gate(&name, a, b)?;
		self.cse.insert(key, gate);
		Ok(gate)
	}

	/// Emits `NAND(a, b)` under a caller-chosen label; used for the final
	/// gate of each bit so serialized circuits stay readable. A CSE hit
	/// returns the existing gate and the label is simply not used.
	fn named_nand(&mut self, name: &str, a: Signal, b: Signal) -> Result<Signal, Error> {
		let key = NandGraph::canonical(a, b);
		if let Some(&existing) = self.cse.get(&key) {
			return Ok(existing);
		}
		let gate = self.graph.add_gate(name, a, b)?;
		self.cse.insert(key, gate);
		Ok(gate)
	}

	fn not(&mut self, prefix: &str, a: Signal) -> Result<Signal, Error> {
		self.nand(prefix, a, a)
	}

	/// `XOR(a, b)` in four gates, the last one named.
	fn xor_bit(&mut self, name: &str, prefix: &str, a: Signal, b: Signal) -> Result<Signal, Error> {
		let nab = self.nand(prefix, a, b)?;
		let t1 = self.nand(prefix, a, nab)?;
		let t2 = self.nand(prefix, b, nab)?;
		self.named_nand(name, t1, t2)
	}

	/// One bit of the shared 13-NAND full adder. Returns `(sum, cout)`;
	/// the sum gate carries `name`.
	fn full_adder(
		&mut self,
		name: &str,
		prefix: &str,
		a: Signal,
		b: Signal,
		cin: Signal,
	) -> Result<(Signal, Signal), Error> {
		// a ⊕ b, sharing NAND(a, b) with the carry path.
		let nand_ab = self.nand(prefix, a, b)?;
		let t1 = self.nand(prefix, a, nand_ab)?;
		let t2 = self.nand(prefix, b, nand_ab)?;
		let xor_ab = self.nand(prefix, t1, t2)?;

		// sum = (a ⊕ b) ⊕ cin, sharing NAND(xor_ab, cin) likewise.
		let nand_xc = self.nand(prefix, xor_ab, cin)?;
		let t3 = self.nand(prefix, xor_ab, nand_xc)?;
		let t4 = self.nand(prefix, cin, nand_xc)?;
		let sum = self.named_nand(name, t3, t4)?;

		// cout = (a ∧ b) ∨ (cin ∧ (a ⊕ b)).
		let and_ab = self.nand(prefix, nand_ab, nand_ab)?;
		let and_cin = self.nand(prefix, nand_xc, nand_xc)?;
		let t5 = self.nand(prefix, and_ab, and_ab)?;
		let t6 = self.nand(prefix, and_cin, and_cin)?;
		let cout = self.nand(prefix, t5, t6)?;

		Ok((sum, cout))
	}

	fn convert(&mut self, out: &str, op: &WordOp) -> Result<(), Error> {
		use WordOp::*;
		let bits: [Signal; 32] = match op {
			Copy { a } => self.word_bits(a)?,
			Not { a } => {
				let a = self.word_bits(a)?;
				self.each_bit(out, |s, name, _, i| s.named_nand(name, a[i], a[i]))?
			}
			And { a, b } => {
				let (a, b) = (self.word_bits(a)?, self.word_bits(b)?);
				self.each_bit(out, |s, name, prefix, i| {
					let t = s.nand(prefix, a[i], b[i])?;
					s.named_nand(name, t, t)
				})?
			}
			Or { a, b } => {
				let (a, b) = (self.word_bits(a)?, self.word_bits(b)?);
				self.each_bit(out, |s, name, prefix, i| {
					let na = s.not(prefix, a[i])?;
					let nb = s.not(prefix, b[i])?;
					s.named_nand(name, na, nb)
				})?
			}
			Xor { a, b } => {
				let (a, b) = (self.word_bits(a)?, self.word_bits(b)?);
				self.each_bit(out, |s, name, prefix, i| s.xor_bit(name, prefix, a[i], b[i]))?
			}
			Add { a, b } => {
				let (a, b) = (self.word_bits(a)?, self.word_bits(b)?);
				let mut carry = self.graph.const0();
				let mut bits = [self.graph.const0(); 32];
				for i in 0..32 {
					let name = label::bit_label(out, i as u32);
					let (sum, cout) = self.full_adder(&name, &name, a[i], b[i], carry)?;
					bits[i] = sum;
					carry = cout;
				}
				bits
			}
			Rotr { n, a } => {
				let a = self.word_bits(a)?;
				std::array::from_fn(|i| a[(i + *n as usize) % 32])
			}
			Shr { n, a } => {
				let a = self.word_bits(a)?;
				let const0 = self.graph.const0();
				std::array::from_fn(|i| {
					let src = i + *n as usize;
					if src < 32 { a[src] } else { const0 }
				})
			}
			Ch { e, f, g } => {
				let (e, f, g) = (self.word_bits(e)?, self.word_bits(f)?, self.word_bits(g)?);
				// 2:1 mux on e, four gates.
				self.each_bit(out, |s, name, prefix, i| {
					let ef = s.nand(prefix, e[i], f[i])?;
					let not_e = s.not(prefix, e[i])?;
					let ng = s.nand(prefix, not_e, g[i])?;
					s.named_nand(name, ef, ng)
				})?
			}
			Maj { a, b, c } => {
				let (a, b, c) = (self.word_bits(a)?, self.word_bits(b)?, self.word_bits(c)?);
				// OR form, six gates: (a∧b) ∨ (a∧c) ∨ (b∧c).
				self.each_bit(out, |s, name, prefix, i| {
					let ab = s.nand(prefix, a[i], b[i])?;
					let ac = s.nand(prefix, a[i], c[i])?;
					let x = s.nand(prefix, ab, ac)?;
					let not_x = s.not(prefix, x)?;
					let bc = s.nand(prefix, b[i], c[i])?;
					s.named_nand(name, not_x, bc)
				})?
			}
			BigSigma0 { a } => self.sigma(out, a, [Term::Rot(2), Term::Rot(13), Term::Rot(22)])?,
			BigSigma1 { a } => self.sigma(out, a, [Term::Rot(6), Term::Rot(11), Term::Rot(25)])?,
			SmallSigma0 { a } => self.sigma(out, a, [Term::Rot(7), Term::Rot(18), Term::Sh(3)])?,
			SmallSigma1 { a } => self.sigma(out, a, [Term::Rot(17), Term::Rot(19), Term::Sh(10)])?,
		};

		self.words.insert(out.to_string(), bits);
		if let WordClass::Output { word } = label::classify_word(out) {
			for (j, &bit) in bits.iter().enumerate() {
				self.graph.set_output(word, j as u32, bit);
			}
		}
		Ok(())
	}

	/// Runs `emit` for each of the 32 output bits, passing the bit's final
	/// label and a temp prefix.
	fn each_bit(
		&mut self,
		out: &str,
		mut emit: impl FnMut(&mut Self, &str, &str, usize) -> Result<Signal, Error>,
	) -> Result<[Signal; 32], Error> {
		let mut bits = [self.graph.const0(); 32];
		for (i, bit) in bits.iter_mut().enumerate() {
			let name = label::bit_label(out, i as u32);
			*bit = emit(self, &name, &name, i)?;
		}
		Ok(bits)
	}

	/// XOR of three rotation/shift images of `a`: the rewirings are free,
	/// the two XORs cost eight gates per bit.
	fn sigma(&mut self, out: &str, a: &str, terms: [Term; 3]) -> Result<[Signal; 32], Error> {
		let a = self.word_bits(a)?;
		let const0 = self.graph.const0();
		let term_bits: Vec<[Signal; 32]> = terms
			.iter()
			.map(|term| match *term {
				Term::Rot(n) => std::array::from_fn(|i| a[(i + n as usize) % 32]),
				Term::Sh(n) => std::array::from_fn(|i| {
					let src = i + n as usize;
					if src < 32 { a[src] } else { const0 }
				}),
			})
			.collect();
		self.each_bit(out, |s, name, prefix, i| {
			let x1 = s.xor_bit(&format!("{prefix}-X1"), prefix, term_bits[0][i], term_bits[1][i])?;
			s.xor_bit(name, prefix, x1, term_bits[2][i])
		})
	}
}

#[derive(Copy, Clone)]
enum Term {
	Rot(u32),
	Sh(u32),
}

#[cfg(test)]
mod tests {
	use nandgraph_core::wordmodel::{WordOp, WordProgram};

	use super::synthesize;

	fn program_of(label: &str, op: WordOp) -> WordProgram {
		let mut program = WordProgram::new();
		program.push(label, op).unwrap();
		program
	}

	#[test]
	fn gate_counts_match_decompositions() {
		let cases = [
			(WordOp::Not { a: "INPUT-W0".into() }, 32),
			(WordOp::And { a: "INPUT-W0".into(), b: "INPUT-W1".into() }, 2 * 32),
			(WordOp::Or { a: "INPUT-W0".into(), b: "INPUT-W1".into() }, 3 * 32),
			(WordOp::Xor { a: "INPUT-W0".into(), b: "INPUT-W1".into() }, 4 * 32),
			(
				WordOp::Ch {
					e: "INPUT-W0".into(),
					f: "INPUT-W1".into(),
					g: "INPUT-W2".into(),
				},
				4 * 32,
			),
			(
				WordOp::Maj {
					a: "INPUT-W0".into(),
					b: "INPUT-W1".into(),
					c: "INPUT-W2".into(),
				},
				6 * 32,
			),
			(WordOp::Rotr { n: 7, a: "INPUT-W0".into() }, 0),
			(WordOp::Shr { n: 3, a: "INPUT-W0".into() }, 0),
			(WordOp::Copy { a: "INPUT-W0".into() }, 0),
			(WordOp::BigSigma0 { a: "INPUT-W0".into() }, 8 * 32),
		];
		for (op, expect) in cases {
			let graph = synthesize(&program_of("T", op.clone())).unwrap();
			assert_eq!(graph.n_gates(), expect, "{op:?}");
		}
	}

	#[test]
	fn adder_is_exactly_13_nands_per_bit() {
		let program = program_of(
			"T",
			WordOp::Add {
				a: "INPUT-W0".into(),
				b: "INPUT-W1".into(),
			},
		);
		let graph = synthesize(&program).unwrap();
		assert_eq!(graph.n_gates(), 13 * 32);
		// The LSB adder's carry-in is literally CONST-0: the shared
		// NAND(xor_ab, CONST-0) gate must exist.
		let b0 = graph.lookup("T-B0").unwrap();
		assert!(graph.def(b0).is_some());
	}

	#[test]
	fn emission_interns_duplicate_subexpressions() {
		let mut program = WordProgram::new();
		program
			.push("A", WordOp::Xor { a: "INPUT-W0".into(), b: "INPUT-W1".into() })
			.unwrap();
		program
			.push("B", WordOp::Xor { a: "INPUT-W1".into(), b: "INPUT-W0".into() })
			.unwrap();
		let graph = synthesize(&program).unwrap();
		// The second XOR is commutatively identical and adds nothing.
		assert_eq!(graph.n_gates(), 4 * 32);
	}

	#[test]
	fn partial_output_binding_is_rejected() {
		let program = program_of("OUTPUT-W0", WordOp::Copy { a: "INPUT-W0".into() });
		assert!(matches!(
			synthesize(&program),
			Err(crate::error::Error::IncompleteOutputs { found: 1, expected: 8 })
		));
	}
}
