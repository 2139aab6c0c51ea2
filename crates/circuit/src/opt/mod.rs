//! The rewrite engine.
//!
//! One round applies the passes in a fixed order: constant folding,
//! algebraic identities, commutative CSE, dead-code elimination, shared
//! inverter merging. Rounds repeat until a full round changes nothing or
//! the configured round bound is exhausted.
//!
//! Each pass scans the pre-pass DAG in definition order and only queues
//! its effects; they are applied atomically at pass end, so no pass ever
//! observes a partially rewritten graph. An effect either retargets every
//! use of a gate to another signal or redefines a gate's operand pair in
//! place. Neither kind allocates a new definition slot, so the definition
//! order remains a topological order by construction and the gate count
//! never grows.

use std::collections::HashMap;

use log::{debug, error, warn};
use nandgraph_core::TriBit;

use crate::{
	error::Error,
	eval,
	graph::{NandGraph, Signal},
};

mod const_fold;
mod cse;
mod dce;
mod identity;
mod inverters;

#[derive(Clone, Debug)]
pub struct OptConfig {
	/// Bound on rewrite rounds. Exhausting it is not an error; the engine
	/// reports non-convergence and returns the current DAG.
	pub max_rounds: usize,
}

impl Default for OptConfig {
	fn default() -> Self {
		OptConfig { max_rounds: 32 }
	}
}

/// Counters accumulated across all rounds.
#[derive(Clone, Copy, Default, Debug)]
pub struct OptStats {
	pub rounds: usize,
	pub converged: bool,
	pub gates_before: usize,
	pub gates_after: usize,
	pub constants_folded: usize,
	pub identities_rewritten: usize,
	pub cse_merged: usize,
	pub dead_removed: usize,
	pub inverters_merged: usize,
}

impl OptStats {
	pub fn eliminated(&self) -> usize {
		self.gates_before - self.gates_after
	}
}

/// Reduces the DAG to a fixed point under the rewrite passes.
///
/// `constants` binds the expanded-constant leaves (`K-*`, `H-INIT-*`) so
/// that folding can push them through the circuit; inputs stay unknown.
/// Pass an empty map for a purely structural reduction.
pub fn optimize(
	graph: &mut NandGraph,
	constants: &HashMap<String, TriBit>,
	config: &OptConfig,
) -> Result<OptStats, Error> {
	let mut stats = OptStats {
		gates_before: graph.n_gates(),
		..OptStats::default()
	};

	for round in 1..=config.max_rounds {
		stats.rounds = round;

		// One three-valued sweep per round; the fold pass consumes it and
		// the identity pass reads it as the shared value table. Ids are
		// stable across the fold's apply, and the fold only rewires uses
		// of gates it proved constant, so the sweep stays accurate for
		// everything that survives it.
		let values = eval::sweep(graph, constants);
		let folded = run_pass(graph, "const-fold", |graph, effects| {
			const_fold::run(graph, &values, effects)
		})?;
		let identities = run_pass(graph, "identity", |graph, effects| {
			identity::run(graph, &values, effects)
		})?;
		let merged = run_pass(graph, "cse", cse::run)?;
		let dead = dce::run(graph);
		validate_after(graph, "dce")?;
		let inverters = run_pass(graph, "inverters", inverters::run)?;

		stats.constants_folded += folded;
		stats.identities_rewritten += identities;
		stats.cse_merged += merged;
		stats.dead_removed += dead;
		stats.inverters_merged += inverters;

		let changed = folded + identities + merged + dead + inverters;
		debug!(
			"round {round}: folded {folded}, identities {identities}, cse {merged}, dead {dead}, \
			 inverters {inverters}; {} gates live",
			graph.n_gates()
		);
		if changed == 0 {
			stats.converged = true;
			break;
		}
	}

	if !stats.converged {
		warn!(
			"rewriting did not converge within {} rounds; returning current DAG",
			config.max_rounds
		);
	}
	stats.gates_after = graph.n_gates();
	Ok(stats)
}

fn run_pass(
	graph: &mut NandGraph,
	name: &str,
	pass: impl FnOnce(&NandGraph, &mut Effects) -> usize,
) -> Result<usize, Error> {
	let mut effects = Effects::default();
	let changed = pass(graph, &mut effects);
	effects.apply(graph);
	validate_after(graph, name)?;
	Ok(changed)
}

/// A failed check here is an engine bug, not an input problem; there is no
/// recovery, only a report of what the graph looked like.
fn validate_after(graph: &NandGraph, pass: &str) -> Result<(), Error> {
	if let Err(err) = graph.validate() {
		error!(
			"structural dump after {pass}: {} live signals, {} gates, error: {err}",
			graph.n_signals(),
			graph.n_gates()
		);
		return Err(err);
	}
	Ok(())
}

/// Queued rewrite effects of a single pass.
#[derive(Default)]
pub(crate) struct Effects {
	/// Retarget every use of the key gate to the value signal and drop the
	/// gate. Targets always precede the gate in definition order.
	replace: HashMap<Signal, Signal>,
	/// Swap the key gate's defining pair in place.
	redefine: HashMap<Signal, (Signal, Signal)>,
}

impl Effects {
	pub(crate) fn replace(&mut self, gate: Signal, with: Signal) {
		if gate == with {
			return;
		}
		self.redefine.remove(&gate);
		self.replace.entry(gate).or_insert(with);
	}

	pub(crate) fn redefine(&mut self, gate: Signal, a: Signal, b: Signal) {
		if self.replace.contains_key(&gate) {
			return;
		}
		self.redefine.insert(gate, (a, b));
	}

	/// Follows replacement chains to their root. Chains always step to an
	/// earlier definition, so this terminates.
	fn resolve(&self, mut signal: Signal) -> Signal {
		while let Some(&next) = self.replace.get(&signal) {
			signal = next;
		}
		signal
	}

	fn apply(self, graph: &mut NandGraph) {
		if self.replace.is_empty() && self.redefine.is_empty() {
			return;
		}
		graph.retain_gates(|gate| !self.replace.contains_key(&gate));
		let live: Vec<Signal> = graph.order().to_vec();
		for gate in live {
			let Some(def) = graph.def(gate) else { continue };
			let (a, b) = self.redefine.get(&gate).copied().unwrap_or(def);
			graph.set_def(gate, self.resolve(a), self.resolve(b));
		}
		let outputs: Vec<((u32, u32), Signal)> = graph.outputs().collect();
		for ((w, b), target) in outputs {
			graph.set_output(w, b, self.resolve(target));
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use nandgraph_core::TriBit;

	use super::{optimize, OptConfig};
	use crate::{eval, graph::NandGraph};

	fn no_constants() -> HashMap<String, TriBit> {
		HashMap::new()
	}

	/// XOR of an input with CONST-0 reduces to a pass-through of the input.
	#[test]
	fn xor_with_zero_collapses() {
		let text = "\
T1,INPUT-W0-B0,CONST-0
T2,INPUT-W0-B0,T1
T3,CONST-0,T1
OUTPUT-W0-B0,T2,T3
";
		let mut graph = NandGraph::load(text).unwrap();
		let input = graph.lookup("INPUT-W0-B0").unwrap();
		let stats = optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		assert!(stats.converged);
		assert_eq!(graph.n_gates(), 0);
		assert_eq!(graph.output(0, 0), Some(input));
	}

	/// XOR of an input with CONST-1 reduces to a single inverter.
	#[test]
	fn xor_with_one_becomes_inverter() {
		let text = "\
T1,INPUT-W0-B0,CONST-1
T2,INPUT-W0-B0,T1
T3,CONST-1,T1
OUTPUT-W0-B0,T2,T3
";
		let mut graph = NandGraph::load(text).unwrap();
		let input = graph.lookup("INPUT-W0-B0").unwrap();
		let stats = optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		assert!(stats.converged);
		assert_eq!(graph.n_gates(), 1);
		let out = graph.output(0, 0).unwrap();
		assert_eq!(graph.def(out), Some((input, input)));
	}

	#[test]
	fn double_negation_is_removed() {
		let text = "\
N1,INPUT-W0-B0,INPUT-W0-B0
N2,N1,N1
G,N2,INPUT-W0-B1
OUTPUT-W0-B0,G,G
";
		let mut graph = NandGraph::load(text).unwrap();
		optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		// N1/N2 fold away; G reads the input directly.
		assert_eq!(graph.n_gates(), 2);
		let g = graph.lookup("G").unwrap();
		let b0 = graph.lookup("INPUT-W0-B0").unwrap();
		let b1 = graph.lookup("INPUT-W0-B1").unwrap();
		assert_eq!(graph.def(g), Some((b0, b1)));
	}

	#[test]
	fn contradiction_folds_to_one() {
		let text = "\
N1,INPUT-W0-B0,INPUT-W0-B0
G,INPUT-W0-B0,N1
OUTPUT-W0-B0,G,G
";
		let mut graph = NandGraph::load(text).unwrap();
		optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		// G = NAND(x, NOT x) = 1, so the output is NOT(1) = 0... which
		// itself folds to CONST-0.
		assert_eq!(graph.n_gates(), 0);
		assert_eq!(graph.output(0, 0), Some(graph.const0()));
	}

	#[test]
	fn cse_merges_commuted_duplicates() {
		let text = "\
A,INPUT-W0-B0,INPUT-W0-B1
B,INPUT-W0-B1,INPUT-W0-B0
GA,A,INPUT-W0-B2
GB,B,INPUT-W0-B3
OUTPUT-W0-B0,GA,GB
";
		let mut graph = NandGraph::load(text).unwrap();
		let stats = optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		assert!(stats.cse_merged >= 1);
		assert_eq!(graph.n_gates(), 4);
		let a = graph.lookup("A").unwrap();
		let gb = graph.lookup("GB").unwrap();
		let b3 = graph.lookup("INPUT-W0-B3").unwrap();
		assert_eq!(graph.def(gb), Some((a, b3)));
	}

	#[test]
	fn dead_code_is_swept_from_outputs() {
		let text = "\
DEAD,INPUT-W0-B0,INPUT-W0-B1
LIVE,INPUT-W0-B0,INPUT-W0-B2
OUTPUT-W0-B0,LIVE,LIVE
";
		let mut graph = NandGraph::load(text).unwrap();
		let stats = optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		assert_eq!(stats.dead_removed, 1);
		assert!(graph.lookup("DEAD").is_none());
		assert_eq!(graph.n_gates(), 2);
	}

	#[test]
	fn optimization_preserves_three_valued_semantics() {
		// A random-ish tangle with every pass represented: constants,
		// duplicate NANDs, inverter pairs.
		let text = "\
N1,INPUT-W0-B0,INPUT-W0-B1
N2,INPUT-W0-B1,INPUT-W0-B0
N3,N1,CONST-1
N4,N3,N3
N5,N4,N4
N6,N5,INPUT-W0-B2
N7,N2,N6
OUTPUT-W0-B0,N7,N7
";
		let reference = NandGraph::load(text).unwrap();
		let mut optimized = NandGraph::load(text).unwrap();
		optimize(&mut optimized, &no_constants(), &OptConfig::default()).unwrap();
		assert!(optimized.n_gates() < reference.n_gates());

		for assignment in 0u32..27 {
			let mut bindings = HashMap::new();
			let mut code = assignment;
			for bit in 0..3 {
				let value = match code % 3 {
					0 => TriBit::Zero,
					1 => TriBit::One,
					_ => TriBit::Unknown,
				};
				code /= 3;
				bindings.insert(format!("INPUT-W0-B{bit}"), value);
			}
			let expect = eval::sweep(&reference, &bindings)[reference.output(0, 0).unwrap()];
			let got = eval::sweep(&optimized, &bindings)[optimized.output(0, 0).unwrap()];
			assert_eq!(expect, got, "assignment {assignment}");
		}
	}

	/// Bound expanded-constant leaves drive the same rewrites as the
	/// reserved constant signals.
	#[test]
	fn bound_constant_leaves_fold_like_constants() {
		// XOR(K-0-B0, input) with K-0-B0 bound to 1 collapses to NOT input.
		let text = "\
T1,K-0-B0,INPUT-W0-B0
T2,K-0-B0,T1
T3,INPUT-W0-B0,T1
OUTPUT-W0-B0,T2,T3
";
		let mut graph = NandGraph::load(text).unwrap();
		let input = graph.lookup("INPUT-W0-B0").unwrap();
		let mut constants = HashMap::new();
		constants.insert("K-0-B0".to_string(), TriBit::One);
		let stats = optimize(&mut graph, &constants, &OptConfig::default()).unwrap();
		assert!(stats.converged);
		assert_eq!(graph.n_gates(), 1);
		let out = graph.output(0, 0).unwrap();
		assert_eq!(graph.def(out), Some((input, input)));

		// The same circuit with the leaf bound to 0 is a plain wire.
		let mut graph = NandGraph::load(text).unwrap();
		let input = graph.lookup("INPUT-W0-B0").unwrap();
		let mut constants = HashMap::new();
		constants.insert("K-0-B0".to_string(), TriBit::Zero);
		optimize(&mut graph, &constants, &OptConfig::default()).unwrap();
		assert_eq!(graph.n_gates(), 0);
		assert_eq!(graph.output(0, 0), Some(input));
	}

	#[test]
	fn optimize_is_idempotent() {
		let text = "\
N1,INPUT-W0-B0,INPUT-W0-B0
N2,N1,N1
N3,N2,INPUT-W0-B1
N4,N3,CONST-1
OUTPUT-W0-B0,N4,N4
";
		let mut graph = NandGraph::load(text).unwrap();
		optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		let first = graph.save();
		let stats = optimize(&mut graph, &no_constants(), &OptConfig::default()).unwrap();
		assert!(stats.converged);
		assert_eq!(stats.rounds, 1);
		assert_eq!(graph.save(), first);
	}
}
