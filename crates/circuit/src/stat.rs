use std::fmt;

use cranelift_entity::SecondaryMap;
use itertools::Itertools;

use crate::graph::{NandGraph, SignalKind};

/// Size and shape figures for a circuit.
pub struct CircuitStat {
	pub n_signals: usize,
	pub n_gates: usize,
	pub n_inverters: usize,
	pub n_inputs: usize,
	pub n_expanded_consts: usize,
	pub n_outputs: usize,
	/// Longest leaf-to-gate path, in gates.
	pub depth: usize,
	pub max_fanout: u32,
}

impl CircuitStat {
	pub fn collect(graph: &NandGraph) -> Self {
		let mut n_gates = 0;
		let mut n_inverters = 0;
		let mut n_inputs = 0;
		let mut n_expanded_consts = 0;
		let mut depth_of: SecondaryMap<_, usize> = SecondaryMap::new();
		let mut depth = 0;

		for &signal in graph.order() {
			match graph.kind(signal) {
				SignalKind::Const(_) => {}
				SignalKind::Input => n_inputs += 1,
				SignalKind::ExpandedConst => n_expanded_consts += 1,
				SignalKind::Gate { a, b } => {
					n_gates += 1;
					if a == b {
						n_inverters += 1;
					}
					let d = 1 + depth_of[a].max(depth_of[b]);
					depth_of[signal] = d;
					depth = depth.max(d);
				}
			}
		}

		let counts = graph.use_counts();
		let max_fanout = graph
			.order()
			.iter()
			.map(|&signal| counts[signal])
			.max()
			.unwrap_or(0);

		CircuitStat {
			n_signals: graph.n_signals(),
			n_gates,
			n_inverters,
			n_inputs,
			n_expanded_consts,
			n_outputs: graph.outputs().map(|((w, _), _)| w).unique().count(),
			depth,
			max_fanout,
		}
	}
}

impl fmt::Display for CircuitStat {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "Number of signals: {}", self.n_signals)?;
		writeln!(f, "Number of NAND gates: {}", self.n_gates)?;
		writeln!(f, "  of which inverters: {}", self.n_inverters)?;
		writeln!(f, "Input bits: {}", self.n_inputs)?;
		writeln!(f, "Expanded constant bits: {}", self.n_expanded_consts)?;
		writeln!(f, "Output words bound: {}", self.n_outputs)?;
		writeln!(f, "Logic depth: {}", self.depth)?;
		writeln!(f, "Maximum fan-out: {}", self.max_fanout)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collects_counts_and_depth() {
		let graph = NandGraph::load(
			"N1,INPUT-W0-B0,INPUT-W0-B1\nN2,N1,N1\nOUTPUT-W0-B0,N2,INPUT-W0-B0\n",
		)
		.unwrap();
		let stat = CircuitStat::collect(&graph);
		assert_eq!(stat.n_gates, 3);
		assert_eq!(stat.n_inverters, 1);
		assert_eq!(stat.n_inputs, 2);
		assert_eq!(stat.depth, 3);
		assert_eq!(stat.n_outputs, 1);
		// INPUT-W0-B0 feeds N1 and the output gate.
		assert_eq!(stat.max_fanout, 2);
	}
}
