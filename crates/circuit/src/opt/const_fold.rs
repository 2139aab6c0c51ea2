//! Constant folding and propagation.
//!
//! A single three-valued sweep already propagates constants through the
//! whole DAG in topological order, so one pass suffices to find every gate
//! whose value is forced; each such gate is replaced by the matching
//! reserved constant signal.

use cranelift_entity::SecondaryMap;
use nandgraph_core::TriBit;

use super::Effects;
use crate::graph::{NandGraph, Signal};

pub(super) fn run(
	graph: &NandGraph,
	values: &SecondaryMap<Signal, TriBit>,
	effects: &mut Effects,
) -> usize {
	let mut folded = 0;
	for &signal in graph.order() {
		if graph.def(signal).is_none() {
			continue;
		}
		if let Some(value) = values[signal].known() {
			effects.replace(signal, graph.const_signal(value));
			folded += 1;
		}
	}
	folded
}
