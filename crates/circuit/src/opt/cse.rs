//! Common subexpression elimination.
//!
//! NAND is commutative, so gates canonicalize by ordering their operand
//! pair by node id. The first gate in definition order owns each canonical
//! pair; later duplicates retarget to it, which also makes the lower node
//! id the tie-break between equally canonical gates.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::Effects;
use crate::graph::{NandGraph, Signal};

pub(super) fn run(graph: &NandGraph, effects: &mut Effects) -> usize {
	let mut seen: HashMap<(Signal, Signal), Signal> = HashMap::new();
	let mut merged = 0;
	for &gate in graph.order() {
		let Some((a, b)) = graph.def(gate) else {
			continue;
		};
		match seen.entry(NandGraph::canonical(a, b)) {
			Entry::Occupied(representative) => {
				effects.replace(gate, *representative.get());
				merged += 1;
			}
			Entry::Vacant(slot) => {
				slot.insert(gate);
			}
		}
	}
	merged
}
