//! Dead-code elimination.
//!
//! Marks everything reachable from the output aliases and drops the rest.
//! Constants and inputs are never deleted. A graph with no bound outputs
//! has no roots to mark from and is left untouched.

use cranelift_entity::SecondaryMap;

use crate::graph::NandGraph;

pub(super) fn run(graph: &mut NandGraph) -> usize {
	let mut roots: Vec<_> = graph.outputs().map(|(_, target)| target).collect();
	if roots.is_empty() {
		return 0;
	}

	let mut live: SecondaryMap<_, bool> = SecondaryMap::new();
	while let Some(signal) = roots.pop() {
		if live[signal] {
			continue;
		}
		live[signal] = true;
		if let Some((a, b)) = graph.def(signal) {
			roots.push(a);
			roots.push(b);
		}
	}
	graph.retain_gates(|signal| live[signal])
}
