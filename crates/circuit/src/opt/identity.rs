//! Algebraic identity rewrites, matched structurally against the pre-pass DAG.
//!
//! Recognized, in priority order per gate:
//!
//! - double negation: `NAND(n, n)` with `n = NAND(x, x)` collapses to `x`;
//! - contradiction: `NAND(x, NOT x)` is `CONST-1`;
//! - `NAND(one, x)` with `one` provably 1 is redefined in place as the
//!   inverter `NAND(x, x)`;
//! - a four-gate XOR subgraph with one provably constant leg collapses to
//!   the other leg (constant 0) or to its inverter (constant 1), the
//!   inverter being the in-place redefinition of the XOR root.
//!
//! "Provably constant" is the round's shared value table, so a bound
//! `K-*`/`H-INIT-*` leaf counts the same as the reserved constant signals.

use cranelift_entity::SecondaryMap;
use nandgraph_core::TriBit;

use super::Effects;
use crate::graph::{NandGraph, Signal};

pub(super) fn run(
	graph: &NandGraph,
	values: &SecondaryMap<Signal, TriBit>,
	effects: &mut Effects,
) -> usize {
	let counts = graph.use_counts();
	let const1 = graph.const1();
	let mut changed = 0;

	for &gate in graph.order() {
		let Some((a, b)) = graph.def(gate) else {
			continue;
		};

		// Double negation.
		if a == b {
			if let Some((x, y)) = graph.def(a) {
				if x == y {
					effects.replace(gate, x);
					changed += 1;
					continue;
				}
			}
		}

		// Contradiction.
		if graph.def(b) == Some((a, a)) || graph.def(a) == Some((b, b)) {
			effects.replace(gate, const1);
			changed += 1;
			continue;
		}

		// NAND with a known 1 is NOT of the other operand. Gates whose own
		// value is known were already folded this round.
		let a_one = values[a] == TriBit::One;
		let b_one = values[b] == TriBit::One;
		if a_one && !b_one {
			effects.redefine(gate, b, b);
			changed += 1;
			continue;
		}
		if b_one && !a_one {
			effects.redefine(gate, a, a);
			changed += 1;
			continue;
		}

		if xor_with_const(graph, values, &counts, effects, gate, a, b) {
			changed += 1;
		}
	}
	changed
}

/// Matches `gate = NAND(NAND(x, t), NAND(y, t))` with `t = NAND(x, y)` —
/// the canonical four-gate XOR of `x` and `y` — where the inner gates feed
/// nothing else and one of `x`, `y` carries a known value.
fn xor_with_const(
	graph: &NandGraph,
	values: &SecondaryMap<Signal, TriBit>,
	counts: &SecondaryMap<Signal, u32>,
	effects: &mut Effects,
	gate: Signal,
	p: Signal,
	q: Signal,
) -> bool {
	if p == q {
		return false;
	}
	let (Some((p1, p2)), Some((q1, q2))) = (graph.def(p), graph.def(q)) else {
		return false;
	};

	for (t, x) in [(p1, p2), (p2, p1)] {
		for (t_again, y) in [(q1, q2), (q2, q1)] {
			if t != t_again {
				continue;
			}
			if graph.def(t).map(|(a, b)| NandGraph::canonical(a, b))
				!= Some(NandGraph::canonical(x, y))
			{
				continue;
			}
			// The shared NAND and both legs must be private to this XOR;
			// output aliases count as uses, so aliased legs disqualify
			// themselves here.
			if counts[t] != 2 || counts[p] != 1 || counts[q] != 1 {
				continue;
			}
			match (values[x], values[y]) {
				(TriBit::Zero, _) => effects.replace(gate, y),
				(_, TriBit::Zero) => effects.replace(gate, x),
				(TriBit::One, _) => effects.redefine(gate, y, y),
				(_, TriBit::One) => effects.redefine(gate, x, x),
				_ => continue,
			}
			return true;
		}
	}
	false
}
