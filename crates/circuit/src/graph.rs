//! The NAND DAG.
//!
//! Signals live in a dense arena indexed by [`Signal`] ids; the separate
//! `order` list is the definition order, which is also the one topological
//! order every consumer (rewrites, evaluation, serialization) walks. Ids
//! are never reused within a run; rewrites only drop entries from `order`,
//! so ids held by alias tables stay valid.

use std::collections::{HashMap, HashSet};

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use nandgraph_core::{
	label::{self, BitClass},
	Error as FormatError,
};

use crate::error::Error;

/// Identifies a signal in the graph arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Signal(u32);
entity_impl!(Signal);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SignalKind {
	/// One of the two reserved constant bits.
	Const(bool),
	/// An `INPUT-Wi-Bj` bit, bound at evaluation time.
	Input,
	/// A `K-k-Bj` or `H-INIT-h-Bj` bit, bound from the constants file.
	ExpandedConst,
	/// A two-input NAND of earlier signals.
	Gate { a: Signal, b: Signal },
}

#[derive(Debug)]
pub struct SignalData {
	name: String,
	kind: SignalKind,
}

impl SignalData {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> SignalKind {
		self.kind
	}
}

#[derive(Debug)]
pub struct NandGraph {
	signals: PrimaryMap<Signal, SignalData>,
	by_name: HashMap<String, Signal>,
	/// Live signals in definition order: leaves where first referenced,
	/// gates where defined.
	order: Vec<Signal>,
	const0: Signal,
	const1: Signal,
	outputs: [[Option<Signal>; 32]; 8],
}

impl Default for NandGraph {
	fn default() -> Self {
		NandGraph::new()
	}
}

impl NandGraph {
	pub fn new() -> Self {
		let mut graph = NandGraph {
			signals: PrimaryMap::new(),
			by_name: HashMap::new(),
			order: Vec::new(),
			const0: Signal(0),
			const1: Signal(0),
			outputs: [[None; 32]; 8],
		};
		graph.const0 = graph.push_signal(label::CONST_0.to_string(), SignalKind::Const(false));
		graph.const1 = graph.push_signal(label::CONST_1.to_string(), SignalKind::Const(true));
		graph
	}

	fn push_signal(&mut self, name: String, kind: SignalKind) -> Signal {
		let signal = self.signals.push(SignalData {
			name: name.clone(),
			kind,
		});
		self.by_name.insert(name, signal);
		self.order.push(signal);
		signal
	}

	pub fn const0(&self) -> Signal {
		self.const0
	}

	pub fn const1(&self) -> Signal {
		self.const1
	}

	pub fn const_signal(&self, value: bool) -> Signal {
		if value { self.const1 } else { self.const0 }
	}

	pub fn name(&self, signal: Signal) -> &str {
		&self.signals[signal].name
	}

	pub fn kind(&self, signal: Signal) -> SignalKind {
		self.signals[signal].kind
	}

	/// The defining NAND pair, or `None` for leaves.
	pub fn def(&self, signal: Signal) -> Option<(Signal, Signal)> {
		match self.signals[signal].kind {
			SignalKind::Gate { a, b } => Some((a, b)),
			_ => None,
		}
	}

	pub fn is_gate(&self, signal: Signal) -> bool {
		matches!(self.signals[signal].kind, SignalKind::Gate { .. })
	}

	pub fn lookup(&self, name: &str) -> Option<Signal> {
		self.by_name.get(name).copied()
	}

	/// Live signals in definition order.
	pub fn order(&self) -> &[Signal] {
		&self.order
	}

	pub fn n_signals(&self) -> usize {
		self.order.len()
	}

	pub fn n_gates(&self) -> usize {
		self.order.iter().filter(|&&s| self.is_gate(s)).count()
	}

	/// Looks up or creates the leaf signal for a reserved label. Only
	/// constant, input and expanded-constant labels are accepted.
	pub fn ensure_leaf(&mut self, name: &str) -> Result<Signal, Error> {
		if let Some(existing) = self.lookup(name) {
			return Ok(existing);
		}
		let kind = match label::classify_bit(name) {
			BitClass::Const0 => return Ok(self.const0),
			BitClass::Const1 => return Ok(self.const1),
			BitClass::Input { .. } => SignalKind::Input,
			BitClass::RoundConst { .. } | BitClass::InitHash { .. } => SignalKind::ExpandedConst,
			BitClass::Output { .. } | BitClass::Gate => {
				return Err(Error::Invariant(format!("{name} is not a leaf label")));
			}
		};
		Ok(self.push_signal(name.to_string(), kind))
	}

	/// Defines a new gate. `line` feeds error reporting; pass 0 when the
	/// caller is not reading a file.
	pub fn add_gate_at(
		&mut self,
		line: usize,
		name: &str,
		a: Signal,
		b: Signal,
	) -> Result<Signal, Error> {
		let class = label::classify_bit(name);
		if self.by_name.contains_key(name) || class.is_leaf() {
			return Err(FormatError::DuplicateLabel {
				line,
				label: name.to_string(),
			}
			.into());
		}
		let signal = self.push_signal(name.to_string(), SignalKind::Gate { a, b });
		if let BitClass::Output { word, bit } = class {
			self.outputs[word as usize][bit as usize] = Some(signal);
		}
		Ok(signal)
	}

	pub fn add_gate(&mut self, name: &str, a: Signal, b: Signal) -> Result<Signal, Error> {
		self.add_gate_at(0, name, a, b)
	}

	pub(crate) fn set_def(&mut self, gate: Signal, a: Signal, b: Signal) {
		debug_assert!(self.is_gate(gate));
		self.signals[gate].kind = SignalKind::Gate { a, b };
	}

	pub fn output(&self, word: u32, bit: u32) -> Option<Signal> {
		self.outputs[word as usize][bit as usize]
	}

	/// Points `OUTPUT-W{word}-B{bit}` at `target`. Outputs are aliases: the
	/// target keeps its own label and definition.
	pub fn set_output(&mut self, word: u32, bit: u32, target: Signal) {
		self.outputs[word as usize][bit as usize] = Some(target);
	}

	/// All bound outputs as `((word, bit), target)`.
	pub fn outputs(&self) -> impl Iterator<Item = ((u32, u32), Signal)> + '_ {
		self.outputs.iter().enumerate().flat_map(|(w, bits)| {
			bits.iter()
				.enumerate()
				.filter_map(move |(b, s)| s.map(|s| ((w as u32, b as u32), s)))
		})
	}

	pub fn require_complete_outputs(&self) -> Result<(), Error> {
		for w in 0..8 {
			for b in 0..32 {
				if self.output(w, b).is_none() {
					return Err(Error::MissingOutput {
						label: label::output_bit(w, b),
					});
				}
			}
		}
		Ok(())
	}

	/// Canonical operand order for commutative CSE: lower id first.
	pub fn canonical(a: Signal, b: Signal) -> (Signal, Signal) {
		if a <= b { (a, b) } else { (b, a) }
	}

	/// Position of every live signal in definition order, offset by one so
	/// that 0 means "not live".
	pub(crate) fn positions(&self) -> SecondaryMap<Signal, u32> {
		let mut positions = SecondaryMap::new();
		for (i, &signal) in self.order.iter().enumerate() {
			positions[signal] = i as u32 + 1;
		}
		positions
	}

	/// Number of uses of each signal: gate operand references plus output
	/// aliases.
	pub fn use_counts(&self) -> SecondaryMap<Signal, u32> {
		let mut counts = SecondaryMap::new();
		for &signal in &self.order {
			if let Some((a, b)) = self.def(signal) {
				counts[a] += 1;
				counts[b] += 1;
			}
		}
		for (_, target) in self.outputs() {
			counts[target] += 1;
		}
		counts
	}

	/// Derived reverse edges: for each signal, the gates consuming it.
	pub fn fanouts(&self) -> SecondaryMap<Signal, Vec<Signal>> {
		let mut fanouts: SecondaryMap<Signal, Vec<Signal>> = SecondaryMap::new();
		for &signal in &self.order {
			if let Some((a, b)) = self.def(signal) {
				fanouts[a].push(signal);
				if b != a {
					fanouts[b].push(signal);
				}
			}
		}
		fanouts
	}

	/// Drops gates not satisfying `keep` from the live order. Leaves are
	/// never dropped. Dropped gates lose their name binding; their arena
	/// slots are simply orphaned.
	pub(crate) fn retain_gates(&mut self, keep: impl Fn(Signal) -> bool) -> usize {
		let before = self.order.len();
		let mut order = Vec::with_capacity(before);
		for &signal in &self.order {
			if !self.is_gate(signal) || keep(signal) {
				order.push(signal);
			} else {
				self.by_name.remove(&self.signals[signal].name);
			}
		}
		self.order = order;
		before - self.order.len()
	}

	/// Checks definition-before-use, acyclicity (the definition order is a
	/// topological order), name-table consistency and output liveness.
	pub fn validate(&self) -> Result<(), Error> {
		let positions = self.positions();
		if self.by_name.len() != self.order.len() {
			return Err(Error::Invariant(format!(
				"name table has {} entries for {} live signals",
				self.by_name.len(),
				self.order.len()
			)));
		}
		for (i, &signal) in self.order.iter().enumerate() {
			let data = &self.signals[signal];
			if self.by_name.get(&data.name) != Some(&signal) {
				return Err(Error::Invariant(format!(
					"label {:?} does not resolve to its signal",
					data.name
				)));
			}
			if let SignalKind::Gate { a, b } = data.kind {
				for operand in [a, b] {
					let pos = positions[operand];
					if pos == 0 {
						return Err(Error::Invariant(format!(
							"gate {:?} references dead signal {:?}",
							data.name,
							self.signals[operand].name
						)));
					}
					if pos > i as u32 {
						return Err(Error::Invariant(format!(
							"gate {:?} references later signal {:?}",
							data.name,
							self.signals[operand].name
						)));
					}
				}
			}
		}
		for ((w, b), target) in self.outputs() {
			if positions[target] == 0 {
				return Err(Error::Invariant(format!(
					"output {} aliases dead signal {:?}",
					label::output_bit(w, b),
					self.signals[target].name
				)));
			}
		}
		Ok(())
	}

	/// Loads a `nands.txt` circuit. Operands naming reserved leaves are
	/// created on first use; anything else must be defined earlier.
	pub fn load(text: &str) -> Result<NandGraph, Error> {
		let mut graph = NandGraph::new();
		for (idx, raw) in text.lines().enumerate() {
			let line_no = idx + 1;
			let line = raw.trim();
			if line.is_empty() {
				continue;
			}
			let mut parts = line.split(',');
			let (label_str, a, b) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
				(Some(l), Some(a), Some(b), None) if !l.is_empty() => (l, a, b),
				_ => {
					return Err(FormatError::MalformedLine {
						line: line_no,
						content: line.to_string(),
					}
					.into());
				}
			};
			let a = graph.resolve_operand(line_no, a)?;
			let b = graph.resolve_operand(line_no, b)?;
			graph.add_gate_at(line_no, label_str, a, b)?;
		}
		Ok(graph)
	}

	fn resolve_operand(&mut self, line: usize, name: &str) -> Result<Signal, Error> {
		if let Some(signal) = self.lookup(name) {
			return Ok(signal);
		}
		if label::classify_bit(name).is_leaf() {
			return self.ensure_leaf(name);
		}
		Err(FormatError::UndefinedReference {
			line,
			label: name.to_string(),
		}
		.into())
	}

	/// Serializes the live gates as `nands.txt` lines.
	///
	/// Outputs are aliases in memory. On disk every `OUTPUT-Wi-Bj` must
	/// label a NAND line, so the unique alias target of an output is
	/// written under the output label, and an output whose target is a
	/// leaf or already claimed by an earlier output is materialized as a
	/// double-inverter copy pair.
	pub fn save(&self) -> String {
		use std::fmt::Write;

		// First output claiming a gate gets to rename it.
		let mut primary: HashMap<Signal, (u32, u32)> = HashMap::new();
		let mut copies: Vec<((u32, u32), Signal)> = Vec::new();
		for ((w, b), target) in self.outputs() {
			if self.is_gate(target) && !primary.contains_key(&target) {
				primary.insert(target, (w, b));
			} else {
				copies.push(((w, b), target));
			}
		}

		let mut printed: SecondaryMap<Signal, Option<String>> = SecondaryMap::with_default(None);
		let mut taken: HashSet<String> = HashSet::new();
		for &signal in &self.order {
			let mut name = match primary.get(&signal) {
				Some(&(w, b)) => label::output_bit(w, b),
				None => self.name(signal).to_string(),
			};
			// A gate still carrying an output label whose alias points
			// elsewhere must step aside: on disk that label belongs to the
			// alias target.
			if !primary.contains_key(&signal) {
				if let BitClass::Output { word, bit } = label::classify_bit(&name) {
					if self.output(word, bit) != Some(signal) {
						name.push_str("-D");
					}
				}
			}
			while taken.contains(&name) {
				name.push_str("-D");
			}
			taken.insert(name.clone());
			printed[signal] = Some(name);
		}
		let printed_name = |s: Signal| printed[s].as_deref().expect("live signal has printed name");

		let mut out = String::new();
		for &signal in &self.order {
			if let Some((a, b)) = self.def(signal) {
				writeln!(out, "{},{},{}", printed_name(signal), printed_name(a), printed_name(b))
					.unwrap();
			}
		}
		for ((w, b), target) in copies {
			let output = label::output_bit(w, b);
			let mut inverted = format!("{output}-C");
			while taken.contains(&inverted) {
				inverted.push_str("-C");
			}
			taken.insert(inverted.clone());
			let target = printed_name(target);
			writeln!(out, "{inverted},{target},{target}").unwrap();
			writeln!(out, "{output},{inverted},{inverted}").unwrap();
		}
		out
	}

	/// Renames `-T{n}` temporary labels to a fresh sequential numbering in
	/// definition order. Cosmetic; makes serialized artifacts reproducible
	/// across runs.
	pub fn renumber_temps(&mut self) {
		// Every temporary is renamed, so transient collisions between old
		// and new numberings do not matter; only a clash with a label that
		// stays (a non-temporary) must be avoided.
		let mut renames: Vec<(Signal, String)> = Vec::new();
		let mut counter = 0usize;
		for &signal in &self.order {
			if !self.is_gate(signal) {
				continue;
			}
			if let Some(stem) = split_temp_label(&self.signals[signal].name) {
				counter += 1;
				renames.push((signal, format!("{stem}-T{counter}")));
			}
		}
		for (signal, _) in &renames {
			self.by_name.remove(&self.signals[*signal].name);
		}
		for (signal, new_name) in renames {
			let new_name = if self.by_name.contains_key(&new_name) {
				format!("{new_name}-R")
			} else {
				new_name
			};
			self.signals[signal].name = new_name.clone();
			self.by_name.insert(new_name, signal);
		}
	}
}

/// The stem of a `{stem}-T{digits}` temporary label.
fn split_temp_label(name: &str) -> Option<&str> {
	let pos = name.rfind("-T")?;
	let digits = &name[pos + 2..];
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	Some(&name[..pos])
}
