//! The signal naming scheme.
//!
//! Word-level labels name 32-bit values (`INPUT-W3`, `K-17`, `H-INIT-5`,
//! `OUTPUT-W0`); bit-level labels append `-B{j}` with bit 0 the LSB. The
//! two constant bits `CONST-0` and `CONST-1` are reserved. Everything else
//! is an ordinary gate label.

pub const CONST_0: &str = "CONST-0";
pub const CONST_1: &str = "CONST-1";

pub const N_INPUT_WORDS: u32 = 16;
pub const N_ROUND_CONSTS: u32 = 64;
pub const N_INIT_HASH: u32 = 8;
pub const N_OUTPUT_WORDS: u32 = 8;
pub const BITS_PER_WORD: u32 = 32;

/// Classification of a bit-level signal label.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BitClass {
	Const0,
	Const1,
	/// `INPUT-W{w}-B{b}`
	Input { word: u32, bit: u32 },
	/// `K-{k}-B{b}`
	RoundConst { index: u32, bit: u32 },
	/// `H-INIT-{h}-B{b}`
	InitHash { index: u32, bit: u32 },
	/// `OUTPUT-W{w}-B{b}`
	Output { word: u32, bit: u32 },
	/// Anything else, i.e. a gate label.
	Gate,
}

impl BitClass {
	/// Whether a signal of this class is a leaf whose value comes from a
	/// binding file rather than from a NAND definition.
	pub fn is_leaf(self) -> bool {
		!matches!(self, BitClass::Output { .. } | BitClass::Gate)
	}
}

/// Classification of a word-level label.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WordClass {
	/// `INPUT-W{w}`
	Input { word: u32 },
	/// `K-{k}`
	RoundConst { index: u32 },
	/// `H-INIT-{h}`
	InitHash { index: u32 },
	/// `OUTPUT-W{w}`
	Output { word: u32 },
	Other,
}

/// Strict decimal parse: no sign, no leading zeros (except "0" itself).
fn parse_index(s: &str, limit: u32) -> Option<u32> {
	if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
		return None;
	}
	let n: u32 = s.parse().ok()?;
	(n < limit).then_some(n)
}

pub fn classify_word(label: &str) -> WordClass {
	if let Some(rest) = label.strip_prefix("INPUT-W") {
		if let Some(word) = parse_index(rest, N_INPUT_WORDS) {
			return WordClass::Input { word };
		}
	}
	if let Some(rest) = label.strip_prefix("K-") {
		if let Some(index) = parse_index(rest, N_ROUND_CONSTS) {
			return WordClass::RoundConst { index };
		}
	}
	if let Some(rest) = label.strip_prefix("H-INIT-") {
		if let Some(index) = parse_index(rest, N_INIT_HASH) {
			return WordClass::InitHash { index };
		}
	}
	if let Some(rest) = label.strip_prefix("OUTPUT-W") {
		if let Some(word) = parse_index(rest, N_OUTPUT_WORDS) {
			return WordClass::Output { word };
		}
	}
	WordClass::Other
}

pub fn classify_bit(label: &str) -> BitClass {
	match label {
		CONST_0 => return BitClass::Const0,
		CONST_1 => return BitClass::Const1,
		_ => {}
	}
	let Some((stem, bit)) = split_bit_suffix(label) else {
		return BitClass::Gate;
	};
	match classify_word(stem) {
		WordClass::Input { word } => BitClass::Input { word, bit },
		WordClass::RoundConst { index } => BitClass::RoundConst { index, bit },
		WordClass::InitHash { index } => BitClass::InitHash { index, bit },
		WordClass::Output { word } => BitClass::Output { word, bit },
		WordClass::Other => BitClass::Gate,
	}
}

/// Splits a trailing `-B{j}` suffix, returning the stem and the bit index.
fn split_bit_suffix(label: &str) -> Option<(&str, u32)> {
	let pos = label.rfind("-B")?;
	let bit = parse_index(&label[pos + 2..], BITS_PER_WORD)?;
	Some((&label[..pos], bit))
}

pub fn bit_label(word_label: &str, bit: u32) -> String {
	debug_assert!(bit < BITS_PER_WORD);
	format!("{word_label}-B{bit}")
}

pub fn input_word(w: u32) -> String {
	debug_assert!(w < N_INPUT_WORDS);
	format!("INPUT-W{w}")
}

pub fn round_const(k: u32) -> String {
	debug_assert!(k < N_ROUND_CONSTS);
	format!("K-{k}")
}

pub fn init_hash(h: u32) -> String {
	debug_assert!(h < N_INIT_HASH);
	format!("H-INIT-{h}")
}

pub fn output_word(w: u32) -> String {
	debug_assert!(w < N_OUTPUT_WORDS);
	format!("OUTPUT-W{w}")
}

pub fn output_bit(w: u32, b: u32) -> String {
	bit_label(&output_word(w), b)
}
