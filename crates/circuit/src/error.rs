use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// Parse or load failure in one of the line-oriented formats.
	#[error(transparent)]
	Format(#[from] nandgraph_core::Error),

	/// A structural invariant of the DAG does not hold. The rewrite engine
	/// never recovers from this; it stops and reports what it saw.
	#[error("invariant violation: {0}")]
	Invariant(String),

	/// The circuit does not define all 256 output bits.
	#[error("missing output {label}")]
	MissingOutput { label: String },

	/// A word program bound some but not all of the eight output words.
	#[error("bound {found} output words, expected all {expected}")]
	IncompleteOutputs { found: usize, expected: usize },

	/// The message does not fit a single padded block.
	#[error("message of {len} bytes exceeds the single-block limit of 55")]
	MessageTooLong { len: usize },

	/// A hex message byte that is neither two hex digits nor `XX`.
	#[error("bad hex byte {pair:?}")]
	BadHexByte { pair: String },

	/// Differential verification found a digest disagreement.
	#[error("digest mismatch on trial {trial}: circuit {circuit}, reference {reference}")]
	DigestMismatch {
		trial: u64,
		circuit: String,
		reference: String,
	},
}
