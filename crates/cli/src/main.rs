use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use nandgraph_circuit::{
	eval, message,
	opt::{self, OptConfig},
	sha256,
	stat::CircuitStat,
	synth, verify, NandGraph,
};
use nandgraph_core::{binding, wordmodel::WordProgram, TriBit};

#[derive(Parser)]
#[command(name = "nandgraph")]
#[command(about = "SHA-256 NAND circuit toolkit", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Pad a message and write the word-level input bindings.
	GenerateInput {
		/// ASCII message; use '?' for an unknown byte.
		text: Option<String>,

		/// Hex message instead of ASCII; use XX for an unknown byte.
		#[arg(long)]
		hex: Option<String>,

		#[arg(short, long, default_value = "input.txt")]
		output: PathBuf,
	},
	/// Write the compression-function word model and its constants.
	GenerateCircuit {
		/// Directory receiving functions.txt and constants.txt.
		#[arg(short, long, default_value = ".")]
		output_dir: PathBuf,
	},
	/// Expand word-level bindings to bit-level bindings.
	ExpandWords {
		#[arg(short, long)]
		input: PathBuf,

		#[arg(short, long)]
		output: PathBuf,

		/// Also emit the reserved CONST-0/CONST-1 bits.
		#[arg(short = 'c', long)]
		add_constants: bool,
	},
	/// Lower a word program to a NAND circuit.
	Synthesize {
		#[arg(short, long, default_value = "functions.txt")]
		input: PathBuf,

		#[arg(short, long, default_value = "nands.txt")]
		output: PathBuf,
	},
	/// Rewrite a NAND circuit to a fixed point.
	Optimize {
		#[arg(short, long, default_value = "nands.txt")]
		input: PathBuf,

		#[arg(short, long, default_value = "nands-opt.txt")]
		output: PathBuf,

		/// Bit bindings for the expanded constants, enabling constant
		/// propagation through them.
		#[arg(short = 'c', long)]
		constants: Option<PathBuf>,

		#[arg(long, default_value_t = 32)]
		max_rounds: usize,
	},
	/// Evaluate a circuit under bit bindings and print the digest.
	Evaluate {
		#[arg(short = 'n', long, default_value = "nands.txt")]
		nands: PathBuf,

		/// Bit binding files; may be given multiple times.
		#[arg(short = 'i', long = "inputs")]
		inputs: Vec<PathBuf>,
	},
	/// Differentially verify a circuit against a reference SHA-256.
	Verify {
		#[arg(short = 'n', long, default_value = "nands.txt")]
		nands: PathBuf,

		/// Number of random input blocks to try.
		#[arg(short = 't', long, default_value_t = 16)]
		trials: u64,

		#[arg(long, default_value_t = 0)]
		seed: u64,
	},
	/// Print circuit statistics.
	Stat {
		#[arg(short = 'n', long, default_value = "nands.txt")]
		nands: PathBuf,
	},
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default()).init();
	let cli = Cli::parse();

	match cli.command {
		Commands::GenerateInput { text, hex, output } => generate_input(text, hex, &output),
		Commands::GenerateCircuit { output_dir } => generate_circuit(&output_dir),
		Commands::ExpandWords {
			input,
			output,
			add_constants,
		} => expand_words(&input, &output, add_constants),
		Commands::Synthesize { input, output } => synthesize(&input, &output),
		Commands::Optimize {
			input,
			output,
			constants,
			max_rounds,
		} => optimize(&input, &output, constants.as_deref(), max_rounds),
		Commands::Evaluate { nands, inputs } => evaluate(&nands, &inputs),
		Commands::Verify { nands, trials, seed } => run_verify(&nands, trials, seed),
		Commands::Stat { nands } => stat(&nands),
	}
}

fn read(path: &Path) -> Result<String> {
	fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, contents: &str) -> Result<()> {
	fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn generate_input(text: Option<String>, hex: Option<String>, output: &Path) -> Result<()> {
	let message = match (text, hex) {
		(Some(text), None) => message::parse_ascii(&text),
		(None, Some(hex)) => message::parse_hex(&hex)?,
		_ => bail!("provide either an ASCII message or --hex, not both"),
	};
	let block = message::pad_block(&message)?;
	let bindings = message::input_bindings(&block);
	write(output, &binding::write_word_bindings(&bindings))?;

	let unknown = message.iter().filter(|b| b.is_none()).count();
	println!("Wrote {} ({} message bytes, {unknown} unknown)", output.display(), message.len());
	Ok(())
}

fn generate_circuit(output_dir: &Path) -> Result<()> {
	fs::create_dir_all(output_dir)
		.with_context(|| format!("creating {}", output_dir.display()))?;
	let program = sha256::compression_program();
	let functions = output_dir.join("functions.txt");
	write(&functions, &program.write())?;
	let constants = output_dir.join("constants.txt");
	write(&constants, &binding::write_word_bindings(&sha256::constant_bindings()))?;
	println!("Wrote {} ({} word operations)", functions.display(), program.len());
	println!("Wrote {}", constants.display());
	Ok(())
}

fn expand_words(input: &Path, output: &Path, add_constants: bool) -> Result<()> {
	let words = binding::parse_word_bindings(&read(input)?)?;
	let bits = binding::expand_words(&words, add_constants);
	write(output, &binding::write_bit_bindings(&bits))?;
	println!("Wrote {} ({} bit bindings)", output.display(), bits.len());
	Ok(())
}

fn synthesize(input: &Path, output: &Path) -> Result<()> {
	let program = WordProgram::parse(&read(input)?)?;
	let graph = synth::synthesize(&program)?;
	write(output, &graph.save())?;
	println!(
		"Wrote {} ({} word operations, {} NAND gates)",
		output.display(),
		program.len(),
		graph.n_gates()
	);
	Ok(())
}

fn optimize(input: &Path, output: &Path, constants: Option<&Path>, max_rounds: usize) -> Result<()> {
	let mut graph = NandGraph::load(&read(input)?)?;
	let constants: HashMap<String, TriBit> = match constants {
		Some(path) => binding::binding_map(&binding::parse_bit_bindings(&read(path)?)?),
		None => HashMap::new(),
	};

	let stats = opt::optimize(&mut graph, &constants, &OptConfig { max_rounds })?;
	graph.renumber_temps();
	write(output, &graph.save())?;

	println!(
		"{} gates -> {} gates in {} rounds ({} folded, {} identities, {} merged, {} dead, {} inverters)",
		stats.gates_before,
		stats.gates_after,
		stats.rounds,
		stats.constants_folded,
		stats.identities_rewritten,
		stats.cse_merged,
		stats.dead_removed,
		stats.inverters_merged,
	);
	if !stats.converged {
		println!("did not converge within {max_rounds} rounds");
	}
	Ok(())
}

fn evaluate(nands: &Path, inputs: &[PathBuf]) -> Result<()> {
	let graph = NandGraph::load(&read(nands)?)?;
	let mut bindings = HashMap::new();
	for path in inputs {
		let file_bindings = binding::parse_bit_bindings(&read(path)?)?;
		bindings.extend(binding::binding_map(&file_bindings));
	}
	let digest = eval::evaluate(&graph, &bindings)?;
	println!("{digest}");
	Ok(())
}

fn run_verify(nands: &Path, trials: u64, seed: u64) -> Result<()> {
	let graph = NandGraph::load(&read(nands)?)?;
	verify::verify(&graph, trials, seed)?;
	println!("verified {trials} random blocks against the reference");
	Ok(())
}

fn stat(nands: &Path) -> Result<()> {
	let graph = NandGraph::load(&read(nands)?)?;
	print!("{}", CircuitStat::collect(&graph));
	Ok(())
}
