//! toposeq - circuit topology sequence codec
//!
//! Converts analog circuit netlists into token sequences for sequence
//! models and back.
//!
//! # Usage
//!
//! ```bash
//! toposeq encode amp.scs --count 8 --rename > corpus.txt
//! toposeq generate --corpus corpus.txt --electrical --count 4 | toposeq decode -
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use toposeq_core::{
    augment::{rename_graph, NetRenaming, RenameConfig},
    circuit::{from_adjacency_csv, structural_report, to_adjacency_csv, CircuitGraph, CircuitType},
    codec::{Decoder, Encoder, EncoderConfig},
    error::{Result, TopoSeqError},
    generate::{BigramOracle, ConstraintMode, GenerationConfig, Generator, UniformOracle},
    netlist::{self, BuildConfig},
    vocab::{TokenSequence, Vocabulary},
};

/// Circuit topology sequence codec
#[derive(Parser, Debug)]
#[command(name = "toposeq", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the vocabulary table as JSON
    Vocab,

    /// Encode a netlist or adjacency matrix into sequences, one per line
    Encode {
        /// Input file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Netlist)]
        format: InputFormat,

        /// Base seed for the walk
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Number of distinct sequences to emit
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Circuit type token to prefix
        #[arg(short = 't', long, value_parser = parse_circuit_type)]
        circuit_type: Option<CircuitType>,

        /// Rename device and net indices before each walk
        #[arg(long)]
        rename: bool,

        /// Only rename devices and internal nets
        #[arg(long, requires = "rename")]
        internal_only: bool,

        /// Reject sequences longer than this
        #[arg(long)]
        max_length: Option<usize>,

        /// Pad sequences with TRUNCATE up to this length
        #[arg(long)]
        pad_to: Option<usize>,
    },

    /// Decode sequences (one per line) into graphs
    Decode {
        /// Sequence file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print adjacency matrices instead of JSON summaries
        #[arg(long)]
        csv: bool,
    },

    /// Sample sequences under the grammar mask
    Generate {
        /// Fit a bigram model on this corpus instead of sampling uniformly
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Base seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Number of sequences to sample
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Maximum sequence length
        #[arg(long, default_value_t = toposeq_core::generate::DEFAULT_MAX_LENGTH)]
        max_length: usize,

        /// Circuit type token to condition on
        #[arg(short = 't', long, value_parser = parse_circuit_type)]
        circuit_type: Option<CircuitType>,

        /// Track connections and block electrically inconsistent tokens
        #[arg(long)]
        electrical: bool,

        /// Sampling temperature for the bigram model
        #[arg(long, default_value_t = 1.0)]
        temperature: f64,
    },

    /// Report structural problems in a netlist or adjacency matrix
    Check {
        /// Input file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Netlist)]
        format: InputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormat {
    /// SPICE-style instance netlist
    Netlist,
    /// Adjacency matrix CSV
    Csv,
}

fn parse_circuit_type(name: &str) -> std::result::Result<CircuitType, String> {
    CircuitType::from_name(name).ok_or_else(|| format!("unknown circuit type '{}'", name))
}

fn read_input(path: &Path) -> Result<String> {
    let read_error = |source: std::io::Error| TopoSeqError::FileRead {
        path: path.display().to_string(),
        source,
    };
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(read_error)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path).map_err(read_error)
    }
}

fn load_graph(
    vocab: &Vocabulary,
    path: &Path,
    format: InputFormat,
    config: &BuildConfig,
) -> Result<CircuitGraph> {
    match format {
        InputFormat::Netlist => {
            let ast = if path == Path::new("-") {
                netlist::parse(&read_input(path)?)?
            } else {
                netlist::parse_file(path)?
            };
            if ast.skipped_lines > 0 {
                info!(lines = ast.skipped_lines, "skipped non-instance lines");
            }
            netlist::build_graph(&ast, config)
        }
        InputFormat::Csv => from_adjacency_csv(vocab, &read_input(path)?),
    }
}

fn read_sequences(vocab: &Vocabulary, path: &Path) -> Result<Vec<TokenSequence>> {
    read_input(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| vocab.parse_sequence(line))
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let vocab = Vocabulary::build();

    match cli.command {
        Command::Vocab => {
            println!("{}", vocab.to_json()?);
        }

        Command::Encode {
            input,
            format,
            seed,
            count,
            circuit_type,
            rename,
            internal_only,
            max_length,
            pad_to,
        } => {
            let mut graph = load_graph(&vocab, &input, format, &BuildConfig::new())?;
            if circuit_type.is_some() {
                graph.set_circuit_type(circuit_type);
            }

            let mut config = EncoderConfig::new();
            config.max_length = max_length;
            config.pad_to = pad_to;
            let encoder = Encoder::with_config(&vocab, config);

            let sequences = if rename {
                let nets = if internal_only {
                    NetRenaming::InternalOnly
                } else {
                    NetRenaming::AllIndexed
                };
                let rename_config = RenameConfig::new().with_nets(nets);
                (0..count as u64)
                    .map(|i| {
                        let seed = seed.wrapping_add(i);
                        let renamed = rename_graph(&graph, seed, &rename_config)?;
                        encoder.encode(&renamed, seed)
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                let sequences = encoder.encode_many(&graph, seed, count)?;
                if sequences.len() < count {
                    warn!(
                        requested = count,
                        produced = sequences.len(),
                        "graph has fewer distinct walks than requested"
                    );
                }
                sequences
            };

            for sequence in &sequences {
                println!("{}", vocab.render(sequence)?);
            }
        }

        Command::Decode { input, csv } => {
            let decoder = Decoder::new(&vocab);
            for sequence in read_sequences(&vocab, &input)? {
                let graph = decoder.decode(&sequence)?;
                if csv {
                    print!("{}", to_adjacency_csv(&graph)?);
                    println!();
                } else {
                    println!("{}", serde_json::to_string(&graph.summary())?);
                }
            }
        }

        Command::Generate {
            corpus,
            seed,
            count,
            max_length,
            circuit_type,
            electrical,
            temperature,
        } => {
            let mut config = GenerationConfig::new().with_max_length(max_length);
            config.circuit_type = circuit_type;
            if electrical {
                config = config.with_constraint(ConstraintMode::Electrical);
            }
            let generator = Generator::with_config(&vocab, config);

            let mut oracle: Box<dyn toposeq_core::ProbabilityOracle> = match corpus {
                Some(path) => {
                    let sequences = read_sequences(&vocab, &path)?;
                    info!(sequences = sequences.len(), "fitted bigram model");
                    Box::new(
                        BigramOracle::fit(&vocab, &sequences)
                            .with_smoothing(1e-3)
                            .with_temperature(temperature),
                    )
                }
                None => Box::new(UniformOracle::new(&vocab)),
            };

            for i in 0..count as u64 {
                let outcome = generator.generate(&mut oracle, seed.wrapping_add(i))?;
                if !outcome.is_complete() {
                    warn!(status = ?outcome.status, "sequence did not terminate");
                }
                println!("{}", vocab.render(&outcome.sequence)?);
            }
        }

        Command::Check { input, format } => {
            let config = BuildConfig::new().with_require_complete(false);
            let graph = load_graph(&vocab, &input, format, &config)?;
            let report = structural_report(&graph);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
