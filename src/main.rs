use std::{
    path::{Path, PathBuf},
    process::exit,
};

use clap::{Args, Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use common::serializable::Serializable;
use storage_proofs_core::field::{from_decimal_str, from_hex_str, to_decimal_string, to_hex_string};
use storage_proofs_core::{
    CircomPoseidon, DatasetCommitment, FieldElement, MembershipVerifier, StorageConfig,
    StorageWitness, WitnessIssue,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Commit a file and write its commitment summary
    Commit {
        /// File to commit
        #[arg(long)]
        data: PathBuf,
        /// Where to write the summary JSON
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Open blocks of a file and write a circuit witness for them
    Prove {
        /// File the witness is built from
        #[arg(long)]
        data: PathBuf,
        /// Block indices to open
        #[arg(long = "index", required = true, num_args = 1..)]
        indices: Vec<u64>,
        /// Optional public salt, decimal or 0x-prefixed hex
        #[arg(long)]
        salt: Option<String>,
        /// Where to write the witness JSON
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Check a witness on the host; exits with status 1 on rejection
    Verify {
        /// Witness JSON to check
        #[arg(long)]
        witness: PathBuf,
        /// Root the witness must open against, decimal or 0x-prefixed hex
        #[arg(long)]
        root: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    depth: Option<usize>,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    block_size: Option<usize>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<StorageConfig> {
        let mut config = match &self.config {
            Some(path) => StorageConfig::load(path)
                .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
            None => StorageConfig::default(),
        };
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Commit { data, out, config } => {
            commit(&data, out.as_deref(), &config.resolve()?)
        }
        Command::Prove {
            data,
            indices,
            salt,
            out,
            config,
        } => {
            let salt = salt.as_deref().map(parse_field).transpose()?;
            prove(&data, &indices, salt, &out, &config.resolve()?)
        }
        Command::Verify {
            witness,
            root,
            config,
        } => {
            let root = root.as_deref().map(parse_field).transpose()?;
            if !verify(&witness, root, &config.resolve()?)? {
                exit(1);
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .with_filter(log_filter);
    tracing_subscriber::registry().with(log_layer).init();
}

fn parse_field(text: &str) -> Result<FieldElement> {
    let value = if text.starts_with("0x") || text.starts_with("0X") {
        from_hex_str(text)
    } else {
        from_decimal_str(text)
    };
    value.wrap_err_with(|| format!("'{text}' is not a field element"))
}

fn read_data(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn commit(data: &Path, out: Option<&Path>, config: &StorageConfig) -> Result<()> {
    let bytes = read_data(data)?;
    let commitment = DatasetCommitment::commit(CircomPoseidon, config, &bytes)?;
    let summary = commitment.summary()?;
    if let Some(out) = out {
        summary
            .serialize_to_file(out)
            .wrap_err_with(|| format!("failed to write {}", out.display()))?;
        info!(out = %out.display(), "wrote commitment");
    }
    println!("root:   {}", to_hex_string(&summary.root));
    println!("leaves: {}", summary.leaves);
    Ok(())
}

fn prove(
    data: &Path,
    indices: &[u64],
    salt: Option<FieldElement>,
    out: &Path,
    config: &StorageConfig,
) -> Result<()> {
    let bytes = read_data(data)?;
    let commitment = DatasetCommitment::commit(CircomPoseidon, config, &bytes)?;
    let openings = indices
        .iter()
        .map(|index| commitment.open(*index))
        .collect::<Result<Vec<_>, _>>()?;
    let witness = StorageWitness::from_openings(&openings, salt)?;

    if let Some(issue) = witness.check(&commitment.verifier())? {
        bail!("freshly built witness does not check out: {issue:?}");
    }
    witness
        .serialize_to_file(out)
        .wrap_err_with(|| format!("failed to write {}", out.display()))?;

    let inputs = witness.circuit_inputs();
    info!(
        openings = witness.len(),
        signals = inputs.total_len(),
        out = %out.display(),
        "wrote witness"
    );
    println!("{}", to_hex_string(&witness.root));
    Ok(())
}

fn verify(path: &Path, root: Option<FieldElement>, config: &StorageConfig) -> Result<bool> {
    let witness = StorageWitness::<FieldElement>::deserialize_from_file(path)
        .wrap_err_with(|| format!("failed to read witness {}", path.display()))?;

    if let Some(root) = root {
        if root != witness.root {
            println!(
                "rejected: witness opens against {}, expected {}",
                to_decimal_string(&witness.root),
                to_decimal_string(&root)
            );
            return Ok(false);
        }
    }
    if witness.depth() != config.depth {
        println!(
            "rejected: witness paths have depth {}, expected {}",
            witness.depth(),
            config.depth
        );
        return Ok(false);
    }

    let verifier = MembershipVerifier::new(CircomPoseidon, config.chunk_size)?;
    match witness.check(&verifier)? {
        None => {
            println!("accepted: {} openings", witness.len());
            Ok(true)
        }
        Some(WitnessIssue::Shape(msg)) => {
            println!("rejected: {msg}");
            Ok(false)
        }
        Some(WitnessIssue::Rejected {
            position,
            index,
            outcome,
        }) => {
            println!("rejected: opening {position} (leaf {index}): {outcome:?}");
            Ok(false)
        }
    }
}
