//! chainproof CLI
//!
//! Records deterministic step chains and verifies stored master proofs by
//! replay.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod builtin;
mod commands;

use chainproof_core::{DigestAlgorithm, Fingerprinter};
use chainproof_storage::{Backend, StoreConfig, open_store};
use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use commands::ChainArgs;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chainproof")]
#[command(about = "Deterministic provenance for reasoning step chains", long_about = None)]
struct Cli {
    /// Proof store directory
    #[arg(long, global = true, default_value = ".chainproof")]
    store: PathBuf,
    /// Proof store backend (json or redb)
    #[arg(long, global = true, default_value_t = Backend::Json)]
    backend: Backend,
    /// Digest algorithm (sha256 or blake3)
    #[arg(long, global = true, default_value_t = DigestAlgorithm::Sha256)]
    algorithm: DigestAlgorithm,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Chain {
    /// Initial state as JSON
    #[arg(long, value_parser = parse_json)]
    initial: Value,
    /// Run configuration as JSON
    #[arg(long, value_parser = parse_json, default_value = "{}")]
    config: Value,
    /// Code version tag
    #[arg(long)]
    code_version: String,
    /// Step names, in order
    #[arg(long, num_args = 1.., required = true)]
    stages: Vec<String>,
}

impl From<Chain> for ChainArgs {
    fn from(chain: Chain) -> Self {
        Self {
            initial: chain.initial,
            config: chain.config,
            code_version: chain.code_version,
            stages: chain.stages,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a chain and compare it with a proof file
    Verify {
        /// Path to the proof JSON file
        proof: PathBuf,
        #[command(flatten)]
        chain: Chain,
        /// Fail when stage hashes differ even if the master matches
        #[arg(long)]
        strict_stages: bool,
    },
    /// Run a chain and save its proof in the store
    Record {
        /// Label to save under
        #[arg(short, long)]
        label: String,
        #[command(flatten)]
        chain: Chain,
    },
    /// List stored proof labels
    List,
    /// Print a stored proof record
    Show {
        /// Label to show
        label: String,
    },
    /// Check a proof file's master against its stage hashes
    Inspect {
        /// Path to the proof JSON file
        proof: PathBuf,
    },
    /// List built-in step names
    Steps,
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|err| format!("invalid JSON: {err}"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,chainproof=debug"
    } else {
        "warn,chainproof=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = builtin::registry()?;
    let fingerprinter = Fingerprinter::new(cli.algorithm);
    let store_config = StoreConfig {
        root: cli.store,
        backend: cli.backend,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Verify {
            proof,
            chain,
            strict_stages,
        } => commands::verify(
            &mut out,
            &registry,
            fingerprinter,
            &proof,
            chain.into(),
            strict_stages,
        ),
        Commands::Record { label, chain } => {
            let store = open_store(&store_config)?;
            commands::record(
                &mut out,
                &registry,
                fingerprinter,
                store.as_ref(),
                &label,
                chain.into(),
            )
        }
        Commands::List => commands::list(&mut out, open_store(&store_config)?.as_ref()),
        Commands::Show { label } => {
            commands::show(&mut out, open_store(&store_config)?.as_ref(), &label)
        }
        Commands::Inspect { proof } => commands::inspect(&mut out, fingerprinter, &proof),
        Commands::Steps => commands::steps(&mut out, &registry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "chainproof",
            "verify",
            "proof.json",
            "--initial",
            "3",
            "--config",
            r#"{"offset": 2}"#,
            "--code-version",
            "v1.0",
            "--stages",
            "add_offset",
            "square",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::Json);
        assert_eq!(cli.algorithm, DigestAlgorithm::Sha256);
        match cli.command {
            Commands::Verify {
                proof,
                chain,
                strict_stages,
            } => {
                assert_eq!(proof, PathBuf::from("proof.json"));
                assert_eq!(chain.initial, json!(3));
                assert_eq!(chain.config, json!({"offset": 2}));
                assert_eq!(chain.stages, vec!["add_offset", "square"]);
                assert!(!strict_stages);
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn test_parse_globals() {
        let cli = Cli::try_parse_from([
            "chainproof",
            "list",
            "--backend",
            "redb",
            "--algorithm",
            "blake3",
            "--store",
            "/tmp/proofs",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::Redb);
        assert_eq!(cli.algorithm, DigestAlgorithm::Blake3);
        assert_eq!(cli.store, PathBuf::from("/tmp/proofs"));
    }

    #[test]
    fn test_rejects_bad_json() {
        let result = Cli::try_parse_from([
            "chainproof",
            "record",
            "--label",
            "x",
            "--initial",
            "{not json",
            "--code-version",
            "v1",
            "--stages",
            "square",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stages_required() {
        let result = Cli::try_parse_from([
            "chainproof",
            "verify",
            "proof.json",
            "--initial",
            "3",
            "--code-version",
            "v1",
        ]);
        assert!(result.is_err());
    }
}
