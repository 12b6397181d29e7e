//! Subcommand implementations.

use chainproof_core::{CANON_VERSION, Fingerprinter};
use chainproof_run::{Run, StepRegistry};
use chainproof_storage::ProofStore;
use chainproof_verify::{Verifier, VerifyConfig, load_proof};
use color_eyre::eyre::{Result, WrapErr};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Inputs shared by `record` and `verify`
#[derive(Debug, Clone)]
pub struct ChainArgs {
    pub initial: Value,
    pub config: Value,
    pub code_version: String,
    pub stages: Vec<String>,
}

pub fn verify(
    out: &mut dyn Write,
    registry: &StepRegistry,
    fingerprinter: Fingerprinter,
    proof_path: &Path,
    chain: ChainArgs,
    strict_stages: bool,
) -> Result<()> {
    let steps = registry.resolve_all(&chain.stages)?;
    let stored = load_proof(proof_path)?;
    let verifier = Verifier::new(VerifyConfig {
        strict_stages,
        fingerprinter,
    });
    let report = verifier.verify(
        &stored,
        chain.initial,
        chain.config,
        &chain.code_version,
        &steps,
    )?;
    info!(
        path = %proof_path.display(),
        master = %report.master,
        steps = report.num_steps(),
        "verification passed"
    );

    writeln!(out, "OK: master proof verified ({} steps)", report.num_steps())?;
    writeln!(out, "master: {}", report.master)?;
    if let Some(anomaly) = &report.anomaly {
        warn!(path = %proof_path.display(), %anomaly, "verified with stage anomaly");
        writeln!(out, "warning: {anomaly}")?;
    }
    Ok(())
}

pub fn record(
    out: &mut dyn Write,
    registry: &StepRegistry,
    fingerprinter: Fingerprinter,
    store: &dyn ProofStore,
    label: &str,
    chain: ChainArgs,
) -> Result<()> {
    let mut run =
        Run::with_fingerprinter(chain.initial, chain.config, chain.code_version, fingerprinter);
    for name in &chain.stages {
        run.add_named_step(registry, name)?;
    }
    let proof = run.finalize()?;
    let location = store
        .save(label, &proof)
        .wrap_err_with(|| format!("failed to save proof {label:?}"))?;
    info!(label, master = %proof.master, path = %location.display(), steps = proof.len(), "chain recorded");

    if let Some(state) = run.final_state() {
        writeln!(out, "final state: {state}")?;
    }
    writeln!(out, "master: {}", proof.master)?;
    writeln!(out, "saved {label} to {}", location.display())?;
    Ok(())
}

pub fn list(out: &mut dyn Write, store: &dyn ProofStore) -> Result<()> {
    for label in store.list()? {
        writeln!(out, "{label}")?;
    }
    Ok(())
}

pub fn show(out: &mut dyn Write, store: &dyn ProofStore, label: &str) -> Result<()> {
    let record = store.load_record(label)?;
    writeln!(out, "{}", record.to_json()?)?;
    Ok(())
}

/// Check a proof file against its own stage hashes
pub fn inspect(out: &mut dyn Write, fingerprinter: Fingerprinter, proof_path: &Path) -> Result<()> {
    let proof = load_proof(proof_path)?;
    proof
        .check_integrity(&fingerprinter)
        .wrap_err_with(|| format!("{} is not internally consistent", proof_path.display()))?;
    info!(path = %proof_path.display(), stages = proof.len(), "proof file consistent");

    writeln!(out, "OK: {} stage hashes consistent with master", proof.len())?;
    for (index, fp) in proof.stage_hashes.iter().enumerate() {
        writeln!(out, "  [{index}] {fp}")?;
    }
    writeln!(out, "master: {}", proof.master)?;
    writeln!(
        out,
        "encoding: canon v{CANON_VERSION}, {}",
        fingerprinter.algorithm
    )?;
    Ok(())
}

pub fn steps(out: &mut dyn Write, registry: &StepRegistry) -> Result<()> {
    for name in registry.names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}
