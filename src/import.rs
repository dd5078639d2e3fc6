use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::assembler::{Assembler, AssemblyReport};
use crate::auth::Credentials;
use crate::config::Config;
use crate::hierarchy::{build_hierarchy_map, load_suites, HierarchyMap};
use crate::output::PhaseProgress;
use crate::tracker::{FetchOrchestrator, FetchStats, RetryPolicy, SuiteSource, TrackerClient};

/// Aggregate statistics of one import run.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub suites: usize,
    pub fetch: FetchStats,
    /// Payload files whose target folder already existed
    pub assembly_skipped: usize,
    pub assembly: AssemblyReport,
}

/// Full pipeline against the configured tracker.
pub async fn run_import(config: &Config, credentials: Option<Credentials>) -> Result<ImportStats> {
    let policy = RetryPolicy::from(&config.fetch);
    let client = TrackerClient::new(&config.tracker, credentials, policy.request_timeout)?;
    run_pipeline(config, &client, &policy).await
}

/// Hierarchy, fetch and assembly in sequence; every stage finishes before
/// the next one starts.
pub async fn run_pipeline<S: SuiteSource>(
    config: &Config,
    source: &S,
    policy: &RetryPolicy,
) -> Result<ImportStats> {
    let paths = &config.paths;
    let progress = PhaseProgress::start_hierarchy();

    let suites = load_suites(&paths.suites_file)
        .with_context(|| format!("Failed to load suite list: {}", paths.suites_file.display()))?;
    let map = build_hierarchy_map(&suites, config.tracker.root_suite_id);
    map.save(&paths.hierarchy_path()).with_context(|| {
        format!(
            "Failed to write hierarchy map: {}",
            paths.hierarchy_path().display()
        )
    })?;

    let progress = progress.finish_hierarchy_start_fetch(map.len());

    let orchestrator = FetchOrchestrator::new(source, policy, paths.raw_dir());
    let fetch = orchestrator.fetch_all(&map.suite_ids()).await;

    let progress = progress.finish_fetch_start_assemble(&fetch);

    let assembler = Assembler::new(&paths.target_dir);
    let (pending, assembly_skipped) = pending_payloads(&map, &orchestrator, &assembler);
    let assembly = assembler.assemble_files(&pending);

    progress.finish_assemble(&assembly);

    info!(
        "Import finished: {} suites, {} test cases created",
        map.len(),
        assembly.created
    );

    Ok(ImportStats {
        suites: map.len(),
        fetch,
        assembly_skipped,
        assembly,
    })
}

/// Payload files present on disk whose target folder does not exist yet,
/// plus the number skipped because it does.
fn pending_payloads<S: SuiteSource>(
    map: &HierarchyMap,
    orchestrator: &FetchOrchestrator<'_, S>,
    assembler: &Assembler,
) -> (Vec<PathBuf>, usize) {
    let mut pending = Vec::new();
    let mut skipped = 0;

    for suite_id in map.suite_ids() {
        let payload = orchestrator.output_path(suite_id);
        if !payload.exists() {
            continue;
        }
        if assembler.target_folder(&payload).exists() {
            info!("Suite {suite_id}: already assembled, skipping");
            skipped += 1;
        } else {
            pending.push(payload);
        }
    }

    (pending, skipped)
}
