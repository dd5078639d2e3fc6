use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use crate::assembler::Assembler;
use crate::auth::Credentials;
use crate::config::Config;
use crate::hierarchy::{build_hierarchy_map, load_suites, HierarchyMap};
use crate::import::run_import;
use crate::output;
use crate::tracker::{FetchOrchestrator, RetryPolicy, TrackerClient};

#[derive(Parser)]
#[command(name = "alm-import")]
#[command(author, version, about = "Test case import from the test plan tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (toml, json or yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(short, long, env = "ALM_LOGIN")]
    login: Option<String>,

    #[arg(short, long, env = "ALM_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the suite hierarchy map from a flat suite list
    Hierarchy {
        #[arg(short, long)]
        suites: Option<PathBuf>,

        #[arg(short, long)]
        root: Option<u64>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download the raw test cases of every suite in the hierarchy map
    Fetch {
        #[arg(short, long)]
        map: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Turn raw payload files into test case documents
    Assemble {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        target: Option<PathBuf>,
    },
    /// Hierarchy, fetch and assemble in one go
    Run {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Write the effective configuration to a file
    Init {
        #[arg(default_value = "alm-import.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl CredentialArgs {
    /// Command line values win over the config file. A login without a
    /// password (or the reverse) is sent with the missing half empty.
    fn resolve(&self, config: &Config) -> Option<Credentials> {
        let login = self.login.clone().or_else(|| config.tracker.login.clone());
        let password = self
            .password
            .clone()
            .or_else(|| config.tracker.password.clone());

        if login.is_none() && password.is_none() {
            return None;
        }
        Some(Credentials::new(
            login.unwrap_or_default(),
            password.unwrap_or_default(),
        ))
    }
}

impl Cli {
    fn execute_hierarchy(
        config: &Config,
        suites: Option<&PathBuf>,
        root: Option<u64>,
        output_path: Option<&PathBuf>,
    ) -> Result<()> {
        let suites_path = suites.unwrap_or(&config.paths.suites_file);
        let root = root.unwrap_or(config.tracker.root_suite_id);
        let output_path = output_path
            .cloned()
            .unwrap_or_else(|| config.paths.hierarchy_path());

        info!(
            "Building hierarchy from {} (root suite {root})",
            suites_path.display()
        );

        let suites = load_suites(suites_path)
            .with_context(|| format!("Failed to load suite list: {}", suites_path.display()))?;
        let map = build_hierarchy_map(&suites, root);
        map.save(&output_path)
            .with_context(|| format!("Failed to write hierarchy map: {}", output_path.display()))?;

        output::print_hierarchy_summary(map.len(), map.with_parents(), &output_path);
        Ok(())
    }

    async fn execute_fetch(
        config: &Config,
        map: Option<&PathBuf>,
        output_dir: Option<&PathBuf>,
        credentials: &CredentialArgs,
    ) -> Result<()> {
        let map_path = map.cloned().unwrap_or_else(|| config.paths.hierarchy_path());
        let output_dir = output_dir
            .cloned()
            .unwrap_or_else(|| config.paths.raw_dir());

        let map = HierarchyMap::load(&map_path)
            .with_context(|| format!("Failed to load hierarchy map: {}", map_path.display()))?;

        let policy = RetryPolicy::from(&config.fetch);
        let client = TrackerClient::new(
            &config.tracker,
            credentials.resolve(config),
            policy.request_timeout,
        )?;
        let stats = FetchOrchestrator::new(&client, &policy, output_dir)
            .fetch_all(&map.suite_ids())
            .await;

        output::print_fetch_summary(&stats);
        Ok(())
    }

    fn execute_assemble(config: &Config, files: &[PathBuf], target: Option<&PathBuf>) {
        let target = target.unwrap_or(&config.paths.target_dir);
        info!("Assembling {} payload files into {}", files.len(), target.display());

        let report = Assembler::new(target).assemble_files(files);
        output::print_assembly_summary(&report);
    }

    async fn execute_run(config: &Config, credentials: &CredentialArgs) -> Result<()> {
        let stats = run_import(config, credentials.resolve(config)).await?;
        output::print_import_summary(&stats);
        Ok(())
    }

    fn execute_init(config: &Config, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        config.save(path)?;
        info!("Wrote configuration to {}", path.display());
        println!("Configuration written to {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Hierarchy {
                suites,
                root,
                output,
            } => Self::execute_hierarchy(&config, suites.as_ref(), *root, output.as_ref()),
            Commands::Fetch {
                map,
                output_dir,
                credentials,
            } => {
                Self::execute_fetch(&config, map.as_ref(), output_dir.as_ref(), credentials)
                    .await
            }
            Commands::Assemble { files, target } => {
                Self::execute_assemble(&config, files, target.as_ref());
                Ok(())
            }
            Commands::Run { credentials } => Self::execute_run(&config, credentials).await,
            Commands::Init { path, force } => Self::execute_init(&config, path, *force),
        }
    }
}
