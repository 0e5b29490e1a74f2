mod cli;
mod config;
mod engine;
mod error;
mod host;
mod registry;
mod upstream;
mod utils;
mod version;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use config::Config;
use engine::{Session, SessionOptions, UpdatePolicy};
use error::BumpError;
use host::{DistGitHost, SessionLock};
use registry::{Module, ModuleRegistry};
use std::process;
use std::sync::Arc;
use upstream::{GnomeMirror, UpstreamSource};
use utils::console;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var(console::VERBOSE_ENV, "1");
        }
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(cache) = cli.cache {
        config.cache_dir = cache;
    }
    if let Some(modules) = cli.modules {
        config.modules = modules;
    }
    if let Some(branches) = cli.branches {
        config.branches = branches;
    }
    if cli.no_mockbuild {
        config.mockbuild = false;
    }

    let registry = ModuleRegistry::load(&config.branches, &config.modules)
        .context("Failed to load branch and module configuration")?;
    console::debug(format!(
        "Loaded {} module(s), head branch is {}",
        registry.modules().len(),
        registry.head().name
    ));

    let modules: Vec<&Module> = match cli.buildone.as_deref() {
        Some(name) => vec![
            registry
                .module(name)
                .ok_or_else(|| BumpError::UnknownModule(name.to_string()))?,
        ],
        None => registry.modules().iter().collect(),
    };

    // An unknown branch must not take the lock or touch the network.
    let branch = registry.resolve_branch(&cli.branch)?;

    let lock = SessionLock::acquire(&config.cache_dir)?;
    console::debug(format!("Holding {}", lock.path().display()));
    let mirror: Arc<dyn UpstreamSource> = Arc::new(GnomeMirror::new(&config.upstream_url)?);
    let host = DistGitHost::new(&config.cache_dir, Arc::clone(&mirror), config.mockbuild)?;

    let options = SessionOptions {
        simulate: cli.simulate,
        selected_side_tag: cli.side_tag,
        head_side_tag: cli.head_side_tag,
        build: !cli.no_build,
        head_sync: !cli.no_head_sync,
        check_installed: cli.check_installed,
        policy: UpdatePolicy {
            relax_version_checks: cli.relax_version_checks,
        },
    };

    if options.simulate {
        console::info("Simulating: nothing will be committed, pushed or built".cyan().to_string());
    }

    let session = Session::new(&registry, &host, mirror.as_ref());
    let report = session.run_session(&branch.name, &modules, &options)?;
    report.print_summary();
    Ok(())
}
