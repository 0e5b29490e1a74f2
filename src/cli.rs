use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "distbump",
    about = "Bump packaged upstream modules on a branch and sync them to the head branch",
    version,
    author
)]
#[command(group(ArgGroup::new("mode").required(true).args(["simulate", "no_simulate"])))]
pub struct Cli {
    /// Branch to update, by name or alias (e.g. f43, newstable)
    #[arg(short, long, visible_alias = "fedora-branch", default_value = "rawhide")]
    pub branch: String,

    /// Do everything except push, commit or build
    #[arg(long)]
    pub simulate: bool,

    /// Actually push and build
    #[arg(long)]
    pub no_simulate: bool,

    /// Configuration file (defaults to ./distbump.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Checkout cache directory
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,

    /// Module list (modules.xml)
    #[arg(long, value_name = "PATH")]
    pub modules: Option<PathBuf>,

    /// Branch list (branches.xml)
    #[arg(long, value_name = "PATH")]
    pub branches: Option<PathBuf>,

    /// Only process this module
    #[arg(long, value_name = "MODULE")]
    pub buildone: Option<String>,

    /// Side tag for builds on the selected branch
    #[arg(long, value_name = "TAG")]
    pub side_tag: Option<String>,

    /// Side tag for builds on the head branch
    #[arg(long, value_name = "TAG")]
    pub head_side_tag: Option<String>,

    /// Do not start builds
    #[arg(long)]
    pub no_build: bool,

    /// Skip the local mock build before committing
    #[arg(long)]
    pub no_mockbuild: bool,

    /// Do not propagate updates to the head branch
    #[arg(long)]
    pub no_head_sync: bool,

    /// Refuse updates older than the locally installed package
    #[arg(long)]
    pub check_installed: bool,

    /// Allow major version changes below the calendar versioning scheme
    #[arg(long)]
    pub relax_version_checks: bool,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}
