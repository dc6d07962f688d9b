use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pkgflow_core::InstallOptions;

/// pkgflow - install packages through yay, pacman or winget
#[derive(Parser, Debug)]
#[command(name = "pkgflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only warnings and errors; no progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install packages
    Install(InstallArgs),
    /// List package manager backends and whether they are usable here
    Providers {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show which backend would be used and whether it can install in parallel
    Plan(PackageSelection),
}

#[derive(Args, Debug, Clone)]
pub struct PackageSelection {
    /// Package names; combined with any manifest categories
    pub packages: Vec<String>,

    /// JSON package manifest
    #[arg(short, long, value_name = "FILE", env = "PKGFLOW_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Manifest category to install (repeatable); all categories when omitted
    #[arg(short, long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Include packages marked optional in the manifest
    #[arg(long)]
    pub include_optional: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub selection: PackageSelection,

    /// Install on a worker pool when the backend allows it
    #[arg(short, long)]
    pub parallel: bool,

    /// Worker count for parallel installs (0 = automatic)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub max_workers: usize,

    /// Reinstall packages that are already present; also continues past failures
    #[arg(short, long)]
    pub force: bool,

    /// Continue after a package fails
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Report what would be installed without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the result report as JSON
    #[arg(long)]
    pub json: bool,

    /// Cancel the whole run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl InstallArgs {
    pub fn options(&self, verbose: bool, quiet: bool) -> InstallOptions {
        InstallOptions::new()
            .force(self.force)
            .keep_going(self.keep_going)
            .dry_run(self.dry_run)
            .verbose(verbose)
            .quiet(quiet || self.json)
            .parallel(self.parallel)
            .max_workers(self.max_workers)
    }
}
