mod cli;
mod logging;
mod report;

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pkgflow_core::backends::BackendContext;
use pkgflow_core::models::PackageManifest;
use pkgflow_core::orchestration::{CancellationToken, PackageInstaller};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, InstallArgs, PackageSelection};
use crate::report::InstallReport;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(report::EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let context = BackendContext::detect();
    debug!(platform = ?context.platform, "detected platform");
    let installer = PackageInstaller::with_default_backends(context);

    match cli.command {
        Command::Install(args) => install(&installer, &args, cli.verbose, cli.quiet).await,
        Command::Providers { json } => {
            providers(&installer, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan(selection) => plan(&installer, &selection),
    }
}

async fn install(
    installer: &PackageInstaller,
    args: &InstallArgs,
    verbose: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let (packages, _) = resolve_packages(&args.selection)?;
    let options = args.options(verbose, quiet);
    let provider = installer.select_provider();
    match &provider {
        Some(provider) => info!(provider = provider.name(), packages = packages.len(), "installing"),
        None => warn!("no package manager available"),
    }

    let cancellation = CancellationToken::new();
    let interrupt = {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling installs");
                cancellation.cancel();
            }
        })
    };
    let deadline = args
        .timeout
        .map(|secs| cancellation.cancel_after(Duration::from_secs(secs)));

    let outcome = installer.install(&packages, &options, &cancellation).await;

    interrupt.abort();
    if let Some(deadline) = deadline {
        deadline.abort();
    }

    if args.json {
        let report = InstallReport::new(&outcome, provider.as_ref().map(|p| p.name()));
        report::print_json(&report)?;
    } else {
        report::print_text(&outcome);
    }

    Ok(report::exit_code(&outcome))
}

#[derive(Serialize)]
struct ProviderRow {
    name: String,
    available: bool,
    priority: i32,
    parallel_safe: bool,
    selected: bool,
}

fn providers(installer: &PackageInstaller, json: bool) -> Result<()> {
    let selected = installer.select_provider();
    let rows: Vec<ProviderRow> = installer
        .registry()
        .providers()
        .iter()
        .map(|provider| ProviderRow {
            name: provider.name().to_string(),
            available: provider.is_available(),
            priority: provider.priority(),
            parallel_safe: provider.parallel_safe(),
            selected: selected
                .as_ref()
                .is_some_and(|best| best.name() == provider.name()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<8}  {:<9}  {:>8}  {:<8}", "NAME", "AVAILABLE", "PRIORITY", "PARALLEL");
    for row in &rows {
        let marker = if row.selected { "  (selected)" } else { "" };
        println!(
            "{:<8}  {:<9}  {:>8}  {:<8}{marker}",
            row.name,
            if row.available { "yes" } else { "no" },
            row.priority,
            if row.parallel_safe { "yes" } else { "no" },
        );
    }
    if selected.is_none() {
        println!("\nno package manager available");
    }
    Ok(())
}

fn plan(installer: &PackageInstaller, selection: &PackageSelection) -> Result<ExitCode> {
    let (packages, manifest) = resolve_packages(selection)?;
    let Some(provider) = installer.select_provider() else {
        println!("no package manager available");
        return Ok(ExitCode::from(report::EXIT_NO_PROVIDER));
    };

    let capability = installer.check_parallel(&packages);
    println!("provider: {} (priority {})", provider.name(), provider.priority());
    println!("packages:");
    for package in &packages {
        let description = manifest
            .as_ref()
            .and_then(|manifest| manifest.describe(package))
            .map(|info| info.description.as_str())
            .filter(|description| !description.is_empty());
        match description {
            Some(description) => println!("  {package:<24} {description}"),
            None => println!("  {package}"),
        }
    }
    if capability.supported {
        println!(
            "parallel: yes, {} worker(s)",
            capability.recommended_workers
        );
    } else {
        println!("parallel: no ({})", capability.reason);
    }
    Ok(ExitCode::SUCCESS)
}

/// Positional packages first, then manifest packages, without duplicates.
/// The manifest only contributes packages when categories are named or no
/// positional packages were given.
fn resolve_packages(
    selection: &PackageSelection,
) -> Result<(Vec<String>, Option<PackageManifest>)> {
    let mut packages: Vec<String> = Vec::new();
    for package in &selection.packages {
        if !packages.contains(package) {
            packages.push(package.clone());
        }
    }

    let mut manifest = None;
    if let Some(path) = &selection.manifest {
        let loaded = load_manifest(path)?;
        if selection.packages.is_empty() || !selection.categories.is_empty() {
            let resolved = loaded
                .resolve(&selection.categories, selection.include_optional)
                .with_context(|| format!("resolving packages from {}", path.display()))?;
            for package in resolved {
                if !packages.contains(&package) {
                    packages.push(package);
                }
            }
        }
        manifest = Some(loaded);
    } else if !selection.categories.is_empty() {
        bail!("--category requires --manifest or PKGFLOW_MANIFEST");
    }

    if packages.is_empty() {
        bail!("no packages requested");
    }
    Ok((packages, manifest))
}

fn load_manifest(path: &Path) -> Result<PackageManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let manifest = PackageManifest::from_json_str(&content)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    debug!(path = %path.display(), categories = manifest.categories.len(), "loaded manifest");
    Ok(manifest)
}
