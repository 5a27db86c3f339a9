//! Build command

use anyhow::{Context, Result, anyhow};
use bootdist_core::inject::LoaderMode;
use bootdist_core::{CommandCompiler, CommandFreezer, DistLayout, Packager, Reporter};
use bootdist_schema::Platform;
use std::path::PathBuf;

use crate::ui::TerminalReporter;

/// Arguments of `bootdist build`.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub spec: PathBuf,
    pub out: PathBuf,
    pub freezer: Option<String>,
    pub compiler: Option<String>,
    pub platform: Option<String>,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Freezer from `--freezer`, else `$BOOTDIST_FREEZER`.
fn resolve_freezer(flag: Option<&str>) -> Result<CommandFreezer> {
    match flag {
        Some(program) => CommandFreezer::locate(program)
            .with_context(|| format!("Freezer '{program}' not found")),
        None => CommandFreezer::from_env()
            .ok_or_else(|| anyhow!("No freezer configured. Pass --freezer or set BOOTDIST_FREEZER")),
    }
}

/// Compiler from `--compiler`, else `$BOOTDIST_COMPILER`.
fn resolve_compiler(flag: Option<&str>) -> Result<CommandCompiler> {
    match flag {
        Some(program) => CommandCompiler::locate(program)
            .with_context(|| format!("Compiler '{program}' not found")),
        None => CommandCompiler::from_env().ok_or_else(|| {
            anyhow!("No compiler configured. Pass --compiler or set BOOTDIST_COMPILER")
        }),
    }
}

/// Package the application described by `opts.spec`.
pub async fn build(opts: BuildOptions) -> Result<()> {
    let spec = super::load_spec(&opts.spec).await?;
    let platform = match opts.platform.as_deref() {
        Some(p) => p.parse::<Platform>().map_err(|e| anyhow!(e))?,
        None => Platform::current(),
    };
    let reporter = TerminalReporter::new(opts.quiet);

    if opts.dry_run {
        let layout = DistLayout::new(&opts.out, &spec.dist.name, &spec.dist.version, &platform);
        let mode = LoaderMode::from_flag(spec.dist.compile_bootstrap_exes);
        reporter.info(&format!("Would write {}", layout.version_dir().display()));
        reporter.info(&format!("Would write {}", layout.bootstrap_dir().display()));
        reporter.info(&format!("Loader mode: {mode}"));
        for exe in spec.bootstrap_executables() {
            reporter.info(&format!("Loader for '{}'", exe.name));
        }
        return Ok(());
    }

    let freezer = resolve_freezer(opts.freezer.as_deref())?;
    let compiler = resolve_compiler(opts.compiler.as_deref())?;
    tracing::debug!(freezer = %freezer.program().display(), compiler = %compiler.program().display(), "collaborators");

    let out = opts.out;
    let worker_reporter = reporter.clone();
    let report = tokio::task::spawn_blocking(move || {
        Packager::new(&spec, &out, &freezer, &compiler)
            .platform(platform)
            .reporter(&worker_reporter)
            .run()
    })
    .await
    .context("Packaging task panicked")?
    .context("Packaging failed")?;

    reporter.success(&format!(
        "Built {} ({} loader(s), {} manifest entries)",
        report.version_dir.display(),
        report.entry_points.len(),
        report.manifest.len()
    ));
    if let Some(archive) = &report.bootstrap_archive {
        reporter.info(&format!(
            "Bootstrap archive {} [{}]",
            archive.path.display(),
            archive.digest.short()
        ));
    }
    Ok(())
}
