//! Chainload command

use anyhow::{Result, bail};
use bootdist_core::{ChainloadPlan, ChainloadPolicy, Chainloader};
use std::path::Path;

/// Decide how a loader running `identity` starts the version in `target`,
/// then perform the hand-off unless `dry_run`.
pub fn chainload(
    target: &Path,
    identity: &str,
    enable: bool,
    argv: &[String],
    dry_run: bool,
) -> Result<()> {
    let loader = Chainloader::new(ChainloadPolicy::new(enable), identity);
    let plan = loader.plan(target, argv)?;
    match &plan {
        ChainloadPlan::InProcess => {
            println!("in-process");
            Ok(())
        }
        ChainloadPlan::Unsupported { reason } => bail!("Cannot start {}: {reason}", target.display()),
        ChainloadPlan::Reexec { runtime, args } => {
            println!("reexec {} {}", runtime.display(), args.join(" "));
            if dry_run {
                return Ok(());
            }
            match Chainloader::exec(&plan, argv)? {}
        }
    }
}
