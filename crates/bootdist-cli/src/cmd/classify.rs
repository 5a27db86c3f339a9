//! Classify command

use anyhow::{Context, Result};
use bootdist_core::{Classifier, RuntimeProfile};
use std::path::Path;

/// Print each name with the tier it belongs to.
pub async fn classify(names: &[String], spec: Option<&Path>, builtins: &[String]) -> Result<()> {
    let (mut profile, extra) = match spec {
        Some(path) => {
            let spec = super::load_spec(path).await?;
            (
                RuntimeProfile::from(&spec.runtime),
                spec.dist.bootstrap_includes,
            )
        }
        None => (RuntimeProfile::default(), Vec::new()),
    };
    profile.builtin_modules.extend(builtins.iter().cloned());

    let classifier = Classifier::new(profile)
        .context("Invalid runtime name")?
        .with_extra(extra);
    for name in names {
        let tier = if classifier.is_bootstrap_dependency(name) {
            "bootstrap"
        } else {
            "full"
        };
        println!("{name}\t{tier}");
    }
    Ok(())
}
