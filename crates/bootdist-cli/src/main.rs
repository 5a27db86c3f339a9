//! bootdist CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bootdist_cli::cmd;
use bootdist_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Build {
            spec,
            out,
            freezer,
            compiler,
            platform,
        } => {
            let opts = cmd::build::BuildOptions {
                spec,
                out,
                freezer,
                compiler,
                platform,
                dry_run,
                quiet,
            };
            cmd::build::build(opts).await
        }
        Commands::Classify {
            names,
            spec,
            builtins,
        } => cmd::classify::classify(&names, spec.as_deref(), &builtins).await,
        Commands::Inspect { archive, json } => cmd::inspect::inspect(&archive, json).await,
        Commands::Normalize { names } => {
            cmd::normalize::normalize(&names);
            Ok(())
        }
        Commands::Chainload {
            target,
            identity,
            enable,
            argv,
        } => cmd::chainload::chainload(&target, &identity, enable, &argv, dry_run),
    }
}
