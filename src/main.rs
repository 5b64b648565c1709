use anyhow::Context;
use tracing_subscriber::EnvFilter;
use vdisk::{
    config::WorkspaceConfig,
    manager::DiskManager,
    shell::{run_once, start_shell},
};

/// Log filter, tracing-subscriber `EnvFilter` syntax.
const LOG_ENV: &str = "VDISK_LOG";

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let workspace = WorkspaceConfig::from_env().context("invalid workspace configuration")?;
    tracing::debug!(root = %workspace.root().display(), "workspace loaded");
    let manager = DiskManager::new(workspace);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        start_shell(&manager)?;
    } else {
        run_once(&manager, &args)?;
    }
    Ok(())
}
