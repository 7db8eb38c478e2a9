use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, port: u16, no_open: bool) -> anyhow::Result<()> {
    if !onboard_core::paths::config_path(root).exists() {
        anyhow::bail!("{}", onboard_core::OnboardError::NotInitialized);
    }
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(onboard_server::serve(root.to_path_buf(), port, !no_open))
}
