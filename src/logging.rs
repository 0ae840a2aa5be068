use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "eatelligent=info";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter and `LOG_FORMAT=json` switches to JSON lines. Later calls are no-ops.
pub fn init_tracing() -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let installed = if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    let _ = INSTALLED.set(());
    Ok(())
}
