use anyhow::{bail, Context, Result};
use ezviewer_core::config::{load_config_from, Config};
use ezviewer_core::{paths, Registry};
use tracing::info;

use crate::server_ctl::{is_process_running, read_pid};
use crate::ListenArgs;

/// Config file merged with command-line overrides.
fn resolve_config(listen: &ListenArgs) -> Result<Config> {
    let mut config = load_config_from(&paths::config_path()?)?;
    if let Some(port) = listen.port {
        config.server.port = port;
    }
    if let Some(host) = &listen.host {
        config.server.host = host.clone();
    }
    Ok(config)
}

/// `ezviewer run`: serve in the foreground until SIGINT/SIGTERM.
pub async fn run_foreground(listen: &ListenArgs) -> Result<()> {
    let config = resolve_config(listen)?;
    let registry = Registry::open_default()?;
    info!("Registry: {}", registry.path().display());

    write_pid_file()?;
    println!(
        "Starting ezviewer on http://{}:{}",
        display_host(&config.server.host),
        config.server.port
    );
    let result = ezviewer_server::serve(
        config,
        registry,
        ezviewer_server::shutdown::wait_for_shutdown(),
    )
    .await;
    cleanup_pid_file();
    result
}

fn display_host(host: &str) -> &str {
    if host == "0.0.0.0" { "localhost" } else { host }
}

/// Record our PID so `stop`/`status` can find us.
fn write_pid_file() -> Result<()> {
    let me = std::process::id();
    if let Some(pid) = read_pid()? {
        if pid != me && is_process_running(pid) {
            bail!("ezviewer is already running (PID {})", pid);
        }
    }
    paths::ensure_app_dir()?;
    let path = paths::pid_file_path()?;
    std::fs::write(&path, me.to_string()).context("Failed to write PID file")?;
    info!("PID file written: {}", path.display());
    Ok(())
}

/// Remove the PID file on clean shutdown, unless another process owns it.
fn cleanup_pid_file() {
    if let Ok(Some(pid)) = read_pid() {
        if pid == std::process::id() {
            if let Ok(path) = paths::pid_file_path() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}
